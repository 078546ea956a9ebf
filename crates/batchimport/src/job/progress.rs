use tokio::sync::broadcast;

use super::execution::BatchStatus;
use crate::step::StepStatus;

/// Events emitted while a job runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    JobStarted {
        job_name: String,
        instance_id: i64,
        execution_id: i64,
    },
    StepStarted {
        step: String,
    },
    ChunkCommitted {
        step: String,
        chunk: u64,
        items: usize,
        read_count: u64,
        write_count: u64,
    },
    StepFinished {
        step: String,
        status: StepStatus,
    },
    JobFinished {
        job_name: String,
        status: BatchStatus,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Reporter that drops every event.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Fans progress events out to any number of subscribers.
#[derive(Clone)]
pub struct BroadcastProgress {
    sender: broadcast::Sender<ProgressEvent>,
}

impl BroadcastProgress {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastProgress {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        // No active receivers is fine.
        let _ = self.sender.send(event);
    }
}
