#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use batchimport::item::{Chunk, ItemSink};
use batchimport::job::StopSignal;
use batchimport::SinkError;

/// Captures every chunk it is handed, in order.
///
/// Can stop the job after a given number of chunks to exercise stop handling.
pub struct RecordingSink<T> {
    chunks: Arc<Mutex<Vec<Vec<T>>>>,
    stop_after: Option<(usize, StopSignal)>,
}

impl<T> RecordingSink<T> {
    pub fn new() -> (Self, Arc<Mutex<Vec<Vec<T>>>>) {
        let chunks = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                chunks: Arc::clone(&chunks),
                stop_after: None,
            },
            chunks,
        )
    }

    pub fn stop_after(mut self, chunks: usize, stop: StopSignal) -> Self {
        self.stop_after = Some((chunks, stop));
        self
    }
}

impl<T: Send> ItemSink<T> for RecordingSink<T> {
    fn write(&mut self, chunk: Chunk<T>) -> Result<(), SinkError> {
        let mut chunks = self.chunks.lock().unwrap();
        chunks.push(chunk.into_items());
        if let Some((limit, stop)) = &self.stop_after {
            if chunks.len() >= *limit {
                stop.request_stop();
            }
        }
        Ok(())
    }
}

pub fn chunk_sizes<T>(chunks: &Arc<Mutex<Vec<Vec<T>>>>) -> Vec<usize> {
    chunks.lock().unwrap().iter().map(Vec::len).collect()
}
