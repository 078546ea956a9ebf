//! Chunk-oriented processing: read up to N items, write them as one unit,
//! repeat until the source is exhausted.

use tracing::{debug, info, warn};

use super::{Step, StepContext, StepExecution, StepStatus};
use crate::error::{ConfigError, StepFailure};
use crate::item::{Chunk, ItemProcessor, ItemSink, ItemSource};
use crate::job::progress::ProgressEvent;

pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Largest chunk size accepted from configuration.
pub const MAX_CHUNK_SIZE: usize = 1_000_000;

/// Buffers start at most this large and grow as items arrive.
const PREALLOCATED_ITEMS: usize = 1024;

/// Where a chunk step is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Ready,
    Reading,
    Writing,
    Done,
    Failed,
    Stopped,
}

pub struct ChunkStep<T> {
    name: String,
    chunk_size: usize,
    source: Box<dyn ItemSource<T>>,
    processor: Option<Box<dyn ItemProcessor<T>>>,
    sink: Box<dyn ItemSink<T>>,
    state: ChunkState,
}

impl<T> ChunkStep<T> {
    /// Fails with [`ConfigError::Validation`] if `chunk_size` is zero.
    pub fn new(
        name: impl Into<String>,
        chunk_size: usize,
        source: Box<dyn ItemSource<T>>,
        sink: Box<dyn ItemSink<T>>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        if chunk_size == 0 {
            return Err(ConfigError::Validation {
                message: format!("step '{}': chunk size must be greater than 0", name),
            });
        }
        Ok(Self {
            name,
            chunk_size,
            source,
            processor: None,
            sink,
            state: ChunkState::Ready,
        })
    }

    pub fn with_processor(mut self, processor: impl ItemProcessor<T> + 'static) -> Self {
        self.processor = Some(Box::new(processor));
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    fn run(
        &mut self,
        ctx: &StepContext<'_>,
        execution: &mut StepExecution,
    ) -> Result<StepStatus, StepFailure> {
        self.sink.open()?;
        self.source.open()?;

        loop {
            if ctx.stop.is_stop_requested() {
                info!(step = %self.name, "Stop requested, ending before next chunk");
                self.state = ChunkState::Stopped;
                return Ok(StepStatus::Stopped);
            }

            self.state = ChunkState::Reading;
            let mut chunk = Chunk::with_capacity(self.chunk_size.min(PREALLOCATED_ITEMS));
            let mut exhausted = false;
            let mut consumed = 0;
            while consumed < self.chunk_size {
                let Some(item) = self.source.read()? else {
                    exhausted = true;
                    break;
                };
                consumed += 1;
                execution.read_count = self.source.read_count();
                match &self.processor {
                    Some(processor) => match processor.process(item)? {
                        Some(item) => chunk.push(item),
                        None => execution.filter_count += 1,
                    },
                    None => chunk.push(item),
                }
            }

            if !chunk.is_empty() {
                self.state = ChunkState::Writing;
                let items = chunk.len();
                self.sink.write(chunk)?;
                execution.commit_count += 1;
                execution.write_count += items as u64;
                debug!(
                    step = %self.name,
                    chunk = execution.commit_count,
                    items,
                    "Chunk committed"
                );
                ctx.progress.report(ProgressEvent::ChunkCommitted {
                    step: self.name.clone(),
                    chunk: execution.commit_count,
                    items,
                    read_count: execution.read_count,
                    write_count: execution.write_count,
                });
            }

            if exhausted {
                self.state = ChunkState::Done;
                return Ok(StepStatus::Completed);
            }
        }
    }
}

impl<T: 'static> Step for ChunkStep<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(
        &mut self,
        ctx: &StepContext<'_>,
        execution: &mut StepExecution,
    ) -> Result<StepStatus, StepFailure> {
        self.state = ChunkState::Ready;
        let result = self.run(ctx, execution);
        if let Err(e) = self.source.close() {
            warn!(step = %self.name, error = %e, "Failed to close source");
        }
        if result.is_err() {
            self.state = ChunkState::Failed;
        }
        result
    }
}
