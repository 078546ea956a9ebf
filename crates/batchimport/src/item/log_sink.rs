use std::fmt::Debug;
use std::marker::PhantomData;

use super::{Chunk, ItemSink};
use crate::error::SinkError;

/// Sink that only logs what it receives; useful for dry runs.
pub struct LogSink<T> {
    label: String,
    chunks: u64,
    items: u64,
    _marker: PhantomData<fn(T)>,
}

impl<T> LogSink<T> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            chunks: 0,
            items: 0,
            _marker: PhantomData,
        }
    }

    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    pub fn items(&self) -> u64 {
        self.items
    }
}

impl<T: Debug> ItemSink<T> for LogSink<T> {
    fn write(&mut self, chunk: Chunk<T>) -> Result<(), SinkError> {
        self.chunks += 1;
        self.items += chunk.len() as u64;
        tracing::info!(
            "[{}] chunk {} with {} item(s)",
            self.label,
            self.chunks,
            chunk.len()
        );
        for item in chunk.iter() {
            tracing::debug!("[{}] {:?}", self.label, item);
        }
        Ok(())
    }
}
