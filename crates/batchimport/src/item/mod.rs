//! Read and write boundaries of a chunk-oriented step.

use crate::error::{ProcessError, SinkError, SourceError};

pub mod field_set;
pub mod flat_file;
pub mod list;
pub mod log_sink;
pub mod record;
pub mod sqlite_sink;

pub use field_set::{FieldRef, FieldSet, FieldSetMapper, PassThroughMapper};
pub use flat_file::{FlatFileSettings, FlatFileSource};
pub use list::ListSource;
pub use log_sink::LogSink;
pub use record::{FieldAccess, SalesRecord, SalesRecordMapper, SALES_COLUMNS};
pub use sqlite_sink::{BatchedInsertSink, MultiRowInsertSink, SalesTable};

/// A forward-only, finite sequence of items.
///
/// `open` (re)starts the sequence from the beginning; `read` returns
/// `Ok(None)` once the source is exhausted.
pub trait ItemSource<T>: Send {
    fn open(&mut self) -> Result<(), SourceError>;

    fn read(&mut self) -> Result<Option<T>, SourceError>;

    fn close(&mut self) -> Result<(), SourceError>;

    /// Items successfully read since the last `open`.
    fn read_count(&self) -> u64;
}

/// Optional per-item transformation between reading and writing.
///
/// Returning `Ok(None)` filters the item out of the chunk.
pub trait ItemProcessor<T>: Send {
    fn process(&self, item: T) -> Result<Option<T>, ProcessError>;
}

impl<T, F> ItemProcessor<T> for F
where
    F: Fn(T) -> Result<Option<T>, ProcessError> + Send,
{
    fn process(&self, item: T) -> Result<Option<T>, ProcessError> {
        self(item)
    }
}

/// Persists whole chunks.
///
/// A failed `write` must leave no trace of the chunk behind.
pub trait ItemSink<T>: Send {
    /// Prepares the destination before the first chunk.
    fn open(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn write(&mut self, chunk: Chunk<T>) -> Result<(), SinkError>;
}

/// An ordered batch of items, written exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk<T> {
    items: Vec<T>,
}

impl<T> Chunk<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> From<Vec<T>> for Chunk<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T> IntoIterator for Chunk<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
