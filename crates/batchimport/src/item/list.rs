use super::ItemSource;
use crate::error::SourceError;

/// Source over an in-memory list; reopening replays it from the start.
pub struct ListSource<T> {
    items: Vec<T>,
    position: Option<usize>,
}

impl<T> ListSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            position: None,
        }
    }
}

impl<T: Clone + Send> ItemSource<T> for ListSource<T> {
    fn open(&mut self) -> Result<(), SourceError> {
        self.position = Some(0);
        Ok(())
    }

    fn read(&mut self) -> Result<Option<T>, SourceError> {
        let position = self.position.as_mut().ok_or(SourceError::NotOpen)?;
        let item = self.items.get(*position).cloned();
        if item.is_some() {
            *position += 1;
        }
        Ok(item)
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.position = None;
        Ok(())
    }

    fn read_count(&self) -> u64 {
        self.position.unwrap_or(0) as u64
    }
}
