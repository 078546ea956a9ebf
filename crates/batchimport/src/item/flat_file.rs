use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord};

use super::field_set::{FieldSet, FieldSetMapper};
use super::ItemSource;
use crate::error::{SourceError, SourceError::*};

/// Layout of a delimited text file.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatFileSettings {
    pub delimiter: u8,
    pub lines_to_skip: usize,
    /// Column names attached to every row for named access.
    pub names: Option<Vec<String>>,
    /// Check the first skipped line against `names`.
    pub validate_header: bool,
}

impl Default for FlatFileSettings {
    fn default() -> Self {
        Self {
            delimiter: b',',
            lines_to_skip: 1,
            names: None,
            validate_header: false,
        }
    }
}

/// Reads typed items from a delimited text file, one per line.
pub struct FlatFileSource<T> {
    path: PathBuf,
    settings: FlatFileSettings,
    names: Option<Arc<[String]>>,
    mapper: Box<dyn FieldSetMapper<T>>,
    reader: Option<csv::Reader<File>>,
    record: StringRecord,
    read_count: u64,
}

impl<T> FlatFileSource<T> {
    pub fn new(
        path: impl AsRef<Path>,
        settings: FlatFileSettings,
        mapper: impl FieldSetMapper<T> + 'static,
    ) -> Self {
        let names = settings.names.clone().map(Arc::from);
        Self {
            path: path.as_ref().to_path_buf(),
            settings,
            names,
            mapper: Box::new(mapper),
            reader: None,
            record: StringRecord::new(),
            read_count: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn convert_error(&self, err: csv::Error) -> SourceError {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        let reason = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(source) => Io {
                path: self.path.clone(),
                source,
            },
            _ => Malformed {
                path: self.path.clone(),
                line,
                reason,
            },
        }
    }

    fn check_header(&self, header: &StringRecord) -> Result<(), SourceError> {
        let Some(names) = &self.settings.names else {
            return Ok(());
        };
        let found: Vec<String> = header.iter().map(|f| f.trim().to_lowercase()).collect();
        let expected: Vec<String> = names.iter().map(|n| n.trim().to_lowercase()).collect();
        if found != expected {
            return Err(HeaderMismatch {
                expected: names.join(","),
                found: header.iter().collect::<Vec<_>>().join(","),
            });
        }
        Ok(())
    }
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

impl<T: 'static> ItemSource<T> for FlatFileSource<T> {
    fn open(&mut self) -> Result<(), SourceError> {
        let file = File::open(&self.path).map_err(|source| Open {
            path: self.path.clone(),
            source,
        })?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(self.settings.delimiter)
            .quoting(false)
            .flexible(true)
            .from_reader(file);

        let mut skipped = StringRecord::new();
        for index in 0..self.settings.lines_to_skip {
            let more = reader
                .read_record(&mut skipped)
                .map_err(|e| self.convert_error(e))?;
            if !more {
                break;
            }
            if index == 0 && self.settings.validate_header {
                self.check_header(&skipped)?;
            }
        }

        log::debug!(
            "Opened '{}' (skipped {} line(s))",
            self.path.display(),
            self.settings.lines_to_skip
        );
        self.reader = Some(reader);
        self.read_count = 0;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<T>, SourceError> {
        loop {
            let reader = self.reader.as_mut().ok_or(NotOpen)?;
            match reader.read_record(&mut self.record) {
                Ok(false) => return Ok(None),
                Ok(true) => {}
                Err(e) => return Err(self.convert_error(e)),
            }
            if is_blank(&self.record) {
                continue;
            }

            let line = self.record.position().map(|p| p.line()).unwrap_or(0);
            let values: Vec<String> = self.record.iter().map(str::to_string).collect();
            let fields = match &self.names {
                Some(names) => FieldSet::with_names(Arc::clone(names), values),
                None => Ok(FieldSet::new(values)),
            };
            let item = fields
                .and_then(|fields| self.mapper.map(&fields))
                .map_err(|source| Mapping { line, source })?;
            self.read_count += 1;
            return Ok(Some(item));
        }
    }

    fn close(&mut self) -> Result<(), SourceError> {
        self.reader = None;
        Ok(())
    }

    fn read_count(&self) -> u64 {
        self.read_count
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::item::field_set::PassThroughMapper;

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn settings(names: &[&str], validate_header: bool) -> FlatFileSettings {
        FlatFileSettings {
            names: Some(names.iter().map(|n| n.to_string()).collect()),
            validate_header,
            ..FlatFileSettings::default()
        }
    }

    fn drain<T: 'static>(source: &mut FlatFileSource<T>) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = source.read().unwrap() {
            items.push(item);
        }
        items
    }

    #[test]
    fn test_skips_header_and_reads_rows() {
        let file = file_with("a,b\n1,2\n3,4\n");
        let mut source = FlatFileSource::new(file.path(), settings(&["a", "b"], true), PassThroughMapper);
        source.open().unwrap();

        let rows = drain(&mut source);
        assert_eq!(rows, vec![vec!["1", "2"], vec!["3", "4"]]);
        assert_eq!(source.read_count(), 2);
        source.close().unwrap();
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let file = file_with("a,b\n");
        let mut source = FlatFileSource::new(file.path(), settings(&["a", "b"], true), PassThroughMapper);
        source.open().unwrap();
        assert!(source.read().unwrap().is_none());
    }

    #[test]
    fn test_blank_lines_skipped() {
        let file = file_with("a,b\n1,2\n\n   \n3,4\n");
        let mut source = FlatFileSource::new(file.path(), settings(&["a", "b"], false), PassThroughMapper);
        source.open().unwrap();
        assert_eq!(drain(&mut source).len(), 2);
    }

    #[test]
    fn test_header_compare_ignores_case_and_padding() {
        let file = file_with(" A , B \n1,2\n");
        let mut source = FlatFileSource::new(file.path(), settings(&["a", "b"], true), PassThroughMapper);
        assert!(source.open().is_ok());
    }

    #[test]
    fn test_header_mismatch() {
        let file = file_with("x,y\n1,2\n");
        let mut source = FlatFileSource::new(file.path(), settings(&["a", "b"], true), PassThroughMapper);
        assert!(matches!(source.open(), Err(HeaderMismatch { .. })));
    }

    #[test]
    fn test_field_count_error_carries_line() {
        let file = file_with("a,b\n1,2\n3\n");
        let mut source = FlatFileSource::new(file.path(), settings(&["a", "b"], true), PassThroughMapper);
        source.open().unwrap();
        assert!(source.read().unwrap().is_some());
        match source.read() {
            Err(Mapping { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected mapping error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_reopen_restarts() {
        let file = file_with("a\n1\n2\n");
        let mut source = FlatFileSource::new(file.path(), settings(&["a"], false), PassThroughMapper);
        source.open().unwrap();
        assert_eq!(drain(&mut source).len(), 2);

        source.open().unwrap();
        assert_eq!(source.read_count(), 0);
        assert_eq!(drain(&mut source).len(), 2);
    }

    #[test]
    fn test_read_before_open_fails() {
        let file = file_with("a\n1\n");
        let mut source = FlatFileSource::new(file.path(), settings(&["a"], false), PassThroughMapper);
        assert!(matches!(source.read(), Err(NotOpen)));
    }

    #[test]
    fn test_missing_file_fails_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FlatFileSource::new(
            dir.path().join("missing.csv"),
            FlatFileSettings::default(),
            PassThroughMapper,
        );
        assert!(matches!(source.open(), Err(Open { .. })));
    }

    #[test]
    fn test_custom_delimiter() {
        let file = file_with("1;2\n");
        let mut source = FlatFileSource::new(
            file.path(),
            FlatFileSettings {
                delimiter: b';',
                lines_to_skip: 0,
                ..FlatFileSettings::default()
            },
            PassThroughMapper,
        );
        source.open().unwrap();
        assert_eq!(drain(&mut source), vec![vec!["1", "2"]]);
    }
}
