//! The video-game sales record and its field mapper.

use serde::{Deserialize, Serialize};

use super::field_set::{FieldRef, FieldSet, FieldSetMapper};
use crate::error::MappingError;

/// Declared column names of the sales file, in file order.
pub const SALES_COLUMNS: [&str; 11] = [
    "rank",
    "name",
    "platform",
    "year",
    "genre",
    "publisher",
    "na",
    "eu",
    "jp",
    "other",
    "global",
];

/// One row of the sales file.
///
/// Sales figures are in millions of units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub rank: u32,
    pub name: String,
    pub platform: String,
    pub year: u32,
    pub genre: String,
    pub publisher: String,
    pub na_sales: f64,
    pub eu_sales: f64,
    pub jp_sales: f64,
    pub other_sales: f64,
    pub global_sales: f64,
}

impl SalesRecord {
    /// Renders the record back into file fields, in `SALES_COLUMNS` order.
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.rank.to_string(),
            self.name.clone(),
            self.platform.clone(),
            self.year.to_string(),
            self.genre.clone(),
            self.publisher.clone(),
            self.na_sales.to_string(),
            self.eu_sales.to_string(),
            self.jp_sales.to_string(),
            self.other_sales.to_string(),
            self.global_sales.to_string(),
        ]
    }
}

/// How the mapper addresses fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldAccess {
    /// By declared column name.
    #[default]
    Named,
    /// By position in the row.
    Positional,
}

/// Maps a tokenized sales row into a [`SalesRecord`].
#[derive(Debug, Clone)]
pub struct SalesRecordMapper {
    access: FieldAccess,
    columns: Vec<String>,
    sentinels: Vec<String>,
}

impl Default for SalesRecordMapper {
    fn default() -> Self {
        Self::new(FieldAccess::Named)
    }
}

impl SalesRecordMapper {
    pub fn new(access: FieldAccess) -> Self {
        Self {
            access,
            columns: SALES_COLUMNS.iter().map(|c| c.to_string()).collect(),
            sentinels: vec!["NA".to_string(), "N/A".to_string()],
        }
    }

    /// Renames the columns looked up under [`FieldAccess::Named`], in file order.
    pub fn with_columns(mut self, columns: Vec<String>) -> Result<Self, MappingError> {
        if columns.len() != SALES_COLUMNS.len() {
            return Err(MappingError::FieldCount {
                expected: SALES_COLUMNS.len(),
                found: columns.len(),
            });
        }
        self.columns = columns;
        Ok(self)
    }

    /// Replaces the markers that stand for "unknown year".
    pub fn with_sentinels(mut self, sentinels: Vec<String>) -> Self {
        self.sentinels = sentinels;
        self
    }

    pub fn access(&self) -> FieldAccess {
        self.access
    }

    pub fn sentinels(&self) -> &[String] {
        &self.sentinels
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn field(&self, index: usize) -> FieldRef<'_> {
        match self.access {
            FieldAccess::Named => FieldRef::Name(&self.columns[index]),
            FieldAccess::Positional => FieldRef::Index(index),
        }
    }

    fn text(&self, fields: &FieldSet, index: usize) -> Result<String, MappingError> {
        Ok(fields.read_string(self.field(index))?.trim().to_string())
    }

    fn non_empty(&self, fields: &FieldSet, index: usize) -> Result<String, MappingError> {
        let value = self.text(fields, index)?;
        if value.is_empty() {
            return Err(MappingError::EmptyField {
                field: self.columns[index].clone(),
            });
        }
        Ok(value)
    }

    fn sales(&self, fields: &FieldSet, index: usize) -> Result<f64, MappingError> {
        let value = fields.read_float(self.field(index))?;
        if !value.is_finite() || value < 0.0 {
            return Err(MappingError::OutOfRange {
                field: self.columns[index].clone(),
                reason: format!("{} is not a non-negative amount", value),
            });
        }
        Ok(value)
    }
}

impl FieldSetMapper<SalesRecord> for SalesRecordMapper {
    fn map(&self, fields: &FieldSet) -> Result<SalesRecord, MappingError> {
        if fields.len() != SALES_COLUMNS.len() {
            return Err(MappingError::FieldCount {
                expected: SALES_COLUMNS.len(),
                found: fields.len(),
            });
        }

        let rank = fields.read_int(self.field(0))?;
        if rank < 1 || rank > i64::from(u32::MAX) {
            return Err(MappingError::OutOfRange {
                field: self.columns[0].clone(),
                reason: format!("{} is not a positive rank", rank),
            });
        }

        let year = fields.read_int_or_sentinel(self.field(3), &self.sentinels)?;
        if year < 0 || year > i64::from(u32::MAX) {
            return Err(MappingError::OutOfRange {
                field: self.columns[3].clone(),
                reason: format!("{} is not a valid year", year),
            });
        }

        Ok(SalesRecord {
            rank: rank as u32,
            name: self.non_empty(fields, 1)?,
            platform: self.text(fields, 2)?,
            year: year as u32,
            genre: self.text(fields, 4)?,
            publisher: self.text(fields, 5)?,
            na_sales: self.sales(fields, 6)?,
            eu_sales: self.sales(fields, 7)?,
            jp_sales: self.sales(fields, 8)?,
            other_sales: self.sales(fields, 9)?,
            global_sales: self.sales(fields, 10)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn names() -> Arc<[String]> {
        SALES_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    fn row(values: &[&str]) -> FieldSet {
        FieldSet::with_names(names(), values.iter().map(|v| v.to_string()).collect()).unwrap()
    }

    fn wii_sports() -> Vec<&'static str> {
        vec![
            "1",
            "Wii Sports",
            "Wii",
            "2006",
            "Sports",
            "Nintendo",
            "41.49",
            "29.02",
            "3.77",
            "8.46",
            "82.74",
        ]
    }

    #[test]
    fn test_maps_full_row() {
        let record = SalesRecordMapper::default().map(&row(&wii_sports())).unwrap();
        assert_eq!(record.rank, 1);
        assert_eq!(record.name, "Wii Sports");
        assert_eq!(record.platform, "Wii");
        assert_eq!(record.year, 2006);
        assert_eq!(record.publisher, "Nintendo");
        assert_eq!(record.na_sales, 41.49);
        assert_eq!(record.global_sales, 82.74);
    }

    #[test]
    fn test_named_and_positional_produce_same_record() {
        let fields = row(&wii_sports());
        let named = SalesRecordMapper::new(FieldAccess::Named).map(&fields).unwrap();
        let positional = SalesRecordMapper::new(FieldAccess::Positional)
            .map(&FieldSet::new(fields.values().to_vec()))
            .unwrap();
        assert_eq!(named, positional);
    }

    #[test]
    fn test_unknown_year_becomes_zero() {
        let mut values = wii_sports();
        values[3] = "N/A";
        let record = SalesRecordMapper::default().map(&row(&values)).unwrap();
        assert_eq!(record.year, 0);
    }

    #[test]
    fn test_custom_sentinels() {
        let mut values = wii_sports();
        values[3] = "?";
        let mapper = SalesRecordMapper::default().with_sentinels(vec!["?".to_string()]);
        assert_eq!(mapper.map(&row(&values)).unwrap().year, 0);

        values[3] = "NA";
        assert!(mapper.map(&row(&values)).is_err());
    }

    #[test]
    fn test_garbage_year_fails() {
        let mut values = wii_sports();
        values[3] = "abc";
        let err = SalesRecordMapper::default().map(&row(&values)).unwrap_err();
        assert!(matches!(err, MappingError::InvalidNumber { field, .. } if field == "year"));
    }

    #[test]
    fn test_rank_must_be_positive() {
        let mut values = wii_sports();
        values[0] = "0";
        assert!(matches!(
            SalesRecordMapper::default().map(&row(&values)),
            Err(MappingError::OutOfRange { field, .. }) if field == "rank"
        ));
    }

    #[test]
    fn test_name_must_not_be_empty() {
        let mut values = wii_sports();
        values[1] = "  ";
        assert_eq!(
            SalesRecordMapper::default().map(&row(&values)).unwrap_err(),
            MappingError::EmptyField {
                field: "name".to_string()
            }
        );
    }

    #[test]
    fn test_negative_sales_rejected() {
        let mut values = wii_sports();
        values[8] = "-1.0";
        assert!(matches!(
            SalesRecordMapper::default().map(&row(&values)),
            Err(MappingError::OutOfRange { field, .. }) if field == "jp"
        ));
    }

    #[test]
    fn test_short_row_rejected() {
        let fields = FieldSet::new(vec!["1".to_string(), "x".to_string()]);
        assert_eq!(
            SalesRecordMapper::new(FieldAccess::Positional)
                .map(&fields)
                .unwrap_err(),
            MappingError::FieldCount {
                expected: 11,
                found: 2
            }
        );
    }

    #[test]
    fn test_named_access_follows_configured_columns() {
        let columns: Vec<String> = [
            "Rank", "Name", "Platform", "Year", "Genre", "Publisher", "NA_Sales", "EU_Sales",
            "JP_Sales", "Other_Sales", "Global_Sales",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();
        let mapper = SalesRecordMapper::default()
            .with_columns(columns.clone())
            .unwrap();
        let fields = FieldSet::with_names(
            columns.into(),
            wii_sports().iter().map(|v| v.to_string()).collect(),
        )
        .unwrap();

        let record = mapper.map(&fields).unwrap();
        assert_eq!(record, SalesRecordMapper::default().map(&row(&wii_sports())).unwrap());

        let mut values = wii_sports();
        values[0] = "0";
        let fields = FieldSet::with_names(
            mapper.columns().to_vec().into(),
            values.iter().map(|v| v.to_string()).collect(),
        )
        .unwrap();
        assert!(matches!(
            mapper.map(&fields),
            Err(MappingError::OutOfRange { field, .. }) if field == "Rank"
        ));
    }

    #[test]
    fn test_with_columns_requires_eleven_names() {
        let err = SalesRecordMapper::default()
            .with_columns(vec!["rank".to_string()])
            .unwrap_err();
        assert_eq!(
            err,
            MappingError::FieldCount {
                expected: 11,
                found: 1
            }
        );
    }

    #[test]
    fn test_to_fields_maps_back() {
        let mapper = SalesRecordMapper::default();
        let record = mapper.map(&row(&wii_sports())).unwrap();
        let rendered = record.to_fields();
        let again = mapper
            .map(&FieldSet::with_names(names(), rendered).unwrap())
            .unwrap();
        assert_eq!(record, again);
    }
}
