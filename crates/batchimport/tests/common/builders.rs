//! Builders for sales files, records and job parameters.

#![allow(dead_code)]

use batchimport::item::SalesRecord;
use batchimport::JobParameters;

pub const HEADER: &str = "rank,name,platform,year,genre,publisher,na,eu,jp,other,global";

/// A plausible record for the given rank.
pub fn sales_record(rank: u32) -> SalesRecord {
    SalesRecord {
        rank,
        name: format!("Game {}", rank),
        platform: ["Wii", "PS2", "X360", "DS"][rank as usize % 4].to_string(),
        year: 1990 + rank % 30,
        genre: "Action".to_string(),
        publisher: "Acme".to_string(),
        na_sales: f64::from(rank % 7) * 0.25,
        eu_sales: f64::from(rank % 5) * 0.5,
        jp_sales: 0.01,
        other_sales: 0.0,
        global_sales: 1.5,
    }
}

/// Builder for delimited sales files.
pub struct SalesCsv {
    header: Option<String>,
    lines: Vec<String>,
}

impl SalesCsv {
    pub fn new() -> Self {
        Self {
            header: Some(HEADER.to_string()),
            lines: Vec::new(),
        }
    }

    pub fn without_header(mut self) -> Self {
        self.header = None;
        self
    }

    pub fn header(mut self, header: &str) -> Self {
        self.header = Some(header.to_string());
        self
    }

    /// Appends `count` generated records, ranked after the lines already added.
    pub fn records(mut self, count: u32) -> Self {
        let start = self.lines.len() as u32 + 1;
        for rank in start..start + count {
            self.lines.push(sales_record(rank).to_fields().join(","));
        }
        self
    }

    pub fn record(mut self, record: &SalesRecord) -> Self {
        self.lines.push(record.to_fields().join(","));
        self
    }

    /// Appends a raw line verbatim.
    pub fn line(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn build(&self) -> String {
        let mut out = String::new();
        if let Some(header) = &self.header {
            out.push_str(header);
            out.push('\n');
        }
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Parameters identifying a run by token, with inert time metadata.
pub fn params(token: &str) -> JobParameters {
    JobParameters::builder()
        .add_string("uuid", token)
        .add_non_identifying_string("date", "2024-03-09")
        .add_non_identifying_string("hour", "9:5")
        .build()
}
