use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload mass in kilograms.
pub type PayloadKg = f64;

/// CSV headers the loader requires. Extra columns in the file are ignored.
pub const REQUIRED_COLUMNS: [&str; 4] = [
    "Launch Site",
    "Payload Mass (kg)",
    "Booster Version Category",
    "class",
];

/// One launch as loaded from the dataset file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchRecord {
    #[serde(rename = "Launch Site")]
    pub site: String,
    #[serde(rename = "Payload Mass (kg)")]
    pub payload_mass: PayloadKg,
    #[serde(rename = "Booster Version Category")]
    pub booster_category: String,
    /// 1 = success, 0 = failure.
    #[serde(rename = "class")]
    pub outcome: u8,
}

impl LaunchRecord {
    pub fn is_success(&self) -> bool {
        self.outcome == 1
    }
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column: {0}")]
    MissingColumn(&'static str),
    #[error("row {row}: outcome must be 0 or 1, got {value}")]
    InvalidOutcome { row: usize, value: u8 },
    #[error("row {row}: negative payload mass {value}")]
    NegativePayload { row: usize, value: f64 },
    #[error("dataset contains no rows")]
    Empty,
}

/// The launch table plus metadata derived once at load time.
///
/// Records are immutable for the process lifetime; views only ever read
/// them through a shared reference. The payload bounds seed the range
/// slider and the site list seeds the dropdown options, so neither can
/// drift from the data actually loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    records: Vec<LaunchRecord>,
    min_payload: PayloadKg,
    max_payload: PayloadKg,
    sites: Vec<String>,
}

impl Dataset {
    /// Build from already-parsed records, validating rows and deriving
    /// the payload bounds and distinct site list.
    pub fn from_records(records: Vec<LaunchRecord>) -> Result<Self, DatasetError> {
        if records.is_empty() {
            return Err(DatasetError::Empty);
        }
        for (idx, rec) in records.iter().enumerate() {
            let row = idx + 1;
            if rec.outcome > 1 {
                return Err(DatasetError::InvalidOutcome {
                    row,
                    value: rec.outcome,
                });
            }
            if rec.payload_mass < 0.0 {
                return Err(DatasetError::NegativePayload {
                    row,
                    value: rec.payload_mass,
                });
            }
        }
        let min_payload = records
            .iter()
            .map(|r| r.payload_mass)
            .fold(f64::INFINITY, f64::min);
        let max_payload = records
            .iter()
            .map(|r| r.payload_mass)
            .fold(f64::NEG_INFINITY, f64::max);
        let sites: Vec<String> = records
            .iter()
            .map(|r| r.site.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Ok(Self {
            records,
            min_payload,
            max_payload,
            sites,
        })
    }

    /// Load from any CSV source with a header row.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();
        for col in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == col) {
                return Err(DatasetError::MissingColumn(col));
            }
        }
        let mut records = Vec::new();
        for row in rdr.deserialize() {
            records.push(row?);
        }
        Self::from_records(records)
    }

    /// Load the dataset file. Any failure here is fatal to startup.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_csv_reader(file)
    }

    pub fn records(&self) -> &[LaunchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Smallest payload mass in the table.
    pub fn min_payload(&self) -> PayloadKg {
        self.min_payload
    }

    /// Largest payload mass in the table.
    pub fn max_payload(&self) -> PayloadKg {
        self.max_payload
    }

    /// Distinct launch sites, sorted.
    pub fn sites(&self) -> &[String] {
        &self.sites
    }

    pub fn contains_site(&self, site: &str) -> bool {
        self.sites.iter().any(|s| s == site)
    }
}
