// In-memory dataset loaded once from a CSV source
//
// The dataset is read fully at startup and never mutated afterwards, so the
// replay loop can group it without any locking.

use crate::record::{ColumnMap, Record};
use crate::types::LoadError;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Dataset {
    columns: ColumnMap,
    records: Vec<Record>,
    source: Option<PathBuf>,
}

impl Dataset {
    /// Read a CSV file with a header row
    pub fn load<P: AsRef<Path>>(path: P, columns: &ColumnMap) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let mut dataset = Self::from_reader(file, columns)?;
        dataset.source = Some(path.to_path_buf());

        log::info!(
            "Loaded dataset {} ({} rows)",
            path.display(),
            dataset.records.len()
        );

        Ok(dataset)
    }

    /// Read CSV text from any reader. Columns are located by header name.
    pub fn from_reader<R: Read>(reader: R, columns: &ColumnMap) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let index = columns.locate(&headers).map_err(LoadError::MissingColumns)?;

        if index.width() > 4 {
            let required = columns.names();
            let extra: Vec<&str> = headers
                .iter()
                .filter(|name| !required.contains(name))
                .collect();
            log::debug!("Ignoring extra dataset columns: {:?}", extra);
        }

        let mut records = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let row = row?;
            let record = index
                .parse(&row)
                .map_err(|reason| LoadError::InvalidRow { row: i + 1, reason })?;
            records.push(record);
        }

        Self::from_records(records, columns)
    }

    /// Build a dataset from records already in memory
    pub fn from_records(records: Vec<Record>, columns: &ColumnMap) -> Result<Self, LoadError> {
        if records.is_empty() {
            return Err(LoadError::Empty);
        }

        if let Some(i) = records.iter().position(|r| !r.time.is_frameable()) {
            return Err(LoadError::InvalidRow {
                row: i + 1,
                reason: format!("time '{}' cannot be used as a frame key", records[i].time),
            });
        }

        Ok(Self {
            columns: columns.clone(),
            records,
            source: None,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// File the dataset was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
