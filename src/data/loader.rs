//! Dataset loading.
//!
//! The four tables are read together: if any one of them is missing or
//! malformed, none of them is used and the assistant falls back to its
//! hard-coded figures. Loading happens once per process through
//! [`shared_datasets`]; the tables are never mutated afterwards, so sessions
//! share them through an `Arc` without locking.

use crate::config::DatasetConfig;
use crate::error::{InsightsError, InsightsResult};
use crate::logging::{log_debug, log_info, log_warn};

use once_cell::sync::OnceCell;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// One CSV file held in memory as strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table directly from headers and rows. Rows shorter than the
    /// header are padded with empty cells.
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width.max(row.len()), String::new());
                row
            })
            .collect();
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Parse CSV with a header row. Ragged rows are rejected.
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> InsightsResult<Self> {
        let name = name.into();
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| InsightsError::data_unavailable(format!("{name}: bad header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record =
                record.map_err(|e| InsightsError::data_unavailable(format!("{name}: {e}")))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self {
            name,
            headers,
            rows,
        })
    }

    pub fn from_path(name: impl Into<String>, path: &Path) -> InsightsResult<Self> {
        let name = name.into();
        let file = std::fs::File::open(path).map_err(|e| {
            InsightsError::data_unavailable(format!("{name}: cannot open {}: {e}", path.display()))
        })?;
        Self::from_reader(name, file)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn shape(&self) -> TableShape {
        TableShape {
            name: self.name.clone(),
            rows: self.rows.len(),
            columns: self.headers.clone(),
        }
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Values of `column` in row order, or `None` if the column is absent
    pub fn column_values<'a>(&'a self, column: &str) -> Option<impl Iterator<Item = &'a str>> {
        let index = self.column_index(column)?;
        Some(
            self.rows
                .iter()
                .map(move |row| row.get(index).map(String::as_str).unwrap_or("")),
        )
    }
}

/// Name, row count and columns of a loaded table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableShape {
    pub name: String,
    pub rows: usize,
    pub columns: Vec<String>,
}

/// The four tables the assistant works from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datasets {
    pub calls: Table,
    pub orders: Table,
    pub leads: Table,
    pub campaigns: Table,
}

impl Datasets {
    /// Shapes of all four tables, in load order
    pub fn shapes(&self) -> Vec<TableShape> {
        [&self.calls, &self.orders, &self.leads, &self.campaigns]
            .into_iter()
            .map(Table::shape)
            .collect()
    }
}

/// Result of a load attempt. `Unavailable` is a normal state, not a fault.
#[derive(Debug, Clone)]
pub enum DatasetState {
    Loaded(Arc<Datasets>),
    Unavailable { reason: String },
}

impl DatasetState {
    pub fn datasets(&self) -> Option<&Arc<Datasets>> {
        match self {
            Self::Loaded(datasets) => Some(datasets),
            Self::Unavailable { .. } => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

/// Reads the four configured CSV files
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    config: DatasetConfig,
}

impl DatasetLoader {
    pub fn new(config: DatasetConfig) -> Self {
        Self { config }
    }

    /// Load all four tables or fail with the first error encountered.
    ///
    /// # Errors
    ///
    /// Returns [`InsightsError::DataUnavailable`] naming the file that could
    /// not be opened or parsed.
    pub fn try_load(&self) -> InsightsResult<Datasets> {
        log_debug!(
            data_dir = %self.config.data_dir.display(),
            "Loading datasets"
        );

        let datasets = Datasets {
            calls: Table::from_path("calls", &self.config.calls_path())?,
            orders: Table::from_path("orders", &self.config.orders_path())?,
            leads: Table::from_path("leads", &self.config.leads_path())?,
            campaigns: Table::from_path("campaigns", &self.config.campaigns_path())?,
        };

        log_info!(
            calls = datasets.calls.len(),
            orders = datasets.orders.len(),
            leads = datasets.leads.len(),
            campaigns = datasets.campaigns.len(),
            "Datasets loaded"
        );

        Ok(datasets)
    }

    /// Fail-open load: any error becomes [`DatasetState::Unavailable`].
    pub fn load(&self) -> DatasetState {
        match self.try_load() {
            Ok(datasets) => DatasetState::Loaded(Arc::new(datasets)),
            Err(e) => {
                log_warn!(error = %e, "Continuing with headline figures only");
                DatasetState::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}

static SHARED_DATASETS: OnceCell<DatasetState> = OnceCell::new();

/// Process-wide dataset cache.
///
/// The first call loads from `config`; every later call returns the same
/// state regardless of the config it is given.
pub fn shared_datasets(config: &DatasetConfig) -> DatasetState {
    SHARED_DATASETS
        .get_or_init(|| DatasetLoader::new(config.clone()).load())
        .clone()
}
