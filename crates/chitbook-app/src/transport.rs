// The boundary to the spreadsheet service: a source to read a grid from and
// a writer to push cell values to.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::sheet::{CellWrite, SheetGrid};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,

    #[error("server responded with status {status}")]
    Status { status: u16 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed sheet data: {0}")]
    Malformed(String),

    #[error("connection failed: {0}")]
    Connection(String),
}

impl TransportError {
    /// Whether another attempt could succeed. Cancellation, malformed data,
    /// and client errors won't change on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout(_) | TransportError::Connection(_) | TransportError::Io { .. } => {
                true
            }
            TransportError::Status { status } => *status == 429 || *status >= 500,
            TransportError::Cancelled | TransportError::Malformed(_) => false,
        }
    }
}

/// Outcome for one cell of a batch write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellOutcome {
    pub cell: String,
    pub ok: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchWriteReport {
    pub outcomes: Vec<CellOutcome>,
}

impl BatchWriteReport {
    /// A report where every cell succeeded.
    pub fn all_ok(cells: &[CellWrite]) -> Self {
        BatchWriteReport {
            outcomes: cells
                .iter()
                .map(|c| CellOutcome {
                    cell: c.cell.clone(),
                    ok: true,
                    error: None,
                })
                .collect(),
        }
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.ok).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CellOutcome> {
        self.outcomes.iter().filter(|o| !o.ok)
    }
}

/// Reads the whole sheet.
#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch_grid(&self) -> Result<SheetGrid, TransportError>;
}

/// Writes cells. A single-cell write is a batch of one.
#[async_trait]
pub trait SheetWriter: Send + Sync {
    async fn write_cells(&self, cells: &[CellWrite]) -> Result<BatchWriteReport, TransportError>;
}

// ---------------------------------------------------------------------------
// CSV export source
// ---------------------------------------------------------------------------

/// Reads a CSV export of the sheet from disk. Each fetch re-reads the file,
/// so edits to the export are picked up on the next sync.
#[derive(Debug, Clone)]
pub struct CsvSheetSource {
    path: PathBuf,
}

impl CsvSheetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvSheetSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse CSV bytes into a grid. Rows keep whatever length they have.
pub fn grid_from_csv(bytes: &[u8]) -> Result<SheetGrid, TransportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| TransportError::Malformed(e.to_string()))?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok(grid)
}

#[async_trait]
impl SheetSource for CsvSheetSource {
    async fn fetch_grid(&self) -> Result<SheetGrid, TransportError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| TransportError::Io {
                path: self.path.clone(),
                source: e,
            })?;
        let grid = grid_from_csv(&bytes)?;
        debug!("Read {} rows from {}", grid.len(), self.path.display());
        Ok(grid)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_rows_keep_their_length() {
        let csv = "title\n#,Date,Match\n1,22-Mar,KKR vs RCB,,\"a,b\"\n";
        let grid = grid_from_csv(csv.as_bytes()).unwrap();
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0], vec!["title"]);
        assert_eq!(grid[2].len(), 5);
        assert_eq!(grid[2][4], "a,b");
    }

    #[test]
    fn retryable_errors() {
        assert!(TransportError::Timeout(Duration::from_secs(15)).is_retryable());
        assert!(TransportError::Status { status: 503 }.is_retryable());
        assert!(TransportError::Status { status: 429 }.is_retryable());
        assert!(!TransportError::Status { status: 404 }.is_retryable());
        assert!(!TransportError::Cancelled.is_retryable());
        assert!(!TransportError::Malformed("x".into()).is_retryable());
    }

    #[test]
    fn batch_report_counts_successes() {
        let report = BatchWriteReport {
            outcomes: vec![
                CellOutcome {
                    cell: "I3".into(),
                    ok: true,
                    error: None,
                },
                CellOutcome {
                    cell: "K3".into(),
                    ok: false,
                    error: Some("protected range".into()),
                },
            ],
        };
        assert_eq!(report.success_count(), 1);
        assert_eq!(report.failures().count(), 1);
    }

    #[tokio::test]
    async fn csv_source_reads_file() {
        let dir = std::env::temp_dir().join("chitbook_csv_source_test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sheet.csv");
        std::fs::write(&path, "a,b\nc\n").unwrap();

        let source = CsvSheetSource::new(&path);
        assert_eq!(source.path(), path.as_path());
        let grid = source.fetch_grid().await.unwrap();
        assert_eq!(grid, vec![vec!["a", "b"], vec!["c"]]);

        let missing = CsvSheetSource::new(dir.join("missing.csv"));
        let err = missing.fetch_grid().await.unwrap_err();
        assert!(matches!(err, TransportError::Io { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
