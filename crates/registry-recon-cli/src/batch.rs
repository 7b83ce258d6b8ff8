//! Drive a connector over many rows.
//!
//! Rows run with bounded concurrency and are reported in input order. A fatal
//! row error stops the batch: no further rows are started, and rows still in
//! flight are dropped.

use std::io::Write;

use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tracing::{info, warn};

use registry_recon::{AbortSignal, Connector, InputRow, OutputRow, RowError};

use crate::error::CliResult;

/// Outcome of one input row.
#[derive(Debug)]
pub struct RowReport {
    /// 0-based position in the input.
    pub index: usize,
    pub outcome: Result<Vec<OutputRow>, RowError>,
}

impl RowReport {
    /// `{"row": i, "results": [...]}` or `{"row": i, "error": "..."}`.
    pub fn to_json(&self) -> Value {
        match &self.outcome {
            Ok(rows) => json!({"row": self.index, "results": rows}),
            Err(e) => json!({"row": self.index, "error": e.to_string()}),
        }
    }
}

/// Totals for a finished (or aborted) batch.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Rows never reported because the batch was aborted.
    pub skipped: usize,
    /// The message that aborted the batch, if any.
    pub fatal: Option<String>,
}

/// Run `connector` over `rows`, writing one JSON line per row to `out`.
pub async fn run_batch(
    connector: &dyn Connector,
    rows: Vec<InputRow>,
    concurrency: usize,
    abort: &AbortSignal,
    out: &mut impl Write,
) -> CliResult<BatchSummary> {
    let total = rows.len();
    let mut summary = BatchSummary::default();

    let mut reports = stream::iter(rows.into_iter().enumerate())
        .map(|(index, row)| async move {
            if abort.is_triggered() {
                return None;
            }
            let outcome = connector.run(&row).await;
            Some(RowReport { index, outcome })
        })
        .buffered(concurrency.max(1));

    while let Some(report) = reports.next().await {
        let Some(report) = report else {
            break;
        };

        serde_json::to_writer(&mut *out, &report.to_json())?;
        out.write_all(b"\n")?;

        match &report.outcome {
            Ok(_) => summary.succeeded += 1,
            Err(e) if e.is_fatal() => {
                summary.failed += 1;
                summary.fatal = Some(e.to_string());
                break;
            }
            Err(e) => {
                warn!(row = report.index, "row failed: {e}");
                summary.failed += 1;
            }
        }

        if abort.is_triggered() {
            break;
        }
    }
    out.flush()?;

    if summary.fatal.is_none() {
        summary.fatal = abort.message().map(str::to_string);
    }

    summary.skipped = total - summary.succeeded - summary.failed;
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        "batch finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use registry_recon::{ConnectorDetails, RowResult};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DETAILS: ConnectorDetails = ConnectorDetails {
        parameters: &[],
        columns: &[],
    };

    /// Echoes `id`; `"bad"` fails the row, `"stop"` aborts the run.
    struct Echo {
        abort: AbortSignal,
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Connector for Echo {
        fn details(&self) -> &'static ConnectorDetails {
            &DETAILS
        }

        async fn run(&self, row: &InputRow) -> RowResult<Vec<OutputRow>> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let id = row["id"].as_str().unwrap_or_default().to_string();
            match id.as_str() {
                "bad" => Err(RowError::Recoverable("bad row".into())),
                "stop" => {
                    self.abort.trigger("quota exhausted");
                    Err(RowError::Fatal("quota exhausted".into()))
                }
                _ => {
                    let mut out = OutputRow::new();
                    out.set("id", Some(id));
                    Ok(vec![out])
                }
            }
        }
    }

    fn rows(ids: &[&str]) -> Vec<InputRow> {
        ids.iter()
            .map(|id| json!({"id": id}).as_object().cloned().unwrap())
            .collect()
    }

    fn lines(out: &[u8]) -> Vec<Value> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_reports_in_input_order_with_row_errors() {
        let abort = AbortSignal::new();
        let echo = Echo {
            abort: abort.clone(),
            runs: AtomicUsize::new(0),
        };
        let mut out = Vec::new();

        let summary = run_batch(&echo, rows(&["a", "bad", "c"]), 3, &abort, &mut out)
            .await
            .unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                succeeded: 2,
                failed: 1,
                skipped: 0,
                fatal: None
            }
        );
        let lines = lines(&out);
        assert_eq!(lines[0], json!({"row": 0, "results": [{"id": "a"}]}));
        assert_eq!(lines[1], json!({"row": 1, "error": "bad row"}));
        assert_eq!(lines[2]["row"], 2);
    }

    #[tokio::test]
    async fn test_fatal_stops_later_rows() {
        let abort = AbortSignal::new();
        let echo = Echo {
            abort: abort.clone(),
            runs: AtomicUsize::new(0),
        };
        let mut out = Vec::new();

        let summary = run_batch(&echo, rows(&["a", "stop", "c", "d", "e"]), 1, &abort, &mut out)
            .await
            .unwrap();

        assert_eq!(summary.fatal.as_deref(), Some("quota exhausted"));
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 3);
        assert_eq!(echo.runs.load(Ordering::SeqCst), 2);
        assert_eq!(lines(&out).len(), 2);
    }

    #[tokio::test]
    async fn test_pre_triggered_abort_runs_nothing() {
        let abort = AbortSignal::new();
        abort.trigger("already dead");
        let echo = Echo {
            abort: abort.clone(),
            runs: AtomicUsize::new(0),
        };
        let mut out = Vec::new();

        let summary = run_batch(&echo, rows(&["a", "b"]), 2, &abort, &mut out)
            .await
            .unwrap();
        assert_eq!(summary.skipped, 2);
        assert_eq!(echo.runs.load(Ordering::SeqCst), 0);
        assert!(out.is_empty());
    }
}
