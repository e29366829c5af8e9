//! Sequential run over a domain list with batched flushing.

use std::future::Future;

use tracing::{info, warn};
use vantage_core::{DomainEntry, MeasurementRow, RunStamp};

use crate::measurer::Measure;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOutcome {
    /// Rows measured and handed to the sink
    pub rows: usize,
    /// Number of sink flushes
    pub batches: usize,
    /// The run stopped before the last domain
    pub cancelled: bool,
}

/// Measures domains one at a time under a single run stamp.
pub struct Runner<'a, M: ?Sized> {
    measurer: &'a M,
    stamp: RunStamp,
    batch_size: usize,
}

impl<'a, M: Measure + ?Sized> Runner<'a, M> {
    /// Create a runner; a zero batch size flushes every row
    pub fn new(measurer: &'a M, stamp: RunStamp, batch_size: usize) -> Self {
        Self {
            measurer,
            stamp,
            batch_size: batch_size.max(1),
        }
    }

    /// The stamp every row of this run carries
    pub const fn stamp(&self) -> &RunStamp {
        &self.stamp
    }

    /// Measure `entries` in order.
    ///
    /// Completed rows are buffered and passed to `flush` once per full batch
    /// and once more at the end. When `cancel` resolves the run stops before
    /// the next domain; the domain in flight is discarded and the rows
    /// already completed are still flushed. A flush error aborts the run.
    pub async fn run<E, C, F, P>(
        &self,
        entries: &[DomainEntry],
        cancel: C,
        mut flush: F,
        mut progress: P,
    ) -> Result<RunOutcome, E>
    where
        C: Future<Output = ()>,
        F: FnMut(&[MeasurementRow]) -> Result<(), E>,
        P: FnMut(usize, &MeasurementRow),
    {
        tokio::pin!(cancel);

        info!(
            run_id = %self.stamp.run_id,
            vantage = %self.stamp.vantage,
            domains = entries.len(),
            "starting measurement run"
        );

        let mut outcome = RunOutcome::default();
        let mut buffer = Vec::with_capacity(self.batch_size);

        for entry in entries {
            let row = tokio::select! {
                biased;
                () = &mut cancel => {
                    warn!(run_id = %self.stamp.run_id, next = %entry.domain, "run cancelled");
                    outcome.cancelled = true;
                    break;
                }
                row = self.measurer.measure(entry, &self.stamp) => row,
            };

            outcome.rows += 1;
            progress(outcome.rows, &row);
            buffer.push(row);

            if buffer.len() >= self.batch_size {
                flush(&buffer)?;
                outcome.batches += 1;
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            flush(&buffer)?;
            outcome.batches += 1;
        }

        info!(
            run_id = %self.stamp.run_id,
            rows = outcome.rows,
            cancelled = outcome.cancelled,
            "measurement run finished"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    struct Echo;

    #[async_trait]
    impl Measure for Echo {
        async fn measure(&self, entry: &DomainEntry, stamp: &RunStamp) -> MeasurementRow {
            MeasurementRow::pipeline_failure(stamp, entry, "2025-01-01T00:00:00Z".into(), "fake")
        }
    }

    fn entries(n: usize) -> Vec<DomainEntry> {
        (0..n)
            .map(|i| DomainEntry::new(format!("d{i}.in"), "News", ""))
            .collect()
    }

    fn stamp() -> RunStamp {
        RunStamp::starting_at("IN-home", Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn flushes_full_batches_then_remainder() {
        let runner = Runner::new(&Echo, stamp(), 2);
        let mut sizes = Vec::new();
        let mut seen = Vec::new();

        let outcome = runner
            .run(
                &entries(5),
                std::future::pending(),
                |rows: &[MeasurementRow]| {
                    sizes.push(rows.len());
                    Ok::<_, std::convert::Infallible>(())
                },
                |n, row| seen.push((n, row.domain.clone())),
            )
            .await
            .unwrap();

        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(outcome, RunOutcome { rows: 5, batches: 3, cancelled: false });
        assert_eq!(seen.first(), Some(&(1, "d0.in".to_string())));
        assert_eq!(seen.last(), Some(&(5, "d4.in".to_string())));
    }

    #[tokio::test]
    async fn every_row_carries_the_run_stamp() {
        let runner = Runner::new(&Echo, stamp(), 10);
        let mut rows = Vec::new();
        runner
            .run(
                &entries(3),
                std::future::pending(),
                |batch: &[MeasurementRow]| {
                    rows.extend_from_slice(batch);
                    Ok::<_, std::convert::Infallible>(())
                },
                |_, _| {},
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.run_id == "20250101T000000Z" && r.vantage == "IN-home"));
    }

    #[tokio::test]
    async fn cancellation_flushes_completed_rows() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut tx = Some(tx);
        let runner = Runner::new(&Echo, stamp(), 25);
        let mut flushed = 0;

        let outcome = runner
            .run(
                &entries(5),
                async {
                    let _ = rx.await;
                },
                |rows: &[MeasurementRow]| {
                    flushed += rows.len();
                    Ok::<_, std::convert::Infallible>(())
                },
                |n, _| {
                    if n == 2 {
                        if let Some(tx) = tx.take() {
                            let _ = tx.send(());
                        }
                    }
                },
            )
            .await
            .unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.rows, 2);
        assert_eq!(flushed, 2);
    }

    #[tokio::test]
    async fn flush_error_aborts_run() {
        let runner = Runner::new(&Echo, stamp(), 1);
        let result = runner
            .run(
                &entries(3),
                std::future::pending(),
                |_: &[MeasurementRow]| Err("disk full"),
                |_, _| {},
            )
            .await;
        assert_eq!(result, Err("disk full"));
    }
}
