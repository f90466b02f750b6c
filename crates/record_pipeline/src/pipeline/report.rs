//! src/pipeline/report.rs
//!
//! Final status of a pipeline run: per-item outcomes in arrival order, counts,
//! per-stage pool statistics and elapsed times.

use anyhow::{Context, Result};
use serde::{Serialize, Serializer};
use std::io::{self, Write};
use std::time::Duration;

use super::handler::{Outcome, ResultToken};
use super::workers::pool::PoolStats;

fn as_secs_f64<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Timing and pool counters for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageReport {
    #[serde(flatten)]
    pub pool: PoolStats,
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs_f64")]
    pub elapsed: Duration,
}

/// Final status of one processed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub id: usize,
    pub worker: usize,
    pub outcome: Outcome,
}

impl From<ResultToken> for ItemReport {
    fn from(token: ResultToken) -> Self {
        Self {
            id: token.id,
            worker: token.worker,
            outcome: token.outcome,
        }
    }
}

/// Everything the driver learned from a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub records: usize,
    pub successes: usize,
    pub failures: usize,
    /// One entry per record, in the order results arrived
    pub items: Vec<ItemReport>,
    pub generation: StageReport,
    pub processing: StageReport,
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs_f64")]
    pub elapsed: Duration,
}

impl PipelineReport {
    pub(crate) fn new(
        tokens: Vec<ResultToken>,
        generation: StageReport,
        processing: StageReport,
        elapsed: Duration,
    ) -> Self {
        let items: Vec<ItemReport> = tokens.into_iter().map(ItemReport::from).collect();
        let successes = items.iter().filter(|item| item.outcome.is_success()).count();

        Self {
            records: items.len(),
            successes,
            failures: items.len() - successes,
            items,
            generation,
            processing,
            elapsed,
        }
    }

    /// True when every record was processed successfully.
    pub fn all_succeeded(&self) -> bool {
        self.failures == 0
    }

    /// Identifiers of failed records, ascending.
    pub fn failed_ids(&self) -> Vec<usize> {
        self.ids_where(|outcome| !outcome.is_success())
    }

    /// Identifiers of successful records, ascending.
    pub fn succeeded_ids(&self) -> Vec<usize> {
        self.ids_where(Outcome::is_success)
    }

    fn ids_where(&self, predicate: impl Fn(&Outcome) -> bool) -> Vec<usize> {
        let mut ids: Vec<usize> = self
            .items
            .iter()
            .filter(|item| predicate(&item.outcome))
            .map(|item| item.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn summary_line(&self) -> String {
        format!(
            "DONE! processed {} records ({} succeeded, {} failed) in {:.2} seconds",
            self.records,
            self.successes,
            self.failures,
            self.elapsed.as_secs_f64()
        )
    }

    /// Writes one `result #k` line per item followed by the summary line.
    pub fn write_text<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (position, item) in self.items.iter().enumerate() {
            writeln!(
                out,
                "result #{}: id={} worker={} {}",
                position + 1,
                item.id,
                item.worker,
                item.outcome
            )?;
        }
        writeln!(out, "{}", self.summary_line())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize pipeline report")
    }
}

#[cfg(test)]
mod report_test {
    use super::*;
    use crate::pipeline::handler::ProcessingFailure;

    fn stage(n: usize) -> StageReport {
        StageReport {
            pool: PoolStats {
                workers: 2,
                taken: n,
                emitted: n,
            },
            elapsed: Duration::from_millis(250),
        }
    }

    fn sample_report() -> PipelineReport {
        let tokens = vec![
            ResultToken {
                id: 3,
                worker: 1,
                outcome: Outcome::Failure(ProcessingFailure::Rejected {
                    id: 3,
                    reason: "fault injected".to_string(),
                }),
            },
            ResultToken {
                id: 2,
                worker: 0,
                outcome: Outcome::Success("Processed user 2".to_string()),
            },
            ResultToken {
                id: 1,
                worker: 1,
                outcome: Outcome::Failure(ProcessingFailure::Panicked { id: 1 }),
            },
        ];
        PipelineReport::new(tokens, stage(3), stage(3), Duration::from_millis(1500))
    }

    #[test]
    fn test_counts_and_ids() {
        let report = sample_report();
        assert_eq!(report.records, 3);
        assert_eq!(report.successes, 1);
        assert_eq!(report.failures, 2);
        assert!(!report.all_succeeded());
        assert_eq!(report.failed_ids(), vec![1, 3]);
        assert_eq!(report.succeeded_ids(), vec![2]);
    }

    #[test]
    fn test_text_rendering() -> Result<()> {
        let mut out = Vec::new();
        sample_report().write_text(&mut out)?;
        let text = String::from_utf8(out)?;
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "result #1: id=3 worker=1 FAILED: record 3 rejected: fault injected"
        );
        assert_eq!(lines[1], "result #2: id=2 worker=0 Processed user 2");
        assert_eq!(
            lines[3],
            "DONE! processed 3 records (1 succeeded, 2 failed) in 1.50 seconds"
        );
        Ok(())
    }

    #[test]
    fn test_json_rendering() -> Result<()> {
        let json: serde_json::Value = serde_json::from_str(&sample_report().to_json()?)?;
        assert_eq!(json["records"], 3);
        assert_eq!(json["failures"], 2);
        assert_eq!(json["elapsed_secs"], 1.5);
        assert_eq!(json["generation"]["taken"], 3);
        assert_eq!(json["items"][0]["outcome"]["status"], "failure");
        assert_eq!(json["items"][0]["outcome"]["detail"]["kind"], "rejected");
        assert_eq!(json["items"][1]["outcome"]["detail"], "Processed user 2");
        Ok(())
    }
}
