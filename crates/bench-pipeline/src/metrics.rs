//! Run metrics and reporting.

use serde::Serialize;
use std::time::Duration;

/// Outcome of a completed bulk-load run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Records successfully handed to the sink.
    pub inserted_count: u64,
    /// Wall-clock duration of the load phase.
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl RunResult {
    /// Insert throughput over the whole run.
    pub fn rows_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.inserted_count as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Outcome of an optional point-read phase.
#[derive(Debug, Clone, Serialize)]
pub struct ReadResult {
    /// Point reads performed.
    pub lookups: u64,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl ReadResult {
    pub fn lookups_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.lookups as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Serializable summary of a full benchmark invocation.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub backend: String,
    pub target_record_count: u64,
    pub bulk_size: usize,
    pub worker_count: usize,
    pub inserted_count: u64,
    pub insert_elapsed_ms: u64,
    pub insert_rows_per_second: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_lookups: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_elapsed_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_lookups_per_second: Option<f64>,
}

impl RunReport {
    /// Assemble a report from the load result and an optional read result.
    pub fn new(
        backend: impl Into<String>,
        target_record_count: u64,
        bulk_size: usize,
        worker_count: usize,
        run: &RunResult,
        read: Option<&ReadResult>,
    ) -> Self {
        Self {
            backend: backend.into(),
            target_record_count,
            bulk_size,
            worker_count,
            inserted_count: run.inserted_count,
            insert_elapsed_ms: run.elapsed.as_millis() as u64,
            insert_rows_per_second: run.rows_per_second(),
            read_lookups: read.map(|r| r.lookups),
            read_elapsed_ms: read.map(|r| r.elapsed.as_millis() as u64),
            read_lookups_per_second: read.map(|r| r.lookups_per_second()),
        }
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_per_second() {
        let result = RunResult {
            inserted_count: 1_000,
            elapsed: Duration::from_secs(10),
        };
        assert_eq!(result.rows_per_second(), 100.0);
    }

    #[test]
    fn test_zero_duration_throughput() {
        let result = RunResult {
            inserted_count: 1_000,
            elapsed: Duration::ZERO,
        };
        assert_eq!(result.rows_per_second(), 0.0);
    }

    #[test]
    fn test_report_omits_absent_read_phase() {
        let run = RunResult {
            inserted_count: 500,
            elapsed: Duration::from_secs(5),
        };
        let report = RunReport::new("mongodb", 500, 100, 4, &run, None);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["backend"], "mongodb");
        assert_eq!(json["inserted_count"], 500);
        assert!(json.get("read_lookups").is_none());
    }
}
