//! Report module: prints human-readable comparison of fetch strategies.

use crate::executor::Measurement;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

/// Results from the sampled runs of one plan on one table layout.
#[derive(Debug, Clone)]
pub struct StrategyResult {
    pub label: String,
    /// e.g. `unindexed` / `indexed`.
    pub layout: String,
    /// Whether SQLite resolved the plan's filter through an index.
    pub index_used: bool,
    pub durations: Vec<Duration>,
    pub round_trips: Vec<u64>,
    pub rows: u64,
}

impl StrategyResult {
    pub fn new(label: &str, layout: &str, index_used: bool) -> Self {
        Self {
            label: label.to_string(),
            layout: layout.to_string(),
            index_used,
            durations: Vec::new(),
            round_trips: Vec::new(),
            rows: 0,
        }
    }

    pub fn add_sample(&mut self, m: &Measurement) {
        self.durations.push(m.elapsed);
        self.round_trips.push(m.round_trips);
        self.rows = m.outcome.rows();
    }

    pub fn mean_us(&self) -> f64 {
        if self.durations.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.durations.iter().map(|d| d.as_secs_f64() * 1e6).sum();
        sum / self.durations.len() as f64
    }

    pub fn percentile_us(&self, pct: f64) -> f64 {
        if self.durations.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self
            .durations
            .iter()
            .map(|d| d.as_secs_f64() * 1e6)
            .collect();
        sorted.sort_by(f64::total_cmp);
        let idx = ((pct / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    pub fn mean_round_trips(&self) -> f64 {
        if self.round_trips.is_empty() {
            return 0.0;
        }
        self.round_trips.iter().sum::<u64>() as f64 / self.round_trips.len() as f64
    }

    pub fn summary(&self) -> ResultSummary {
        ResultSummary {
            label: self.label.clone(),
            layout: self.layout.clone(),
            index_used: self.index_used,
            samples: self.durations.len(),
            mean_us: self.mean_us(),
            p50_us: self.percentile_us(50.0),
            p95_us: self.percentile_us(95.0),
            p99_us: self.percentile_us(99.0),
            mean_round_trips: self.mean_round_trips(),
            rows: self.rows,
        }
    }
}

/// Flattened statistics, as written to the JSON report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub label: String,
    pub layout: String,
    pub index_used: bool,
    pub samples: usize,
    pub mean_us: f64,
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub mean_round_trips: f64,
    pub rows: u64,
}

/// Render the per-plan blocks and the comparison table.
pub fn format_report(results: &[StrategyResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", "=".repeat(80));
    let _ = writeln!(out, "  Fetch Strategy Benchmark Report");
    let _ = writeln!(out, "{}", "=".repeat(80));

    for result in results {
        let _ = writeln!(
            out,
            "\n  Plan: {} | Table: {}{}",
            result.label,
            result.layout,
            if result.index_used { " (index)" } else { "" }
        );
        let _ = writeln!(out, "  {}", "-".repeat(60));
        let mean = result.mean_us();
        let _ = writeln!(out, "  Mean:            {:>10.0}µs  ({:.2}ms)", mean, mean / 1000.0);
        let _ = writeln!(out, "  p50:             {:>10.0}µs", result.percentile_us(50.0));
        let _ = writeln!(out, "  p95:             {:>10.0}µs", result.percentile_us(95.0));
        let _ = writeln!(out, "  p99:             {:>10.0}µs", result.percentile_us(99.0));
        let _ = writeln!(out, "  Round-trips:     {:>10.1}", result.mean_round_trips());
        let _ = writeln!(out, "  Rows:            {:>10}", result.rows);
    }

    let _ = writeln!(out, "\n{}", "=".repeat(80));

    if results.len() >= 2 {
        let _ = writeln!(out, "\n  Comparison Summary:");
        let _ = writeln!(
            out,
            "  {:44} {:>10} {:>12} {:>12} {:>10}",
            "Plan / Table", "Rows", "Mean (µs)", "p95 (µs)", "Trips"
        );
        let _ = writeln!(out, "  {}", "-".repeat(92));

        let mut sorted: Vec<&StrategyResult> = results.iter().collect();
        sorted.sort_by(|a, b| a.mean_us().total_cmp(&b.mean_us()));
        for r in sorted {
            let label = format!("{}/{}", r.label, r.layout);
            let _ = writeln!(
                out,
                "  {:44} {:>10} {:>12.0} {:>12.0} {:>10.1}",
                truncate(&label, 44),
                r.rows,
                r.mean_us(),
                r.percentile_us(95.0),
                r.mean_round_trips()
            );
        }
    }

    out
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(width - 1).collect();
        t.push('…');
        t
    }
}

pub fn print_report(results: &[StrategyResult]) {
    println!("{}", format_report(results));
}

/// Write the summaries of `results` as pretty JSON.
pub fn write_json(results: &[StrategyResult], path: &Path) -> anyhow::Result<()> {
    let summaries: Vec<ResultSummary> = results.iter().map(StrategyResult::summary).collect();
    let json = serde_json::to_string_pretty(&summaries)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Outcome;

    fn measurement(us: u64, trips: u64) -> Measurement {
        Measurement {
            label: "x".to_string(),
            elapsed: Duration::from_micros(us),
            round_trips: trips,
            outcome: Outcome::Rows(3),
        }
    }

    #[test]
    fn statistics_over_samples() {
        let mut r = StrategyResult::new("flat-list-fetch:databook_id", "unindexed", false);
        for (us, trips) in [(100, 1), (200, 1), (300, 2), (400, 2)] {
            r.add_sample(&measurement(us, trips));
        }
        assert!((r.mean_us() - 250.0).abs() < 1e-6);
        assert!((r.percentile_us(0.0) - 100.0).abs() < 1e-6);
        assert!((r.percentile_us(100.0) - 400.0).abs() < 1e-6);
        assert!((r.mean_round_trips() - 1.5).abs() < 1e-9);
        assert_eq!(r.rows, 3);
        assert_eq!(r.summary().samples, 4);
    }

    #[test]
    fn empty_result_reports_zeroes() {
        let r = StrategyResult::new("count", "indexed", true);
        assert_eq!(r.mean_us(), 0.0);
        assert_eq!(r.percentile_us(95.0), 0.0);
        assert_eq!(r.mean_round_trips(), 0.0);
    }

    #[test]
    fn report_lists_every_plan_in_comparison() {
        let mut fast = StrategyResult::new("count", "indexed", true);
        fast.add_sample(&measurement(10, 1));
        let mut slow = StrategyResult::new("chunked-iteration:100", "unindexed", false);
        slow.add_sample(&measurement(900, 10));

        let text = format_report(&[slow, fast]);
        assert!(text.contains("Comparison Summary"));
        assert!(text.contains("Plan: count | Table: indexed (index)"));
        let fast_pos = text.rfind("count/indexed").unwrap();
        let slow_pos = text.rfind("chunked-iteration:100/unindexed").unwrap();
        assert!(fast_pos < slow_pos, "comparison is sorted by mean");
    }

    #[test]
    fn long_labels_are_truncated() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
