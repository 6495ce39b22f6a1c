use std::io::Write;

use itertools::Itertools;
use serde::Serialize;

use crate::error::StoreError;
use crate::metrics::mean;
use crate::result::TestResult;

/// Finished results, newest first. Entries are only ever prepended.
#[derive(Debug, Clone, Default)]
pub struct History {
    results: Vec<TestResult>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistorySummary {
    pub tests: usize,
    pub best_wpm: u32,
    pub average_wpm: f64,
    pub average_accuracy: f64,
    pub total_secs: f64,
}

#[derive(Serialize)]
struct CsvRow {
    date: String,
    mode: String,
    duration_secs: Option<u32>,
    word_count: usize,
    wpm: u32,
    raw_wpm: u32,
    accuracy: u32,
    consistency: u32,
    elapsed_secs: String,
    personal_best: bool,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt results loaded from storage, whatever order they arrive in.
    pub fn from_results(results: Vec<TestResult>) -> Self {
        let results = results
            .into_iter()
            .sorted_by(|a, b| b.timestamp.cmp(&a.timestamp))
            .collect();
        Self { results }
    }

    pub fn record(&mut self, result: TestResult) {
        self.results.insert(0, result);
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn latest(&self) -> Option<&TestResult> {
        self.results.first()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Fastest earlier result sharing `result`'s configuration
    pub fn best_matching(&self, result: &TestResult) -> Option<&TestResult> {
        self.results
            .iter()
            .filter(|r| r.same_configuration(result))
            .max_by_key(|r| r.wpm)
    }

    /// True when nothing in the same configuration is at least as fast.
    /// The first result of a configuration is a personal best.
    pub fn is_personal_best(&self, result: &TestResult) -> bool {
        self.best_matching(result)
            .map_or(true, |best| result.wpm > best.wpm)
    }

    pub fn summary(&self) -> HistorySummary {
        let wpms: Vec<f64> = self.results.iter().map(|r| r.wpm as f64).collect();
        let accuracies: Vec<f64> = self.results.iter().map(|r| r.accuracy as f64).collect();
        HistorySummary {
            tests: self.results.len(),
            best_wpm: self.results.iter().map(|r| r.wpm).max().unwrap_or(0),
            average_wpm: mean(&wpms).unwrap_or(0.0),
            average_accuracy: mean(&accuracies).unwrap_or(0.0),
            total_secs: self.results.iter().map(|r| r.elapsed_secs).sum(),
        }
    }

    /// Write every result as a CSV row, newest first.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<(), StoreError> {
        let mut wtr = csv::Writer::from_writer(writer);
        for result in &self.results {
            wtr.serialize(CsvRow {
                date: result.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                mode: result.mode.to_string(),
                duration_secs: result.duration_secs,
                word_count: result.word_count,
                wpm: result.wpm,
                raw_wpm: result.raw_wpm,
                accuracy: result.accuracy,
                consistency: result.consistency,
                elapsed_secs: format!("{:.2}", result.elapsed_secs),
                personal_best: result.is_personal_best,
            })?;
        }
        wtr.flush()?;
        Ok(())
    }
}
