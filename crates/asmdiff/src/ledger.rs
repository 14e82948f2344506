//! Run-wide failure accumulation and the grouped failure report.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use parking_lot::Mutex;

use crate::arch::TargetArch;
use crate::case::{Stage, StageOutcome, TestCase, TestKind, clip};

/// Longest detail kept per record, in characters.
pub const MAX_DETAIL_CHARS: usize = 500;
/// Detail lines shown per entry in the report.
const REPORT_DETAIL_LINES: usize = 3;
/// Longest detail line shown in the report, in characters.
const REPORT_LINE_CHARS: usize = 100;
const RULE_WIDTH: usize = 80;

/// One non-passing (case, architecture) result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub test: String,
    pub kind: TestKind,
    pub arch: TargetArch,
    pub stage: Stage,
    /// Diagnostic text, bounded to [`MAX_DETAIL_CHARS`].
    pub detail: String,
}

impl FailureRecord {
    /// Build a record with the detail truncated. Returns `None` for passes and skips.
    #[must_use]
    pub fn from_outcome(case: &TestCase, arch: TargetArch, outcome: &StageOutcome) -> Option<Self> {
        let stage = outcome.stage()?;
        Some(Self {
            test: case.name.clone(),
            kind: case.kind,
            arch,
            stage,
            detail: truncate_detail(&outcome.detail()),
        })
    }
}

/// Bound `detail` to [`MAX_DETAIL_CHARS`], noting how much was dropped.
#[must_use]
pub fn truncate_detail(detail: &str) -> String {
    clip_marked(detail, MAX_DETAIL_CHARS)
}

fn clip_marked(text: &str, max_chars: usize) -> String {
    let (head, omitted) = clip(text, max_chars);
    if omitted == 0 {
        head.to_string()
    } else {
        format!("{head}... [{omitted} chars omitted]")
    }
}

/// Append-only failure list shared by every suite in a run.
#[derive(Debug, Default)]
pub struct FailureLedger {
    records: Mutex<Vec<FailureRecord>>,
}

impl FailureLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, record: FailureRecord) {
        self.records.lock().push(record);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Snapshot of all records in append order.
    #[must_use]
    pub fn records(&self) -> Vec<FailureRecord> {
        self.records.lock().clone()
    }

    /// Render the grouped report, or an empty string when nothing failed.
    ///
    /// Groups are ordered by (kind, architecture) and then by stage in
    /// pipeline order; entries keep their append order.
    #[must_use]
    pub fn report(&self) -> String {
        let records = self.records.lock();
        if records.is_empty() {
            return String::new();
        }

        let mut groups: BTreeMap<(TestKind, TargetArch), BTreeMap<Stage, Vec<&FailureRecord>>> =
            BTreeMap::new();
        for record in records.iter() {
            groups
                .entry((record.kind, record.arch))
                .or_default()
                .entry(record.stage)
                .or_default()
                .push(record);
        }

        let rule = "=".repeat(RULE_WIDTH);
        let mut out = String::new();
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "FAILURE REPORT");
        let _ = writeln!(out, "{rule}");

        for ((kind, arch), stages) in &groups {
            let count: usize = stages.values().map(Vec::len).sum();
            let _ = writeln!(out);
            let _ = writeln!(out, "{} / {arch} ({count} failures):", kind.label());
            let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));

            for (stage, entries) in stages {
                let _ = writeln!(out);
                let _ = writeln!(
                    out,
                    "  {} ({} tests):",
                    stage.as_str().to_uppercase(),
                    entries.len()
                );
                for record in entries {
                    let _ = writeln!(out, "    • {}", record.test);
                    write_detail(&mut out, &record.detail);
                }
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Total failures: {}", records.len());
        let _ = writeln!(out, "{rule}");
        out
    }
}

fn write_detail(out: &mut String, detail: &str) {
    let lines: Vec<&str> = detail.lines().collect();
    for line in lines.iter().take(REPORT_DETAIL_LINES) {
        let line = line.trim();
        if !line.is_empty() {
            let _ = writeln!(out, "      {}", clip_marked(line, REPORT_LINE_CHARS));
        }
    }
    if lines.len() > REPORT_DETAIL_LINES {
        let _ = writeln!(out, "      ... ({} more lines)", lines.len() - REPORT_DETAIL_LINES);
    }
}
