//! Test cases and per-case outcomes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Longest literal stream value shown in a mismatch detail.
const MAX_LITERAL_CHARS: usize = 200;

/// Source language of a corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TestKind {
    /// C sources, checked against a live reference compiler.
    C,
    /// MiniMoonBit sources, checked against recorded answer files.
    MiniMoonBit,
}

impl TestKind {
    pub const ALL: &'static [Self] = &[Self::C, Self::MiniMoonBit];

    /// Name used in reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::MiniMoonBit => "MiniMoonBit",
        }
    }

    /// Short tag used in progress lines.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::MiniMoonBit => "MBT",
        }
    }

    /// Source file extension (without the dot).
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::C => "c",
            Self::MiniMoonBit => "mbt",
        }
    }

    /// Infer the kind from a source path's extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ALL
            .iter()
            .copied()
            .find(|kind| ext.eq_ignore_ascii_case(kind.extension()))
    }

    /// Parse comma-separated list of kinds (or "all").
    pub fn parse_list(s: &str) -> Result<Vec<Self>, String> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::ALL.to_vec());
        }
        s.split(',').map(|part| part.trim().parse()).collect()
    }
}

impl FromStr for TestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "c" => Ok(Self::C),
            "mbt" | "minimoonbit" => Ok(Self::MiniMoonBit),
            _ => Err(format!("unknown test kind '{s}', expected one of: c, minimoonbit")),
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One source program in a corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Base name (file stem); also the stem of every artifact.
    pub name: String,
    pub source: PathBuf,
    pub kind: TestKind,
}

impl TestCase {
    /// Build a case from a source path, taking the name from its stem.
    #[must_use]
    pub fn from_path(source: impl Into<PathBuf>, kind: TestKind) -> Self {
        let source = source.into();
        let name = source
            .file_stem()
            .map_or_else(|| "unknown".to_string(), |s| s.to_string_lossy().into_owned());
        Self { name, source, kind }
    }
}

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Compilation,
    Assembly,
    ReferenceCompilation,
    Execution,
    OutputMismatch,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Compilation => "compilation",
            Self::Assembly => "assembly",
            Self::ReferenceCompilation => "reference_compilation",
            Self::Execution => "execution",
            Self::OutputMismatch => "output_mismatch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected and actual contents of one diverging output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDiff {
    pub expected: Vec<u8>,
    pub actual: Vec<u8>,
}

/// Which observable fields diverged, with their literal values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MismatchDetail {
    /// `(actual, expected)` exit codes.
    pub exit_code: Option<(i32, i32)>,
    pub stdout: Option<StreamDiff>,
    pub stderr: Option<StreamDiff>,
}

impl MismatchDetail {
    /// Names of the diverging fields.
    #[must_use]
    pub fn diverged(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.exit_code.is_some() {
            fields.push("exit code");
        }
        if self.stdout.is_some() {
            fields.push("stdout");
        }
        if self.stderr.is_some() {
            fields.push("stderr");
        }
        fields
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exit_code.is_none() && self.stdout.is_none() && self.stderr.is_none()
    }
}

impl fmt::Display for MismatchDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some((actual, expected)) = self.exit_code {
            parts.push(format!("Return code: {actual} vs {expected}"));
        }
        for (stream, diff) in [("stdout", &self.stdout), ("stderr", &self.stderr)] {
            if let Some(diff) = diff {
                parts.push(format!("Expected {stream}: {}", literal(&diff.expected)));
                parts.push(format!("Got {stream}: {}", literal(&diff.actual)));
            }
        }
        f.write_str(&parts.join(" | "))
    }
}

/// Quoted, length-bounded rendering of captured bytes.
fn literal(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let (head, omitted) = clip(&text, MAX_LITERAL_CHARS);
    if omitted == 0 {
        format!("{head:?}")
    } else {
        format!("{head:?}... [{omitted} chars omitted]")
    }
}

/// Longest prefix of `s` with at most `max_chars` characters, plus how many were cut.
pub(crate) fn clip(s: &str, max_chars: usize) -> (&str, usize) {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => (&s[..idx], s[idx..].chars().count()),
        None => (s, 0),
    }
}

/// Result of running one case on one architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Passed,
    /// No oracle file exists for the case.
    Skipped { reason: String },
    /// The source file does not exist; no tool was invoked.
    SourceNotFound { path: PathBuf },
    FailedAtCompilation { detail: String },
    FailedAtAssembly { detail: String },
    /// The reference compiler rejected the source (a harness problem, not a codegen defect).
    FailedAtReferenceCompilation { detail: String },
    /// A produced binary could not be launched or did not finish in time.
    FailedAtExecution { detail: String },
    FailedOnMismatch(MismatchDetail),
}

impl StageOutcome {
    #[must_use]
    pub const fn is_pass(&self) -> bool {
        matches!(self, Self::Passed)
    }

    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        !self.is_pass() && !self.is_skip()
    }

    /// Stage a failure belongs to; `None` for passes and skips.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Passed | Self::Skipped { .. } => None,
            Self::SourceNotFound { .. } | Self::FailedAtCompilation { .. } => {
                Some(Stage::Compilation)
            }
            Self::FailedAtAssembly { .. } => Some(Stage::Assembly),
            Self::FailedAtReferenceCompilation { .. } => Some(Stage::ReferenceCompilation),
            Self::FailedAtExecution { .. } => Some(Stage::Execution),
            Self::FailedOnMismatch(_) => Some(Stage::OutputMismatch),
        }
    }

    /// Diagnostic text for reports.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Passed => String::new(),
            Self::Skipped { reason } => reason.clone(),
            Self::SourceNotFound { path } => {
                format!("source file not found: {}", path.display())
            }
            Self::FailedAtCompilation { detail }
            | Self::FailedAtAssembly { detail }
            | Self::FailedAtReferenceCompilation { detail }
            | Self::FailedAtExecution { detail } => detail.clone(),
            Self::FailedOnMismatch(mismatch) => mismatch.to_string(),
        }
    }

    /// Short status for progress lines (e.g. `FAIL (assembly)`).
    #[must_use]
    pub fn status_label(&self) -> String {
        match self {
            Self::Passed => "PASS".to_string(),
            Self::Skipped { reason } => format!("SKIP ({reason})"),
            Self::SourceNotFound { .. } => "FAIL (not found)".to_string(),
            Self::FailedOnMismatch(_) => "FAIL (output mismatch)".to_string(),
            other => match other.stage() {
                Some(stage) => format!("FAIL ({})", stage.as_str().replace('_', " ")),
                None => "FAIL".to_string(),
            },
        }
    }
}
