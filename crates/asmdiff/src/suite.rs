//! Corpus discovery and suite execution.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info};

use crate::arch::TargetArch;
use crate::case::{StageOutcome, TestCase, TestKind};
use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::executor::CaseExecutor;
use crate::ledger::{FailureLedger, FailureRecord};
use crate::toolchain::Toolchain;

/// Called once per finished case, in completion order.
pub type ProgressFn<'a> = dyn Fn(&TestCase, TargetArch, &StageOutcome) + Send + Sync + 'a;

/// Aggregate result of one (kind, architecture) suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteResult {
    pub kind: TestKind,
    pub arch: TargetArch,
    pub passed: usize,
    pub skipped: usize,
    /// Failing case names, in input order.
    pub failed: Vec<String>,
}

impl SuiteResult {
    const fn new(kind: TestKind, arch: TargetArch) -> Self {
        Self {
            kind,
            arch,
            passed: 0,
            skipped: 0,
            failed: Vec::new(),
        }
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// List the sources of `kind` in `dir`, sorted by file name.
///
/// # Errors
///
/// Returns [`Error::MissingPrecondition`] if `dir` does not exist.
pub fn discover(dir: &Path, kind: TestKind) -> Result<Vec<TestCase>> {
    if !dir.is_dir() {
        return Err(Error::missing("corpus directory", dir));
    }
    let mut sources: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && TestKind::from_path(path) == Some(kind))
        .collect();
    sources.sort();
    debug!(dir = %dir.display(), count = sources.len(), kind = %kind, "discovered cases");
    Ok(sources
        .into_iter()
        .map(|source| TestCase::from_path(source, kind))
        .collect())
}

/// Fail fast if a runtime support file needed by `kinds` is absent.
///
/// # Errors
///
/// Returns [`Error::MissingPrecondition`] naming the first missing file.
pub fn check_runtimes(config: &HarnessConfig, kinds: &[TestKind]) -> Result<()> {
    for &kind in kinds {
        let runtime = config.resolve(&config.corpus(kind).runtime);
        if !runtime.is_file() {
            return Err(Error::missing("runtime file", &runtime));
        }
    }
    Ok(())
}

/// Build the case for a single file given on the command line.
///
/// The kind comes from the extension. A bare file name that does not exist
/// in the working directory is looked up in the kind's corpus directory.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the extension is neither `.c` nor `.mbt`.
pub fn resolve_single(config: &HarnessConfig, file: &Path) -> Result<TestCase> {
    let kind = TestKind::from_path(file)
        .ok_or_else(|| Error::InvalidInput(format!("{}: file must be .c or .mbt", file.display())))?;

    let mut source = file.to_path_buf();
    if !source.exists() && file.components().count() == 1 {
        let candidate = config.resolve(&config.corpus(kind).source_dir).join(file);
        if candidate.exists() {
            source = candidate;
        }
    }
    Ok(TestCase::from_path(source, kind))
}

/// Runs ordered case lists through a [`CaseExecutor`].
pub struct SuiteRunner<'a> {
    executor: CaseExecutor<'a>,
    ledger: &'a FailureLedger,
    pool: Option<rayon::ThreadPool>,
    progress: Option<Box<ProgressFn<'a>>>,
}

impl<'a> SuiteRunner<'a> {
    /// # Errors
    ///
    /// Returns an error if the work directory or the worker pool cannot be created.
    pub fn new(
        config: &'a HarnessConfig,
        toolchain: &'a Toolchain,
        ledger: &'a FailureLedger,
    ) -> Result<Self> {
        let jobs = config.effective_jobs();
        let pool = if jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .thread_name(|i| format!("asmdiff-worker-{i}"))
                .build()
                .map_err(|e| Error::InvalidInput(format!("worker pool: {e}")))?;
            Some(pool)
        } else {
            None
        };
        Ok(Self {
            executor: CaseExecutor::new(config, toolchain)?,
            ledger,
            pool,
            progress: None,
        })
    }

    #[must_use]
    pub fn with_progress(
        mut self,
        progress: impl Fn(&TestCase, TargetArch, &StageOutcome) + Send + Sync + 'a,
    ) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Run every case on `arch`. A failing case never stops the ones after it.
    ///
    /// Failures are appended to the ledger in input order, whatever order the
    /// workers finished in.
    ///
    /// # Errors
    ///
    /// Only fatal errors from [`CaseExecutor::execute`] are returned; the
    /// remaining cases are abandoned.
    pub fn run(&self, kind: TestKind, arch: TargetArch, cases: &[TestCase]) -> Result<SuiteResult> {
        info!(kind = %kind, arch = %arch, cases = cases.len(), "running suite");

        let outcomes: Vec<StageOutcome> = match &self.pool {
            Some(pool) if cases.len() > 1 => pool.install(|| {
                cases
                    .par_iter()
                    .map(|case| self.run_case(case, arch))
                    .collect::<Result<Vec<_>>>()
            })?,
            _ => cases
                .iter()
                .map(|case| self.run_case(case, arch))
                .collect::<Result<Vec<_>>>()?,
        };

        let mut result = SuiteResult::new(kind, arch);
        for (case, outcome) in cases.iter().zip(&outcomes) {
            if outcome.is_pass() {
                result.passed += 1;
            } else if outcome.is_skip() {
                result.skipped += 1;
            } else {
                result.failed.push(case.name.clone());
            }
            if let Some(record) = FailureRecord::from_outcome(case, arch, outcome) {
                self.ledger.record(record);
            }
        }
        Ok(result)
    }

    fn run_case(&self, case: &TestCase, arch: TargetArch) -> Result<StageOutcome> {
        let outcome = self.executor.execute(case, arch)?;
        if let Some(progress) = &self.progress {
            progress(case, arch, &outcome);
        }
        Ok(outcome)
    }
}
