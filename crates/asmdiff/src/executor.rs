//! End-to-end execution of one test case on one architecture.
//!
//! Stages run strictly in order and stop at the first failure:
//! source check, compile under test, assemble/link, reference build (or
//! oracle lookup), run both binaries, compare. Artifacts are owned by an
//! [`ArtifactSet`] and removed when `execute` returns, whatever the outcome.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info_span};

use crate::arch::TargetArch;
use crate::artifacts::{ArtifactPaths, ArtifactSet};
use crate::case::{StageOutcome, TestCase};
use crate::compare::{compare_oracle, compare_results};
use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::metrics;
use crate::process::{ProcessResult, ProcessRunner, RunError, ToolCommand};
use crate::toolchain::{ExecutionStrategy, Toolchain};

/// Outcome of one subprocess from the executor's point of view:
/// `Ok(Ok(_))` finished, `Ok(Err(detail))` per-case failure, `Err(_)` fatal.
type StepResult = Result<std::result::Result<ProcessResult, String>>;

/// What the binary under test is checked against.
enum Baseline {
    /// Executable built by the reference compiler.
    Reference(PathBuf),
    /// Recorded stdout.
    Oracle(Vec<u8>),
}

/// Runs single (case, architecture) pairs.
pub struct CaseExecutor<'a> {
    config: &'a HarnessConfig,
    toolchain: &'a Toolchain,
    runner: ProcessRunner,
    work_dir: PathBuf,
}

impl<'a> CaseExecutor<'a> {
    /// Create an executor writing artifacts to the configured work directory.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the work directory cannot be created.
    pub fn new(config: &'a HarnessConfig, toolchain: &'a Toolchain) -> Result<Self> {
        let work_dir = std::path::absolute(config.work_dir())?;
        std::fs::create_dir_all(&work_dir)?;
        Ok(Self {
            config,
            toolchain,
            runner: ProcessRunner::new().with_timeout(config.timeout),
            work_dir,
        })
    }

    /// Run `case` on `arch` and classify the result.
    ///
    /// # Errors
    ///
    /// Only fatal conditions are errors: a toolchain program that cannot be
    /// launched, or an IO failure reading an oracle file. Every other failure
    /// is returned as a [`StageOutcome`].
    pub fn execute(&self, case: &TestCase, arch: TargetArch) -> Result<StageOutcome> {
        let _span = info_span!("case", name = %case.name, kind = %case.kind, arch = %arch).entered();
        let start = Instant::now();

        let outcome = self.execute_stages(case, arch)?;

        metrics::record_case(case.kind, arch, &outcome, start.elapsed());
        debug!(outcome = %outcome.status_label(), elapsed_ms = start.elapsed().as_millis(), "case finished");
        Ok(outcome)
    }

    fn execute_stages(&self, case: &TestCase, arch: TargetArch) -> Result<StageOutcome> {
        if !case.source.is_file() {
            return Ok(StageOutcome::SourceNotFound {
                path: case.source.clone(),
            });
        }

        let corpus = self.config.corpus(case.kind);
        let oracle = match &corpus.oracle_dir {
            Some(dir) => {
                let answer = self.config.resolve(dir).join(format!("{}.ans", case.name));
                if !answer.is_file() {
                    debug!(path = %answer.display(), "no answer file");
                    return Ok(StageOutcome::Skipped {
                        reason: "no answer file".to_string(),
                    });
                }
                Some(std::fs::read(&answer)?)
            }
            None => None,
        };

        let paths = ArtifactPaths::new(&self.work_dir, &case.name, arch);
        let mut artifacts = ArtifactSet::new();
        let runtime = self.config.resolve(&corpus.runtime);
        let commands = self.toolchain.commands_for(arch);

        // Compile under test.
        let asm = artifacts.track(&paths.assembly);
        let compile = self
            .toolchain
            .compile_under_test(corpus, &case.source, arch, &asm);
        let compiled = match self.run_step(&compile, true)? {
            Ok(result) => result,
            Err(detail) => return Ok(StageOutcome::FailedAtCompilation { detail }),
        };
        if !compiled.success() {
            return Ok(StageOutcome::FailedAtCompilation {
                detail: failure_detail(&compiled, "compilation failed"),
            });
        }
        if self.config.strict_diagnostics && compiled.has_output() {
            return Ok(StageOutcome::FailedAtCompilation {
                detail: format!("unexpected compiler output: {}", compiled.diagnostics()),
            });
        }

        // Assemble and link.
        let exe = artifacts.track(&paths.under_test);
        let link = commands.assemble_and_link(&asm, &runtime, &exe);
        let linked = match self.run_step(&link, true)? {
            Ok(result) => result,
            Err(detail) => return Ok(StageOutcome::FailedAtAssembly { detail }),
        };
        if !linked.success() {
            return Ok(StageOutcome::FailedAtAssembly {
                detail: failure_detail(&linked, "Assembly linking failed"),
            });
        }

        // Reference build.
        let baseline = match oracle {
            Some(expected) => Baseline::Oracle(expected),
            None => {
                let out = artifacts.track(&paths.reference);
                let build = self.toolchain.compile_reference(&case.source, &runtime, &out);
                let built = match self.run_step(&build, true)? {
                    Ok(result) => result,
                    Err(detail) => {
                        return Ok(StageOutcome::FailedAtReferenceCompilation { detail });
                    }
                };
                if !built.success() {
                    return Ok(StageOutcome::FailedAtReferenceCompilation {
                        detail: failure_detail(&built, "Standard compilation failed"),
                    });
                }
                Baseline::Reference(out)
            }
        };

        // Run the binary under test. With a simulator the launched program is a
        // tool; run natively, the launched program is our own artifact.
        let run = commands.run_under_test(&exe);
        let simulated = commands.execution() == ExecutionStrategy::Simulated;
        let under_test = match self.run_step(&run, simulated)? {
            Ok(result) => result,
            Err(detail) => {
                return Ok(StageOutcome::FailedAtExecution {
                    detail: self.execution_hint(arch, detail),
                });
            }
        };

        let outcome = match baseline {
            Baseline::Oracle(expected) => compare_oracle(&under_test.stdout, &expected),
            Baseline::Reference(reference_exe) => {
                let run = self.toolchain.run_reference(&reference_exe);
                match self.run_step(&run, false)? {
                    Ok(reference) => compare_results(&under_test, &reference),
                    Err(detail) => StageOutcome::FailedAtExecution {
                        detail: format!("reference binary: {detail}"),
                    },
                }
            }
        };
        Ok(outcome)
    }

    fn run_step(&self, command: &ToolCommand, program_is_tool: bool) -> StepResult {
        match self.runner.run(command) {
            Ok(result) => Ok(Ok(result)),
            Err(err) => classify(err, program_is_tool).map(Err),
        }
    }

    fn execution_hint(&self, arch: TargetArch, detail: String) -> String {
        if arch.is_host_native()
            || self.toolchain.commands_for(arch).execution() != ExecutionStrategy::Native
        {
            return detail;
        }
        format!(
            "{detail} (host is {}; {arch} binaries need a compatible CPU or emulation)",
            std::env::consts::ARCH
        )
    }
}

/// Split a run error into a per-case failure detail or a fatal error.
///
/// Launch failures of toolchain programs are fatal. Launch failures of
/// produced binaries and all timeouts are per-case.
fn classify(err: RunError, program_is_tool: bool) -> Result<String> {
    match err {
        RunError::TimedOut { .. } => Ok(err.to_string()),
        RunError::NotFound { .. } | RunError::Launch { .. } if !program_is_tool => {
            Ok(err.to_string())
        }
        RunError::NotFound { program } => Err(Error::tooling(program, "not found")),
        RunError::Launch { program, source } => Err(Error::tooling(program, source.to_string())),
        RunError::Io(e) => Err(Error::Io(e)),
    }
}

fn failure_detail(result: &ProcessResult, fallback: &str) -> String {
    let diagnostics = result.diagnostics();
    if diagnostics.is_empty() {
        format!("{fallback} (exit code {})", result.exit_code)
    } else {
        diagnostics
    }
}
