//! asmdiff - differential validation of generated assembly
//!
//! Compiles each corpus program with the compiler under test for a target
//! architecture, links and runs the result, and checks that it behaves exactly
//! like the same program built by a trusted reference compiler (or, for
//! languages without one, like a recorded answer file).
//!
//! # Example
//!
//! ```ignore
//! use asmdiff::{FailureLedger, HarnessConfig, SuiteRunner, TargetArch, TestKind, Toolchain};
//!
//! let config = HarnessConfig::default().with_jobs(0);
//! let toolchain = Toolchain::new(config.tools.clone());
//! toolchain.verify(&config, TargetArch::ALL, TestKind::ALL)?;
//!
//! let ledger = FailureLedger::new();
//! let runner = SuiteRunner::new(&config, &toolchain, &ledger)?;
//! let cases = asmdiff::discover(&config.resolve(&config.c.source_dir), TestKind::C)?;
//! let result = runner.run(TestKind::C, TargetArch::Riscv64, &cases)?;
//! print!("{}", ledger.report());
//! ```

pub mod arch;
pub mod artifacts;
pub mod build_utils;
pub mod case;
pub mod compare;
pub mod config;
mod error;
pub mod executor;
pub mod ledger;
pub mod metrics;
pub mod process;
pub mod suite;
pub mod toolchain;

pub use arch::TargetArch;
pub use artifacts::{ArtifactPaths, ArtifactSet};
pub use case::{MismatchDetail, Stage, StageOutcome, StreamDiff, TestCase, TestKind};
pub use compare::{compare_oracle, compare_results};
pub use config::{CorpusConfig, DEFAULT_TIMEOUT_SECS, HarnessConfig, ToolConfig};
pub use error::{Error, Result};
pub use executor::CaseExecutor;
pub use ledger::{FailureLedger, FailureRecord};
pub use process::{ProcessResult, ProcessRunner, RunError, ToolCommand};
pub use suite::{SuiteResult, SuiteRunner, check_runtimes, discover, resolve_single};
pub use toolchain::{ArchCommands, ExecutionStrategy, Toolchain};
