//! CLI definitions and argument types.

use std::path::PathBuf;

use asmdiff::DEFAULT_TIMEOUT_SECS;
use clap::Parser;

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "asmdiff")]
#[command(about = "Check generated assembly against a reference compiler")]
#[command(version)]
pub struct Cli {
    /// Target architectures (riscv64, aarch64, comma-separated, or "all")
    #[arg(long, default_value = "all")]
    pub target: String,

    /// Test kinds (c, minimoonbit/mbt, comma-separated, or "all")
    #[arg(long = "type", visible_alias = "kind", default_value = "all")]
    pub kind: String,

    /// Test a single file (.c or .mbt) instead of the whole corpus
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Project root; corpus and runtime paths are relative to it
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Directory for transient artifacts (default: the project root)
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Number of parallel cases (0 = one per CPU)
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    /// Per-process timeout in seconds (0 = none)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Treat compiler output on a successful exit as a compilation failure
    #[arg(long)]
    pub strict_diagnostics: bool,

    #[command(flatten)]
    pub tools: ToolArgs,

    /// Show metrics summary after execution
    #[arg(long)]
    pub metrics: bool,

    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress per-case progress (only show summaries and errors)
    #[arg(short, long, conflicts_with = "verbose")]
    pub silent: bool,
}

/// Overrides for the external programs.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct ToolArgs {
    /// Launcher for the compiler under test
    #[arg(long, value_name = "PROGRAM")]
    pub compiler: Option<PathBuf>,

    /// Reference C compiler
    #[arg(long, value_name = "PROGRAM")]
    pub reference_cc: Option<PathBuf>,

    /// RISC-V cross linker (default: auto-detected <prefix>gcc)
    #[arg(long, value_name = "PROGRAM")]
    pub riscv_cc: Option<PathBuf>,

    /// Assembler/linker driver for aarch64
    #[arg(long, value_name = "PROGRAM")]
    pub aarch64_cc: Option<PathBuf>,

    /// Instruction-set simulator for riscv64
    #[arg(long, value_name = "PROGRAM")]
    pub simulator: Option<PathBuf>,

    /// OS-emulation shim passed to the simulator
    #[arg(long, value_name = "SHIM")]
    pub simulator_shim: Option<String>,
}
