//! Harness configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::build_utils;
use crate::case::TestKind;

/// Default per-process timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where one test kind's sources, runtime and oracle files live.
#[derive(Debug, Clone)]
pub struct CorpusConfig {
    /// Directory scanned for sources with the kind's extension.
    pub source_dir: PathBuf,
    /// Runtime support file linked into every executable.
    pub runtime: PathBuf,
    /// Arguments placed between the compiler launcher and `--file`.
    pub compiler_args: Vec<String>,
    /// Directory of `<name>.ans` files. When set, stdout is checked against
    /// these files instead of a reference binary.
    pub oracle_dir: Option<PathBuf>,
}

impl CorpusConfig {
    /// Default layout for a test kind.
    #[must_use]
    pub fn for_kind(kind: TestKind) -> Self {
        match kind {
            TestKind::C => Self {
                source_dir: PathBuf::from("real_tests/C"),
                runtime: PathBuf::from("real_tests/cruntime.c"),
                compiler_args: launcher_args("mbtcc"),
                oracle_dir: None,
            },
            TestKind::MiniMoonBit => Self {
                source_dir: PathBuf::from("real_tests/MiniMoonBit"),
                runtime: PathBuf::from("real_tests/mbtruntime.c"),
                compiler_args: launcher_args("minimbt"),
                oracle_dir: Some(PathBuf::from("real_tests/MiniMoonBitAns")),
            },
        }
    }

    #[must_use]
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_runtime(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime = path.into();
        self
    }

    #[must_use]
    pub fn with_compiler_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compiler_args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_oracle_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.oracle_dir = dir;
        self
    }
}

fn launcher_args(package: &str) -> Vec<String> {
    vec!["run".to_string(), package.to_string(), "--".to_string()]
}

/// External programs used by the harness.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Launcher for the compiler under test (`moon run <pkg> -- ...`).
    pub compiler: PathBuf,
    /// Trusted reference compiler; also builds reference binaries for every target.
    pub reference_cc: PathBuf,
    /// Cross GCC driver for riscv64.
    pub riscv_cc: PathBuf,
    /// Compiler driver used as assembler/linker for aarch64.
    pub aarch64_cc: PathBuf,
    /// Instruction-set simulator for riscv64 binaries.
    pub simulator: PathBuf,
    /// OS-emulation shim loaded by the simulator before the binary.
    pub simulator_shim: String,
    /// Extra flags appended to every link (e.g. `-lm`).
    pub link_flags: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            compiler: PathBuf::from("moon"),
            reference_cc: PathBuf::from("clang"),
            riscv_cc: PathBuf::from("riscv64-unknown-elf-gcc"),
            aarch64_cc: PathBuf::from("clang"),
            simulator: PathBuf::from("spike"),
            simulator_shim: "pk".to_string(),
            link_flags: vec!["-lm".to_string()],
        }
    }
}

impl ToolConfig {
    /// Defaults, with the RISC-V GCC prefix taken from PATH when one is installed.
    #[must_use]
    pub fn detect() -> Self {
        let mut tools = Self::default();
        if let Some(prefix) = build_utils::find_toolchain() {
            tools.riscv_cc = PathBuf::from(format!("{prefix}gcc"));
        }
        tools
    }
}

/// Configuration for a harness run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Base for relative corpus and runtime paths.
    pub root: PathBuf,
    /// Directory receiving transient artifacts (default: `root`).
    pub work_dir: Option<PathBuf>,
    pub c: CorpusConfig,
    pub mbt: CorpusConfig,
    pub tools: ToolConfig,
    /// Per-process timeout; `None` waits forever.
    pub timeout: Option<Duration>,
    /// Worker threads (0 = one per CPU, 1 = sequential).
    pub jobs: usize,
    /// Treat any compiler output on a successful exit as a compilation failure.
    pub strict_diagnostics: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            work_dir: None,
            c: CorpusConfig::for_kind(TestKind::C),
            mbt: CorpusConfig::for_kind(TestKind::MiniMoonBit),
            tools: ToolConfig::default(),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            jobs: 1,
            strict_diagnostics: false,
        }
    }
}

impl HarnessConfig {
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_corpus(mut self, kind: TestKind, corpus: CorpusConfig) -> Self {
        match kind {
            TestKind::C => self.c = corpus,
            TestKind::MiniMoonBit => self.mbt = corpus,
        }
        self
    }

    #[must_use]
    pub fn with_tools(mut self, tools: ToolConfig) -> Self {
        self.tools = tools;
        self
    }

    /// Set timeout in seconds (0 disables it).
    #[must_use]
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        self
    }

    #[must_use]
    pub const fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    #[must_use]
    pub const fn with_strict_diagnostics(mut self, strict: bool) -> Self {
        self.strict_diagnostics = strict;
        self
    }

    #[must_use]
    pub const fn corpus(&self, kind: TestKind) -> &CorpusConfig {
        match kind {
            TestKind::C => &self.c,
            TestKind::MiniMoonBit => &self.mbt,
        }
    }

    /// Resolve a configured path against `root`.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .as_deref()
            .map_or_else(|| self.root.clone(), |dir| self.resolve(dir))
    }

    /// Number of worker threads to use.
    #[must_use]
    pub fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get().max(1)
        } else {
            self.jobs
        }
    }
}
