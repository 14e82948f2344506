//! Per-architecture command construction.
//!
//! All architecture-dependent policy lives in [`ArchProfile::of`]: which driver
//! assembles and links the generated assembly, and whether the result runs
//! natively or under the instruction-set simulator. Reference binaries are
//! always built by the reference compiler for the host and run natively.

use std::path::Path;

use tracing::debug;

use crate::arch::TargetArch;
use crate::build_utils::find_in_path;
use crate::case::TestKind;
use crate::config::{CorpusConfig, HarnessConfig, ToolConfig};
use crate::error::{Error, Result};
use crate::process::ToolCommand;

/// Which configured driver assembles and links generated assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDriver {
    /// Cross GCC for the target (binary is not host-runnable).
    CrossGcc,
    /// Host-capable compiler driver used as assembler/linker.
    HostCc,
}

/// How a binary built for the target is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// `<simulator> <shim> <binary>`.
    Simulated,
    /// Direct host subprocess; needs a compatible host CPU.
    Native,
}

/// Architecture policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchProfile {
    pub driver: LinkDriver,
    pub execution: ExecutionStrategy,
}

impl ArchProfile {
    #[must_use]
    pub const fn of(arch: TargetArch) -> Self {
        match arch {
            TargetArch::Riscv64 => Self {
                driver: LinkDriver::CrossGcc,
                execution: ExecutionStrategy::Simulated,
            },
            TargetArch::Aarch64 => Self {
                driver: LinkDriver::HostCc,
                execution: ExecutionStrategy::Native,
            },
        }
    }
}

/// Commands for one architecture.
#[derive(Debug, Clone, Copy)]
pub struct ArchCommands<'a> {
    profile: ArchProfile,
    tools: &'a ToolConfig,
}

impl<'a> ArchCommands<'a> {
    #[must_use]
    pub const fn execution(&self) -> ExecutionStrategy {
        self.profile.execution
    }

    fn driver(&self) -> &'a Path {
        match self.profile.driver {
            LinkDriver::CrossGcc => self.tools.riscv_cc.as_path(),
            LinkDriver::HostCc => self.tools.aarch64_cc.as_path(),
        }
    }

    /// `<driver> -o <out> <asm> <runtime> <link flags>`.
    #[must_use]
    pub fn assemble_and_link(&self, asm: &Path, runtime: &Path, out: &Path) -> ToolCommand {
        ToolCommand::new(self.driver())
            .arg("-o")
            .arg(out)
            .arg(asm)
            .arg(runtime)
            .args(&self.tools.link_flags)
    }

    /// Command that runs a binary produced from the compiler under test.
    #[must_use]
    pub fn run_under_test(&self, executable: &Path) -> ToolCommand {
        match self.profile.execution {
            ExecutionStrategy::Simulated => ToolCommand::new(&self.tools.simulator)
                .arg(&self.tools.simulator_shim)
                .arg(executable),
            ExecutionStrategy::Native => ToolCommand::new(executable),
        }
    }

    /// Programs this architecture needs besides the compilers.
    fn required_tools(&self) -> Vec<&'a Path> {
        let mut tools = vec![self.driver()];
        if self.profile.execution == ExecutionStrategy::Simulated {
            tools.push(self.tools.simulator.as_path());
        }
        tools
    }
}

/// Builds every external command the harness runs.
#[derive(Debug, Clone)]
pub struct Toolchain {
    tools: ToolConfig,
}

impl Toolchain {
    #[must_use]
    pub const fn new(tools: ToolConfig) -> Self {
        Self { tools }
    }

    #[must_use]
    pub const fn commands_for(&self, arch: TargetArch) -> ArchCommands<'_> {
        ArchCommands {
            profile: ArchProfile::of(arch),
            tools: &self.tools,
        }
    }

    /// `<launcher> <args..> --file <src> --target=<arch> -o <asm>`.
    #[must_use]
    pub fn compile_under_test(
        &self,
        corpus: &CorpusConfig,
        source: &Path,
        arch: TargetArch,
        asm: &Path,
    ) -> ToolCommand {
        ToolCommand::new(&self.tools.compiler)
            .args(&corpus.compiler_args)
            .arg("--file")
            .arg(source)
            .arg(format!("--target={arch}"))
            .arg("-o")
            .arg(asm)
    }

    /// `<reference cc> -o <out> <src> <runtime> <link flags>`, always for the host.
    #[must_use]
    pub fn compile_reference(&self, source: &Path, runtime: &Path, out: &Path) -> ToolCommand {
        ToolCommand::new(&self.tools.reference_cc)
            .arg("-o")
            .arg(out)
            .arg(source)
            .arg(runtime)
            .args(&self.tools.link_flags)
    }

    /// Reference binaries are never cross-compiled, so they always run directly.
    #[must_use]
    pub fn run_reference(&self, executable: &Path) -> ToolCommand {
        ToolCommand::new(executable)
    }

    /// Check that every program a run over `arches` × `kinds` needs can be found.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolingUnavailable`] naming the first missing program.
    pub fn verify(
        &self,
        config: &HarnessConfig,
        arches: &[TargetArch],
        kinds: &[TestKind],
    ) -> Result<()> {
        let mut needed: Vec<&Path> = vec![self.tools.compiler.as_path()];
        if kinds
            .iter()
            .any(|&kind| config.corpus(kind).oracle_dir.is_none())
        {
            needed.push(&self.tools.reference_cc);
        }
        for &arch in arches {
            needed.extend(self.commands_for(arch).required_tools());
        }

        for program in needed {
            match find_in_path(program) {
                Some(path) => debug!(tool = %program.display(), path = %path.display(), "found tool"),
                None => {
                    return Err(Error::tooling(
                        program.display().to_string(),
                        "not found in PATH",
                    ));
                }
            }
        }
        Ok(())
    }
}
