//! Command implementations.
//!
//! Turns parsed arguments into a [`HarnessConfig`] and hands off to the
//! single-file or suite runner.

mod run;

use asmdiff::{HarnessConfig, TargetArch, TestKind, ToolConfig};

use crate::cli::{Cli, EXIT_FAILURE, ToolArgs};
use crate::terminal;

/// Run the harness as described by `cli` and return the process exit code.
pub fn run_command(cli: &Cli) -> i32 {
    let arches = match TargetArch::parse_list(&cli.target) {
        Ok(a) => a,
        Err(e) => {
            terminal::error(&e);
            return EXIT_FAILURE;
        }
    };
    let config = build_config(cli);

    match &cli.file {
        Some(file) => run::run_single(&config, file, &arches, cli.silent),
        None => {
            let kinds = match TestKind::parse_list(&cli.kind) {
                Ok(k) => k,
                Err(e) => {
                    terminal::error(&e);
                    return EXIT_FAILURE;
                }
            };
            run::run_suites(&config, &kinds, &arches, cli.silent)
        }
    }
}

fn build_config(cli: &Cli) -> HarnessConfig {
    let mut config = HarnessConfig::default()
        .with_root(&cli.root)
        .with_tools(apply_tool_overrides(ToolConfig::detect(), &cli.tools))
        .with_timeout(cli.timeout)
        .with_jobs(cli.jobs)
        .with_strict_diagnostics(cli.strict_diagnostics);
    if let Some(dir) = &cli.work_dir {
        config = config.with_work_dir(dir);
    }
    config
}

fn apply_tool_overrides(mut tools: ToolConfig, args: &ToolArgs) -> ToolConfig {
    if let Some(p) = &args.compiler {
        tools.compiler.clone_from(p);
    }
    if let Some(p) = &args.reference_cc {
        tools.reference_cc.clone_from(p);
    }
    if let Some(p) = &args.riscv_cc {
        tools.riscv_cc.clone_from(p);
    }
    if let Some(p) = &args.aarch64_cc {
        tools.aarch64_cc.clone_from(p);
    }
    if let Some(p) = &args.simulator {
        tools.simulator.clone_from(p);
    }
    if let Some(shim) = &args.simulator_shim {
        tools.simulator_shim.clone_from(shim);
    }
    tools
}
