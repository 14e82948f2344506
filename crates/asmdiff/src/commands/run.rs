//! Suite and single-file runs.

use std::path::Path;

use asmdiff::{
    FailureLedger, HarnessConfig, Result, SuiteResult, SuiteRunner, TargetArch, TestCase,
    TestKind, Toolchain, check_runtimes, discover, resolve_single,
};
use tracing::warn;

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::terminal::{self, Progress};

/// Run every discovered case of `kinds` on every architecture in `arches`.
pub fn run_suites(config: &HarnessConfig, kinds: &[TestKind], arches: &[TargetArch], quiet: bool) -> i32 {
    exit_code(suites(config, kinds, arches, quiet))
}

/// Run one file on every architecture in `arches`.
pub fn run_single(config: &HarnessConfig, file: &Path, arches: &[TargetArch], quiet: bool) -> i32 {
    exit_code(single(config, file, arches, quiet))
}

fn exit_code(outcome: Result<bool>) -> i32 {
    match outcome {
        Ok(true) => EXIT_SUCCESS,
        Ok(false) => EXIT_FAILURE,
        Err(e) => {
            terminal::error(&format!("Error: {e}"));
            EXIT_FAILURE
        }
    }
}

fn suites(config: &HarnessConfig, kinds: &[TestKind], arches: &[TargetArch], quiet: bool) -> Result<bool> {
    // Everything that can abort the run is checked before the first case.
    check_runtimes(config, kinds)?;
    let mut corpora = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        let dir = config.resolve(&config.corpus(kind).source_dir);
        corpora.push((kind, discover(&dir, kind)?));
    }
    let toolchain = preflight(config, kinds, arches)?;

    let ledger = FailureLedger::new();
    let mut results = Vec::new();
    for (kind, cases) in &corpora {
        for &arch in arches {
            terminal::header(&format!(
                "Running {} tests on {}",
                kind.label().to_uppercase(),
                arch.as_str().to_uppercase()
            ));
            if cases.is_empty() {
                println!(
                    "No test files found in '{}'.",
                    config.corpus(*kind).source_dir.display()
                );
            }
            let result = run_suite(config, &toolchain, &ledger, *kind, arch, cases, quiet)?;
            println!("\n{}", suite_line(&result));
            results.push(result);
        }
    }

    let passed: usize = results.iter().map(|r| r.passed).sum();
    let failed: usize = results.iter().map(SuiteResult::failed_count).sum();
    let skipped: usize = results.iter().map(|r| r.skipped).sum();
    let rule = "=".repeat(60);
    println!("\n{rule}");
    println!("OVERALL: {}", counts(passed, failed, skipped));
    println!("{rule}");

    finish(&ledger)
}

fn single(config: &HarnessConfig, file: &Path, arches: &[TargetArch], quiet: bool) -> Result<bool> {
    let case = resolve_single(config, file)?;
    check_runtimes(config, &[case.kind])?;
    let toolchain = preflight(config, &[case.kind], arches)?;

    let ledger = FailureLedger::new();
    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;
    for &arch in arches {
        let result = run_suite(
            config,
            &toolchain,
            &ledger,
            case.kind,
            arch,
            std::slice::from_ref(&case),
            quiet,
        )?;
        passed += result.passed;
        failed += result.failed_count();
        skipped += result.skipped;
    }
    println!("\nSummary: {}", counts(passed, failed, skipped));

    finish(&ledger)
}

/// Check tools and warn about host-incompatible direct execution.
fn preflight(config: &HarnessConfig, kinds: &[TestKind], arches: &[TargetArch]) -> Result<Toolchain> {
    let toolchain = Toolchain::new(config.tools.clone());
    toolchain.verify(config, arches, kinds)?;

    for &arch in arches {
        if arch == TargetArch::Aarch64 && !arch.is_host_native() {
            let host = std::env::consts::ARCH;
            warn!(host, target = %arch, "direct execution on a non-native host");
            terminal::warning(&format!(
                "Current machine architecture is not native {arch} ({host}). \
                 Direct execution might fail unless QEMU or similar emulation is set up."
            ));
        }
    }
    Ok(toolchain)
}

fn run_suite(
    config: &HarnessConfig,
    toolchain: &Toolchain,
    ledger: &FailureLedger,
    kind: TestKind,
    arch: TargetArch,
    cases: &[TestCase],
    quiet: bool,
) -> Result<SuiteResult> {
    let progress = Progress::new(cases.len() as u64, &format!("{kind}/{arch}"), quiet);
    let runner = SuiteRunner::new(config, toolchain, ledger)?.with_progress(|case, arch, outcome| {
        if !quiet {
            progress.case_line(&format!(
                "[{}/{arch}] Testing {}... {}",
                case.kind.tag(),
                case.name,
                terminal::status(outcome)
            ));
        }
    });
    let result = runner.run(kind, arch, cases);
    progress.finish();
    result
}

fn finish(ledger: &FailureLedger) -> Result<bool> {
    if ledger.is_empty() {
        terminal::success("All tests passed");
        return Ok(true);
    }
    println!();
    print!("{}", ledger.report());
    Ok(false)
}

fn suite_line(result: &SuiteResult) -> String {
    format!(
        "{}/{}: {}",
        result.kind.label().to_uppercase(),
        result.arch.as_str().to_uppercase(),
        counts(result.passed, result.failed_count(), result.skipped)
    )
}

fn counts(passed: usize, failed: usize, skipped: usize) -> String {
    if skipped == 0 {
        format!("{passed} passed, {failed} failed")
    } else {
        format!("{passed} passed, {failed} failed, {skipped} skipped")
    }
}
