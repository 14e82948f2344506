//! End-to-end tests of the case executor and suite runner against a fake toolchain.

#![cfg(unix)]

mod common;

use std::path::PathBuf;
use std::sync::Mutex;

use asmdiff::{
    CaseExecutor, Error, FailureLedger, Stage, StageOutcome, SuiteRunner, TargetArch, TestCase,
    TestKind, Toolchain, discover,
};
use common::{Fixture, serial_guard};

fn execute(fixture: &Fixture, case: &TestCase, arch: TargetArch) -> StageOutcome {
    let config = fixture.config();
    let toolchain = Toolchain::new(config.tools.clone());
    let executor = CaseExecutor::new(&config, &toolchain).unwrap();
    executor.execute(case, arch).unwrap()
}

// ============================================================================
// Single cases
// ============================================================================

#[test]
fn test_missing_source_invokes_no_tool() {
    let _guard = serial_guard();
    let fixture = Fixture::new();
    let case = TestCase::from_path(fixture.root().join("real_tests/C/ghost.c"), TestKind::C);

    let outcome = execute(&fixture, &case, TargetArch::Riscv64);

    assert!(matches!(outcome, StageOutcome::SourceNotFound { .. }), "{outcome:?}");
    assert_eq!(outcome.status_label(), "FAIL (not found)");
    assert!(fixture.calls().is_empty());
    assert!(fixture.leftovers().is_empty());
}

#[test]
fn test_compiler_error_stops_before_linking() {
    let _guard = serial_guard();
    let fixture = Fixture::new();
    let case = fixture.c_case("typo", "#compile-error\necho 1\n");

    let outcome = execute(&fixture, &case, TargetArch::Riscv64);

    match &outcome {
        StageOutcome::FailedAtCompilation { detail } => {
            assert_eq!(detail, "type error on line 4");
        }
        other => panic!("expected compilation failure, got {other:?}"),
    }
    assert_eq!(fixture.calls(), ["compile"]);
    assert!(fixture.leftovers().is_empty());
}

#[test]
fn test_identical_behavior_passes_on_both_arches() {
    let _guard = serial_guard();
    let fixture = Fixture::new();
    let case = fixture.c_case("answer", "echo 42\n");

    assert_eq!(execute(&fixture, &case, TargetArch::Riscv64), StageOutcome::Passed);
    assert_eq!(fixture.calls(), ["compile", "link", "reference", "simulate"]);
    assert!(fixture.leftovers().is_empty());

    fixture.clear_calls();
    assert_eq!(execute(&fixture, &case, TargetArch::Aarch64), StageOutcome::Passed);
    assert_eq!(fixture.calls(), ["compile", "link", "reference"]);
    assert!(fixture.leftovers().is_empty());
}

#[test]
fn test_stdout_mismatch_reports_both_values() {
    let _guard = serial_guard();
    let fixture = Fixture::new();
    let case = fixture.c_case("off_by_one", "#moon echo 41\n#moon exit 0\necho 42\n");

    let outcome = execute(&fixture, &case, TargetArch::Riscv64);

    let StageOutcome::FailedOnMismatch(detail) = &outcome else {
        panic!("expected mismatch, got {outcome:?}");
    };
    assert_eq!(detail.diverged(), ["stdout"]);
    let stdout = detail.stdout.as_ref().unwrap();
    assert_eq!(stdout.actual, b"41\n");
    assert_eq!(stdout.expected, b"42\n");
    let rendered = outcome.detail();
    assert!(rendered.contains(r#""41\n""#) && rendered.contains(r#""42\n""#), "{rendered}");
    assert!(fixture.leftovers().is_empty());
}

#[test]
fn test_exit_code_and_stderr_divergence() {
    let _guard = serial_guard();
    let fixture = Fixture::new();

    let case = fixture.c_case("exit_code", "#moon exit 3\nexit 0\n");
    let outcome = execute(&fixture, &case, TargetArch::Aarch64);
    let StageOutcome::FailedOnMismatch(detail) = &outcome else {
        panic!("expected mismatch, got {outcome:?}");
    };
    assert_eq!(detail.exit_code, Some((3, 0)));
    assert_eq!(detail.diverged(), ["exit code"]);

    let case = fixture.c_case("noisy", "#moon echo oops >&2\necho ok\n");
    let outcome = execute(&fixture, &case, TargetArch::Aarch64);
    let StageOutcome::FailedOnMismatch(detail) = &outcome else {
        panic!("expected mismatch, got {outcome:?}");
    };
    assert_eq!(detail.diverged(), ["stderr"]);

    // Trailing whitespace is significant.
    let case = fixture.c_case("newline", "#moon printf 42\n#moon exit 0\necho 42\n");
    assert!(matches!(
        execute(&fixture, &case, TargetArch::Aarch64),
        StageOutcome::FailedOnMismatch(_)
    ));
    assert!(fixture.leftovers().is_empty());
}

#[test]
fn test_link_and_reference_failures() {
    let _guard = serial_guard();
    let fixture = Fixture::new();

    let case = fixture.c_case("unlinked", "#link-error\necho 1\n");
    let outcome = execute(&fixture, &case, TargetArch::Riscv64);
    assert_eq!(outcome.stage(), Some(Stage::Assembly));
    assert!(outcome.detail().contains("undefined reference"));
    assert_eq!(fixture.calls(), ["compile", "link"]);

    fixture.clear_calls();
    let case = fixture.c_case("bad_ref", "#ref-error\necho 1\n");
    let outcome = execute(&fixture, &case, TargetArch::Riscv64);
    assert!(
        matches!(&outcome, StageOutcome::FailedAtReferenceCompilation { detail } if detail.contains("clang: error")),
        "{outcome:?}"
    );
    assert_eq!(fixture.calls(), ["compile", "link", "reference"]);
    assert!(fixture.leftovers().is_empty());
}

#[test]
fn test_unlaunchable_native_binary_is_an_execution_failure() {
    let _guard = serial_guard();
    let fixture = Fixture::new();
    let case = fixture.c_case("noexec", "#link-noexec\necho 1\n");

    let outcome = execute(&fixture, &case, TargetArch::Aarch64);

    assert_eq!(outcome.stage(), Some(Stage::Execution), "{outcome:?}");
    assert!(fixture.leftovers().is_empty());
}

#[test]
fn test_missing_simulator_is_fatal() {
    let _guard = serial_guard();
    let mut fixture = Fixture::new();
    fixture.tools.simulator = fixture.root().join("bin/no-such-spike");
    let config = fixture.config();
    let toolchain = Toolchain::new(config.tools.clone());

    let err = toolchain
        .verify(&config, &[TargetArch::Riscv64], &[TestKind::C])
        .unwrap_err();
    assert!(matches!(err, Error::ToolingUnavailable { .. }), "{err}");
    assert!(err.to_string().contains("no-such-spike"));
    toolchain
        .verify(&config, &[TargetArch::Aarch64], &[TestKind::C])
        .unwrap();

    // Reaching execution anyway still aborts, and still cleans up.
    let case = fixture.c_case("answer", "echo 42\n");
    let executor = CaseExecutor::new(&config, &toolchain).unwrap();
    let err = executor.execute(&case, TargetArch::Riscv64).unwrap_err();
    assert!(matches!(err, Error::ToolingUnavailable { .. }), "{err}");
    assert!(fixture.leftovers().is_empty());
}

#[test]
fn test_strict_diagnostics() {
    let _guard = serial_guard();
    let fixture = Fixture::new();
    let case = fixture.c_case("warns", "#compile-warn\necho 1\n");

    assert_eq!(execute(&fixture, &case, TargetArch::Aarch64), StageOutcome::Passed);

    let config = fixture.config().with_strict_diagnostics(true);
    let toolchain = Toolchain::new(config.tools.clone());
    let executor = CaseExecutor::new(&config, &toolchain).unwrap();
    let outcome = executor.execute(&case, TargetArch::Aarch64).unwrap();
    assert!(
        matches!(&outcome, StageOutcome::FailedAtCompilation { detail } if detail.contains("warning: unused variable x")),
        "{outcome:?}"
    );
    assert!(fixture.leftovers().is_empty());
}

#[test]
fn test_hung_binary_times_out() {
    let _guard = serial_guard();
    let fixture = Fixture::new();
    let case = fixture.c_case("hang", "#moon exec sleep 30\necho 1\n");
    let config = fixture.config().with_timeout(1);
    let toolchain = Toolchain::new(config.tools.clone());
    let executor = CaseExecutor::new(&config, &toolchain).unwrap();

    let outcome = executor.execute(&case, TargetArch::Aarch64).unwrap();

    assert!(
        matches!(&outcome, StageOutcome::FailedAtExecution { detail } if detail.contains("timed out")),
        "{outcome:?}"
    );
    assert!(fixture.leftovers().is_empty());
}

#[test]
fn test_repeated_runs_agree() {
    let _guard = serial_guard();
    let fixture = Fixture::new();
    let passing = fixture.c_case("stable", "echo 42\n");
    let failing = fixture.c_case("stable_bug", "#moon echo 41\n#moon exit 0\necho 42\n");

    for case in [&passing, &failing] {
        let first = execute(&fixture, case, TargetArch::Riscv64);
        let second = execute(&fixture, case, TargetArch::Riscv64);
        assert_eq!(first, second);
    }
    assert!(fixture.leftovers().is_empty());
}

// ============================================================================
// Oracle mode
// ============================================================================

#[test]
fn test_oracle_mode() {
    let _guard = serial_guard();
    let fixture = Fixture::new();

    // Only stdout is compared against the answer file.
    let case = fixture.mbt_case("seven", "echo 7\necho note >&2\nexit 4\n", Some("7\n"));
    assert_eq!(execute(&fixture, &case, TargetArch::Riscv64), StageOutcome::Passed);
    assert_eq!(fixture.calls(), ["compile", "link", "simulate"]);

    let case = fixture.mbt_case("eight", "echo 7\n", Some("8\n"));
    let outcome = execute(&fixture, &case, TargetArch::Aarch64);
    assert_eq!(outcome.stage(), Some(Stage::OutputMismatch));

    fixture.clear_calls();
    let case = fixture.mbt_case("unanswered", "echo 7\n", None);
    let outcome = execute(&fixture, &case, TargetArch::Riscv64);
    assert!(outcome.is_skip());
    assert_eq!(outcome.status_label(), "SKIP (no answer file)");
    assert!(fixture.calls().is_empty());
    assert!(fixture.leftovers().is_empty());
}

// ============================================================================
// Suites
// ============================================================================

#[test]
fn test_suite_keeps_input_order_in_parallel() {
    let _guard = serial_guard();
    let fixture = Fixture::new();
    // Earlier cases sleep longer so workers finish out of order.
    let names = ["a0", "a1", "a2", "a3", "a4", "a5", "a6", "a7"];
    for (i, name) in names.iter().enumerate() {
        let delay = format!("sleep 0.{}\n", names.len() - i);
        let body = if i % 3 == 1 {
            format!("{delay}#moon echo wrong\n#moon exit 0\necho {i}\n")
        } else {
            format!("{delay}echo {i}\n")
        };
        fixture.c_case(name, &body);
    }
    let config = fixture.config().with_jobs(4);
    let toolchain = Toolchain::new(config.tools.clone());
    let ledger = FailureLedger::new();
    let seen = Mutex::new(Vec::new());
    let runner = SuiteRunner::new(&config, &toolchain, &ledger)
        .unwrap()
        .with_progress(|case, _, _| seen.lock().unwrap().push(case.name.clone()));

    let cases = discover(&fixture.root().join("real_tests/C"), TestKind::C).unwrap();
    let result = runner.run(TestKind::C, TargetArch::Aarch64, &cases).unwrap();

    assert_eq!(result.passed, 5);
    assert_eq!(result.failed, ["a1", "a4", "a7"]);
    let recorded: Vec<String> = ledger.records().into_iter().map(|r| r.test).collect();
    assert_eq!(recorded, ["a1", "a4", "a7"]);
    assert_eq!(seen.lock().unwrap().len(), names.len());
    assert!(fixture.leftovers().is_empty());
}

#[test]
fn test_suite_continues_past_failures_and_reports() {
    let _guard = serial_guard();
    let fixture = Fixture::new();
    fixture.c_case("fib", "echo 55\n");
    fixture.c_case("heap", "#compile-error\n");
    fixture.c_case("queue", "#moon echo 41\n#moon exit 0\necho 42\n");
    fixture.mbt_case("arr", "echo 3\n", Some("3\n"));
    fixture.mbt_case("no_ans", "echo 3\n", None);

    let config = fixture.config();
    let toolchain = Toolchain::new(config.tools.clone());
    let ledger = FailureLedger::new();
    let runner = SuiteRunner::new(&config, &toolchain, &ledger).unwrap();

    let c_cases = discover(&fixture.root().join("real_tests/C"), TestKind::C).unwrap();
    let c = runner.run(TestKind::C, TargetArch::Riscv64, &c_cases).unwrap();
    assert_eq!((c.passed, c.skipped), (1, 0));
    assert_eq!(c.failed, ["heap", "queue"]);

    let mbt_cases = discover(&fixture.root().join("real_tests/MiniMoonBit"), TestKind::MiniMoonBit).unwrap();
    let mbt = runner.run(TestKind::MiniMoonBit, TargetArch::Riscv64, &mbt_cases).unwrap();
    assert_eq!((mbt.passed, mbt.skipped), (1, 1));
    assert!(mbt.success());

    let report = ledger.report();
    assert!(report.contains("FAILURE REPORT"));
    assert!(report.contains("C / riscv64 (2 failures):"));
    assert!(report.contains("  COMPILATION (1 tests):\n    • heap\n      type error on line 4\n"));
    assert!(report.contains("  OUTPUT_MISMATCH (1 tests):\n    • queue\n"));
    assert!(report.contains("Total failures: 2"));
    assert!(fixture.leftovers().is_empty());
}

#[test]
fn test_fatal_error_aborts_suite() {
    let _guard = serial_guard();
    let mut fixture = Fixture::new();
    fixture.tools.riscv_cc = PathBuf::from("/nonexistent/riscv64-unknown-elf-gcc");
    fixture.c_case("a", "echo 1\n");
    fixture.c_case("b", "echo 2\n");

    let config = fixture.config();
    let toolchain = Toolchain::new(config.tools.clone());
    let ledger = FailureLedger::new();
    let runner = SuiteRunner::new(&config, &toolchain, &ledger).unwrap();
    let cases = discover(&fixture.root().join("real_tests/C"), TestKind::C).unwrap();

    let err = runner.run(TestKind::C, TargetArch::Riscv64, &cases).unwrap_err();
    assert!(err.is_precondition(), "{err}");
    assert!(ledger.is_empty());
    assert_eq!(fixture.calls(), ["compile"]);
    assert!(fixture.leftovers().is_empty());
}
