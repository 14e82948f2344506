//! Behavioral equivalence between two program runs.
//!
//! Equivalence is exact: equal raw exit codes, byte-equal stdout and byte-equal
//! stderr. Nothing is normalized (no whitespace trimming, no numeric tolerance).

use crate::case::{MismatchDetail, StageOutcome, StreamDiff};
use crate::process::ProcessResult;

/// Compare the binary under test against the reference binary.
#[must_use]
pub fn compare_results(under_test: &ProcessResult, reference: &ProcessResult) -> StageOutcome {
    let detail = MismatchDetail {
        exit_code: (under_test.exit_code != reference.exit_code)
            .then_some((under_test.exit_code, reference.exit_code)),
        stdout: stream_diff(&reference.stdout, &under_test.stdout),
        stderr: stream_diff(&reference.stderr, &under_test.stderr),
    };
    into_outcome(detail)
}

/// Compare captured stdout against a recorded oracle file.
///
/// Only stdout is checked; exit code and stderr are ignored in this mode.
#[must_use]
pub fn compare_oracle(actual_stdout: &[u8], expected_stdout: &[u8]) -> StageOutcome {
    into_outcome(MismatchDetail {
        stdout: stream_diff(expected_stdout, actual_stdout),
        ..MismatchDetail::default()
    })
}

fn stream_diff(expected: &[u8], actual: &[u8]) -> Option<StreamDiff> {
    (expected != actual).then(|| StreamDiff {
        expected: expected.to_vec(),
        actual: actual.to_vec(),
    })
}

fn into_outcome(detail: MismatchDetail) -> StageOutcome {
    if detail.is_empty() {
        StageOutcome::Passed
    } else {
        StageOutcome::FailedOnMismatch(detail)
    }
}
