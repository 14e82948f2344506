//! Transient build artifacts for one test case.
//!
//! Paths are registered before the tool that produces them runs, so partial
//! outputs of a failed step are removed as well. Removal happens on drop,
//! which covers early returns, `?` propagation and unwinding panics.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::arch::TargetArch;

/// Deterministic artifact locations for one (case, architecture) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Assembly emitted by the compiler under test.
    pub assembly: PathBuf,
    /// Executable linked from that assembly.
    pub under_test: PathBuf,
    /// Executable built by the reference compiler.
    pub reference: PathBuf,
}

impl ArtifactPaths {
    /// Paths inside `work_dir`, unique per case name and architecture.
    #[must_use]
    pub fn new(work_dir: &Path, name: &str, arch: TargetArch) -> Self {
        let stem = format!("{name}.{arch}");
        Self {
            assembly: work_dir.join(format!("{stem}.s")),
            under_test: work_dir.join(format!("{stem}.moon")),
            reference: work_dir.join(format!("{stem}.std")),
        }
    }
}

/// Ordered set of files owned by one case execution; deleted on drop.
#[derive(Debug, Default)]
pub struct ArtifactSet {
    paths: Vec<PathBuf>,
}

impl ArtifactSet {
    #[must_use]
    pub const fn new() -> Self {
        Self { paths: Vec::new() }
    }

    /// Take ownership of `path` and return it for use in a command.
    pub fn track(&mut self, path: impl Into<PathBuf>) -> PathBuf {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path.clone());
        }
        path
    }

    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Delete every tracked file that exists. Failures are logged, not returned.
    ///
    /// Returns the number of files removed.
    pub fn release(&mut self) -> usize {
        let mut removed = 0;
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "removed artifact");
                    removed += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not remove artifact");
                }
            }
        }
        removed
    }
}

impl Drop for ArtifactSet {
    fn drop(&mut self) {
        self.release();
    }
}
