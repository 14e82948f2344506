//! Toolchain discovery in PATH.

use std::path::{Path, PathBuf};

/// Find a RISC-V GCC cross-toolchain prefix.
///
/// Searches for common RISC-V GCC toolchain prefixes in PATH.
/// Returns the prefix (e.g., "riscv64-unknown-elf-") if found.
#[must_use]
pub fn find_toolchain() -> Option<String> {
    const PREFIXES: &[&str] = &[
        "riscv64-unknown-elf-",
        "riscv64-linux-gnu-",
        "riscv64-unknown-linux-gnu-",
    ];

    PREFIXES
        .iter()
        .find(|prefix| find_in_path(Path::new(&format!("{prefix}gcc"))).is_some())
        .map(|prefix| (*prefix).to_string())
}

/// Resolve a program the way `Command::new` would.
///
/// Names containing a path separator are checked as-is; bare names are
/// looked up in each PATH directory.
#[must_use]
pub fn find_in_path(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(program))
            .find(|full_path| full_path.is_file())
    })
}
