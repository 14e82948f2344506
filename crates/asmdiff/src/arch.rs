//! Target architectures under test.

use std::fmt;
use std::str::FromStr;

/// Target instruction-set architecture for the compiler under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TargetArch {
    /// 64-bit RISC-V; binaries run under an instruction-set simulator.
    Riscv64,
    /// 64-bit ARM; binaries run directly on a compatible host.
    Aarch64,
}

impl TargetArch {
    /// All supported architectures, in reporting order.
    pub const ALL: &'static [Self] = &[Self::Riscv64, Self::Aarch64];

    /// Token passed to the compiler under test (`--target=<token>`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Riscv64 => "riscv64",
            Self::Aarch64 => "aarch64",
        }
    }

    /// Whether binaries for this architecture can run natively on this host.
    #[must_use]
    pub const fn is_host_native(self) -> bool {
        match self {
            Self::Riscv64 => cfg!(target_arch = "riscv64"),
            Self::Aarch64 => cfg!(target_arch = "aarch64"),
        }
    }

    /// Parse comma-separated list of architectures (or "all").
    pub fn parse_list(s: &str) -> Result<Vec<Self>, String> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::ALL.to_vec());
        }
        s.split(',').map(|part| part.trim().parse()).collect()
    }
}

impl FromStr for TargetArch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "riscv64" | "rv64" => Ok(Self::Riscv64),
            "aarch64" | "arm64" => Ok(Self::Aarch64),
            _ => Err(format!(
                "unknown target '{s}', expected one of: riscv64, aarch64"
            )),
        }
    }
}

impl fmt::Display for TargetArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
