//! Fake toolchain fixture shared by the integration tests.
//!
//! Every tool is a `/bin/sh` script and every "program" is a shell script, so
//! the whole pipeline runs on any Unix host. The fake compiler under test
//! copies the source to the assembly path, turning lines starting with
//! `#moon ` into code. The fake reference compiler does the same for `#ref `.
//! Each tool appends its role to `calls.log`.

#![cfg(unix)]
#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use asmdiff::{CorpusConfig, HarnessConfig, TestCase, TestKind, ToolConfig};
use tempfile::TempDir;

/// Serializes tests that write scripts and spawn processes.
///
/// Writing an executable while another thread forks can leak the write
/// descriptor into the child and make the exec fail with ETXTBSY.
pub fn serial_guard() -> MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Fixture {
    pub dir: TempDir,
    pub tools: ToolConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        for sub in ["bin", "work", "real_tests/C", "real_tests/MiniMoonBit", "real_tests/MiniMoonBitAns"] {
            std::fs::create_dir_all(root.join(sub)).expect("create fixture dir");
        }
        std::fs::write(root.join("real_tests/cruntime.c"), "").expect("runtime");
        std::fs::write(root.join("real_tests/mbtruntime.c"), "").expect("runtime");

        let log = root.join("calls.log");
        let log = log.display();
        let bin = root.join("bin");

        let compiler = write_script(
            &bin.join("moon"),
            &format!(
                r#"echo compile >> "{log}"
while [ $# -gt 0 ]; do
  case "$1" in
    --file) src="$2"; shift 2 ;;
    -o) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
if grep -q '^#compile-error' "$src"; then echo "type error on line 4" >&2; exit 1; fi
if grep -q '^#compile-warn' "$src"; then echo "warning: unused variable x" >&2; fi
sed 's/^#moon //' "$src" > "$out"
"#
            ),
        );
        let linker = format!(
            r#"echo link >> "{log}"
if grep -q '^#link-error' "$3"; then echo "undefined reference to 'main'" >&2; exit 1; fi
if grep -q '^#link-noexec' "$3"; then cp "$3" "$2"; exit 0; fi
cp "$3" "$2" && chmod +x "$2"
"#
        );
        let riscv_cc = write_script(&bin.join("riscv64-unknown-elf-gcc"), &linker);
        let aarch64_cc = write_script(&bin.join("aarch64-cc"), &linker);
        let reference_cc = write_script(
            &bin.join("clang"),
            &format!(
                r#"echo reference >> "{log}"
if grep -q '^#ref-error' "$3"; then echo "clang: error: unknown type name" >&2; exit 1; fi
sed 's/^#ref //' "$3" > "$2" && chmod +x "$2"
"#
            ),
        );
        let simulator = write_script(
            &bin.join("spike"),
            &format!(
                r#"echo simulate >> "{log}"
exec "$2"
"#
            ),
        );

        let tools = ToolConfig {
            compiler,
            reference_cc,
            riscv_cc,
            aarch64_cc,
            simulator,
            simulator_shim: "pk".to_string(),
            link_flags: vec!["-lm".to_string()],
        };
        Self { dir, tools }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn work_dir(&self) -> PathBuf {
        self.root().join("work")
    }

    pub fn config(&self) -> HarnessConfig {
        HarnessConfig::default()
            .with_root(self.root())
            .with_work_dir("work")
            .with_tools(self.tools.clone())
            .with_corpus(
                TestKind::C,
                CorpusConfig::for_kind(TestKind::C).with_compiler_args(Vec::<String>::new()),
            )
    }

    /// Write a C-kind case whose body is a shell script.
    pub fn c_case(&self, name: &str, body: &str) -> TestCase {
        let path = self.root().join("real_tests/C").join(format!("{name}.c"));
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write case");
        TestCase::from_path(path, TestKind::C)
    }

    /// Write a MiniMoonBit-kind case, with an answer file when `answer` is given.
    pub fn mbt_case(&self, name: &str, body: &str, answer: Option<&str>) -> TestCase {
        let path = self.root().join("real_tests/MiniMoonBit").join(format!("{name}.mbt"));
        std::fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write case");
        if let Some(answer) = answer {
            let ans = self.root().join("real_tests/MiniMoonBitAns").join(format!("{name}.ans"));
            std::fs::write(ans, answer).expect("write answer");
        }
        TestCase::from_path(path, TestKind::MiniMoonBit)
    }

    /// Tool roles invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.root().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn clear_calls(&self) {
        let _ = std::fs::remove_file(self.root().join("calls.log"));
    }

    /// Files left in the work directory.
    pub fn leftovers(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.work_dir())
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

fn write_script(path: &Path, body: &str) -> PathBuf {
    std::fs::write(path, format!("#!/bin/sh\n{body}")).expect("write script");
    let mut perms = std::fs::metadata(path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).expect("chmod script");
    path.to_path_buf()
}
