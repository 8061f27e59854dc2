//! Helpers for running the `polwatch` binary in an isolated directory

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Variables that would leak the caller's configuration into a test
const INHERITED_VARS: &[&str] = &[
    "SMTP_HOST",
    "SMTP_PORT",
    "SMTP_USER",
    "SMTP_PASS",
    "MAIL_FROM",
    "MAIL_TO",
    "MAIL_SUBJECT_PREFIX",
    "POLWATCH_WATCH__ROOT",
    "POLWATCH_STORAGE__DB_PATH",
    "RUST_LOG",
];

/// Scratch working directory with its own config dir and database
pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        std::fs::create_dir_all(dir.path().join("xdg")).expect("create config dir");
        std::fs::create_dir_all(dir.path().join("inbox")).expect("create inbox");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn inbox(&self) -> PathBuf {
        self.dir.path().join("inbox")
    }

    pub fn db(&self) -> PathBuf {
        self.dir.path().join("state.sqlite3")
    }

    /// `polwatch --db <scratch db> <args>`
    pub fn run(&self, args: &[&str]) -> CommandResult {
        let mut command = Command::new(env!("CARGO_BIN_EXE_polwatch"));
        for var in INHERITED_VARS {
            command.env_remove(var);
        }
        let output = command
            .arg("--db")
            .arg(self.db())
            .args(args)
            .current_dir(self.dir.path())
            .env("XDG_CONFIG_HOME", self.dir.path().join("xdg"))
            .env("POLWATCH_WATCH__QUIESCENCE_MS", "0")
            .env("POLWATCH_WATCH__POLL_INTERVAL_MS", "10")
            .output()
            .expect("run polwatch");
        CommandResult { output }
    }
}

pub struct CommandResult {
    output: Output,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.output.status.success()
    }

    /// Standard output with colour codes removed
    pub fn stdout(&self) -> String {
        strip_ansi(&String::from_utf8_lossy(&self.output.stdout))
    }

    /// Standard error with colour codes removed
    pub fn stderr(&self) -> String {
        strip_ansi(&String::from_utf8_lossy(&self.output.stderr))
    }

    /// Panic with both streams unless the command succeeded
    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success(),
            "command failed\nstdout:\n{}\nstderr:\n{}",
            self.stdout(),
            self.stderr()
        );
        self
    }
}

/// Drop `ESC [ ... <final byte>` sequences; output is always coloured
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' && chars.peek() == Some(&'[') {
            chars.next();
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}
