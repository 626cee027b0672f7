//! shell.rs
//!
//! Thin wrapper over `sh -c` used by the history counters.
//!
//! The exit status is deliberately not inspected: callers get whatever the
//! command printed on stdout, and a command that failed usually printed
//! nothing. Parsing that output is the caller's job.

use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Run `command` through `sh -c` inside `cwd` and return its trimmed stdout.
pub fn run(command: &str, cwd: &Path) -> String {
    debug!("running `{command}` in {}", cwd.display());

    match Command::new("sh").arg("-c").arg(command).current_dir(cwd).output() {
        Ok(output) => String::from_utf8_lossy(&output.stdout).trim().to_string(),
        Err(e) => {
            warn!("failed to spawn `{command}`: {e}");
            String::new()
        }
    }
}

/// Single-quote `arg` so it is passed to the shell as one literal word.
pub fn quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_returns_trimmed_stdout() {
        let out = run("printf '  42\\n\\n'", Path::new("."));
        assert_eq!(out, "42");
    }

    #[test]
    fn failing_command_yields_its_output() {
        let out = run("echo partial; exit 3", Path::new("."));
        assert_eq!(out, "partial");

        let out = run("exit 1", Path::new("."));
        assert_eq!(out, "");
    }

    #[test]
    fn quote_survives_shell_metacharacters() {
        let nasty = "bob'; echo pwned; '";
        let out = run(&format!("printf %s {}", quote(nasty)), Path::new("."));
        assert_eq!(out, nasty);
    }

    #[test]
    fn quote_plain_word() {
        assert_eq!(quote("alice"), "'alice'");
    }
}
