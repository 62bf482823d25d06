//! Launching the user command and classifying its exit
//!
//! The command string is tokenized on whitespace; the first token is the
//! executable, the rest are its arguments. No shell is involved.
//! Standard streams are inherited so command output lands in the
//! worker's own stdout/stderr.

use std::path::Path;

use tokio::process::Command;
use tracing::debug;

/// Exit status a command reserves to ask for cancellation
pub const CANCEL_EXIT_CODE: i32 = 255;

/// How a command run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Exited with status 0
    Success,

    /// Exited with a non-zero status other than the cancel sentinel
    Failed(i32),

    /// Exited with status 255, or was terminated by a signal
    Canceled,

    /// The process could not be launched
    SpawnFailed(String),
}

/// Run `command` with `working_dir` as its working directory and wait
/// for it to finish
pub async fn run_command(command: &str, working_dir: &Path) -> Disposition {
    let mut tokens = command.split_whitespace();
    let Some(program) = tokens.next() else {
        return Disposition::SpawnFailed("empty command".to_string());
    };

    let mut child = match Command::new(program)
        .args(tokens)
        .current_dir(working_dir)
        .spawn()
    {
        Ok(child) => child,
        Err(err) => return Disposition::SpawnFailed(err.to_string()),
    };

    let status = match child.wait().await {
        Ok(status) => status,
        Err(err) => return Disposition::SpawnFailed(err.to_string()),
    };

    let disposition = match status.code() {
        Some(0) => Disposition::Success,
        Some(CANCEL_EXIT_CODE) => Disposition::Canceled,
        Some(code) => Disposition::Failed(code),
        // No code means a signal ended the process
        None => Disposition::Canceled,
    };
    debug!(command, ?disposition, "command finished");
    disposition
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn exit_zero_is_success() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(run_command("true", dir.path()).await, Disposition::Success);
    }

    #[tokio::test]
    async fn nonzero_exit_is_failed_with_the_code() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            run_command("false", dir.path()).await,
            Disposition::Failed(1)
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_255_is_canceled() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = script(dir.path(), "cancel.sh", "exit 255");
        assert_eq!(run_command(&cmd, dir.path()).await, Disposition::Canceled);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn arguments_are_split_on_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = script(dir.path(), "args.sh", "test $# -eq 2");
        assert_eq!(
            run_command(&format!("{cmd} one two"), dir.path()).await,
            Disposition::Success
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_runs_in_the_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = script(dir.path(), "mark.sh", "echo here > marker.txt");
        let workdir = tempfile::tempdir().unwrap();

        assert_eq!(run_command(&cmd, workdir.path()).await, Disposition::Success);
        assert!(workdir.path().join("marker.txt").is_file());
    }

    #[tokio::test]
    async fn unlaunchable_command_is_spawn_failed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            run_command("/nonexistent/program", dir.path()).await,
            Disposition::SpawnFailed(_)
        ));
    }

    #[tokio::test]
    async fn empty_command_is_spawn_failed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            run_command("   ", dir.path()).await,
            Disposition::SpawnFailed(_)
        ));
    }
}
