//! Process helpers shared by the launcher and the auxiliary commands
//!
//! Both kinds of child are started directly (never through a shell) so model
//! ids and pass-through arguments are not reinterpreted.

use std::process::Stdio;

use tokio::process::Command;

/// Windows creation flag to hide the console window
#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Keep short-lived probes from flashing a console window on Windows.
#[cfg(windows)]
pub fn hide_console_window(cmd: &mut Command) {
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
pub fn hide_console_window(_cmd: &mut Command) {
    // No-op on non-Windows platforms
}

/// Command for the interactive launch.
///
/// The child takes over the terminal: stdin, stdout and stderr are inherited
/// and nothing is captured.
pub fn interactive_command(program: &str, args: &[String]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    cmd
}

/// Command for an auxiliary probe whose output is captured.
///
/// The child is killed if its handle is dropped, so an abandoned probe never
/// outlives the caller.
pub fn captured_command(program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    hide_console_window(&mut cmd);
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interactive_command_keeps_args() {
        let args = vec!["--print".to_string(), "hello world".to_string()];
        let cmd = interactive_command("claude", &args);
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "claude");
        let collected: Vec<_> = std_cmd.get_args().collect();
        assert_eq!(collected, vec!["--print", "hello world"]);
    }

    #[test]
    fn test_captured_command_keeps_args() {
        let cmd = captured_command("claude", &["--version"]);
        let collected: Vec<_> = cmd.as_std().get_args().collect();
        assert_eq!(collected, vec!["--version"]);
    }
}
