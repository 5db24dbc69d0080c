//! Launcher tests
//!
//! Real child processes for the launch and the auxiliary commands. Unix only,
//! since they drive `sh`.

#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use synclaude_core::launcher::{
    run_aux_command, Endpoint, LaunchRequest, ProcessLauncher, Tier, TierSelection,
    SPAWN_ERROR_CODE,
};
use synclaude_core::tool::ToolStatus;

fn endpoint() -> Endpoint {
    Endpoint {
        base_url: "http://127.0.0.1:9/anthropic".to_string(),
        auth_token: "syn_test".to_string(),
    }
}

fn shell_request(script: &str, tiers: TierSelection) -> LaunchRequest {
    LaunchRequest {
        tiers,
        args: vec!["-c".to_string(), script.to_string()],
        ..Default::default()
    }
}

struct FixedStatus(bool);

#[async_trait]
impl ToolStatus for FixedStatus {
    async fn current_version(&self) -> Option<String> {
        self.0.then(|| "1.0.0".to_string())
    }

    async fn is_installed(&self) -> bool {
        self.0
    }
}

mod launch_tests {
    use super::*;

    #[tokio::test]
    async fn test_child_sees_composed_environment() {
        let script = r#"
            test "$ANTHROPIC_BASE_URL" = "http://127.0.0.1:9/anthropic" || exit 10
            test "$ANTHROPIC_AUTH_TOKEN" = "syn_test" || exit 11
            test "$ANTHROPIC_DEFAULT_OPUS_MODEL" = "hf:m1" || exit 12
            test "$CLAUDE_CODE_SUBAGENT_MODEL" = "hf:m1" || exit 13
            test -z "${ANTHROPIC_THINKING_MODEL+set}" || exit 14
            test "$CLAUDE_CODE_DISABLE_NONESSENTIAL_TRAFFIC" = "1" || exit 15
            exit 7
        "#;
        let launcher = ProcessLauncher::new("sh", endpoint());
        let request = shell_request(script, TierSelection::default().with(Tier::Default, "m1"));

        let launched = launcher.launch(&request).await;
        assert!(launched.outcome.success, "{:?}", launched.outcome);
        assert!(launched.outcome.pid.is_some());
        assert!(launched.outcome.error.is_none());
        assert_eq!(launched.wait().await, Some(7));
    }

    #[tokio::test]
    async fn test_thinking_model_reaches_child() {
        let script = r#"test "$ANTHROPIC_THINKING_MODEL" = "hf:think" && exit 0; exit 1"#;
        let launcher = ProcessLauncher::new("sh", endpoint());
        let request = shell_request(
            script,
            TierSelection::default()
                .with(Tier::Default, "hf:m1")
                .with(Tier::Thinking, "think"),
        );

        let launched = launcher.launch(&request).await;
        assert_eq!(launched.wait().await, Some(0));
    }

    #[tokio::test]
    async fn test_not_installed_fails_without_spawning() {
        let launcher =
            ProcessLauncher::new("sh", endpoint()).with_tool_status(Arc::new(FixedStatus(false)));
        let request = shell_request("exit 0", TierSelection::default().with(Tier::Default, "m"));

        let launched = launcher.launch(&request).await;
        assert!(!launched.outcome.success);
        assert!(launched.outcome.pid.is_none());
        assert!(launched.outcome.error.is_some());
        assert_eq!(launched.wait().await, None);
    }

    #[tokio::test]
    async fn test_installed_check_passes_through() {
        let launcher =
            ProcessLauncher::new("sh", endpoint()).with_tool_status(Arc::new(FixedStatus(true)));
        let request = shell_request("exit 3", TierSelection::default().with(Tier::Default, "m"));

        let launched = launcher.launch(&request).await;
        assert!(launched.outcome.success);
        assert_eq!(launched.wait().await, Some(3));
    }
}

mod aux_command_tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_output_and_code() {
        let outcome = run_aux_command(
            "sh",
            &["-c", "echo '1.0.72 (Claude Code)'; echo warn >&2"],
            Duration::from_secs(5),
        )
        .await;

        assert!(outcome.success);
        assert!(!outcome.timed_out);
        assert_eq!(outcome.code, Some(0));
        assert_eq!(outcome.stdout.trim(), "1.0.72 (Claude Code)");
        assert_eq!(outcome.stderr.trim(), "warn");
    }

    #[tokio::test]
    async fn test_nonzero_exit() {
        let outcome = run_aux_command("sh", &["-c", "exit 4"], Duration::from_secs(5)).await;
        assert!(!outcome.success);
        assert_eq!(outcome.code, Some(4));
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let started = std::time::Instant::now();
        let outcome = run_aux_command("sleep", &["30"], Duration::from_millis(200)).await;

        assert!(outcome.timed_out);
        assert!(!outcome.success);
        assert_eq!(outcome.code, None);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_spawn_error() {
        let outcome = run_aux_command(
            "/nonexistent/synclaude/claude",
            &["--version"],
            Duration::from_secs(5),
        )
        .await;
        assert!(!outcome.success);
        assert_eq!(outcome.code, Some(SPAWN_ERROR_CODE));
    }
}
