//! Claude Code launcher: tier selection, environment composition, the
//! supervised interactive launch, and timeout-guarded auxiliary commands.

mod aux_command;
mod environment;
mod spawn;
mod tiers;

pub use aux_command::{
    describe_spawn_error, run_aux_command, AuxEvent, AuxOutcome, AuxSupervisor, ChildKiller,
    KillSwitch, TimerGuard, DEFAULT_AUX_TIMEOUT, SPAWN_ERROR_CODE,
};
pub use environment::{
    compose_environment, normalize_model_id, tier_env_var, Endpoint, LaunchEnvironment,
    LaunchRequest, AUTH_TOKEN_VAR, BASE_URL_VAR, DEFAULT_MAX_TOKENS, DEFAULT_MODEL_VAR,
    HAIKU_MODEL_VAR, KNOWN_PROVIDER_PREFIXES, MAX_TOKENS_VAR, NONESSENTIAL_TRAFFIC_VAR,
    OPUS_MODEL_VAR, SONNET_MODEL_VAR, SUBAGENT_MODEL_VAR, THINKING_MODEL_VAR,
};
pub use spawn::{
    LaunchOutcome, LaunchSignal, LaunchState, LaunchSupervisor, LaunchedProcess, ProcessLauncher,
};
pub use tiers::{Tier, TierSelection};
