//! Environment composition for the Claude Code child process
//!
//! Layers, lowest precedence first:
//! 1. the parent process environment
//! 2. endpoint variables (base URL, auth token)
//! 3. per-tier model variables resolved from a [`TierSelection`]
//! 4. token size and traffic flags
//! 5. caller overrides

use std::collections::BTreeMap;

use crate::error::{Error, Result};

use super::tiers::{Tier, TierSelection};

pub const BASE_URL_VAR: &str = "ANTHROPIC_BASE_URL";
pub const AUTH_TOKEN_VAR: &str = "ANTHROPIC_AUTH_TOKEN";
pub const DEFAULT_MODEL_VAR: &str = "ANTHROPIC_DEFAULT_MODEL";
pub const OPUS_MODEL_VAR: &str = "ANTHROPIC_DEFAULT_OPUS_MODEL";
pub const SONNET_MODEL_VAR: &str = "ANTHROPIC_DEFAULT_SONNET_MODEL";
pub const HAIKU_MODEL_VAR: &str = "ANTHROPIC_DEFAULT_HAIKU_MODEL";
pub const SUBAGENT_MODEL_VAR: &str = "CLAUDE_CODE_SUBAGENT_MODEL";
pub const THINKING_MODEL_VAR: &str = "ANTHROPIC_THINKING_MODEL";
pub const MAX_TOKENS_VAR: &str = "CLAUDE_CODE_MAX_OUTPUT_TOKENS";
pub const NONESSENTIAL_TRAFFIC_VAR: &str = "CLAUDE_CODE_DISABLE_NONESSENTIAL_TRAFFIC";

pub const DEFAULT_MAX_TOKENS: u32 = 32_000;

/// Provider prefixes Claude Code accepts as-is. Anything else is treated as a
/// Hugging Face id.
pub const KNOWN_PROVIDER_PREFIXES: [&str; 6] =
    ["hf:", "openai:", "anthropic:", "claude:", "google:", "meta:"];

/// Ensure a model id carries a known provider prefix, adding `hf:` if not.
/// Idempotent.
pub fn normalize_model_id(id: &str) -> String {
    let id = id.trim();
    if KNOWN_PROVIDER_PREFIXES.iter().any(|p| id.starts_with(p)) {
        id.to_string()
    } else {
        format!("hf:{}", id)
    }
}

/// Environment variable carrying the model for `tier`.
pub fn tier_env_var(tier: Tier) -> &'static str {
    match tier {
        Tier::Default => DEFAULT_MODEL_VAR,
        Tier::Opus => OPUS_MODEL_VAR,
        Tier::Sonnet => SONNET_MODEL_VAR,
        Tier::Haiku => HAIKU_MODEL_VAR,
        Tier::Subagent => SUBAGENT_MODEL_VAR,
        Tier::Thinking => THINKING_MODEL_VAR,
    }
}

/// Where the child process should send its API traffic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
    pub auth_token: String,
}

/// Everything the caller decides about one launch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchRequest {
    pub tiers: TierSelection,
    /// Single-model argument; used when `tiers.default` is empty
    pub model: Option<String>,
    /// Thinking model argument; used when `tiers.thinking` is empty
    pub thinking_model: Option<String>,
    pub max_tokens: Option<u32>,
    /// Applied last; may replace any computed variable
    pub env_overrides: BTreeMap<String, String>,
    /// Passed through to the child unchanged
    pub args: Vec<String>,
}

/// Fully resolved key/value map for one launch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchEnvironment {
    vars: BTreeMap<String, String>,
}

impl LaunchEnvironment {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.vars
    }
}

fn first_set<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|m| !m.is_empty())
}

/// Compose the child environment on top of `parent`.
///
/// Fails only when no model is selected anywhere, since then the tier
/// variables could not be filled.
pub fn compose_environment<I, K, V>(
    parent: I,
    endpoint: &Endpoint,
    request: &LaunchRequest,
) -> Result<LaunchEnvironment>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut vars: BTreeMap<String, String> = parent
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    vars.insert(BASE_URL_VAR.to_string(), endpoint.base_url.clone());
    vars.insert(AUTH_TOKEN_VAR.to_string(), endpoint.auth_token.clone());

    let tiers = &request.tiers;
    let default_model = first_set([
        tiers.get(Tier::Default),
        request.model.as_deref(),
        tiers.get(Tier::Opus),
        tiers.get(Tier::Sonnet),
        tiers.get(Tier::Haiku),
        tiers.get(Tier::Subagent),
    ])
    .map(normalize_model_id)
    .ok_or_else(|| Error::Launch("no model selected; run `synclaude model` first".to_string()))?;

    vars.insert(DEFAULT_MODEL_VAR.to_string(), default_model.clone());
    for tier in Tier::FALLBACK_TIERS {
        let resolved = tiers
            .get(tier)
            .map(normalize_model_id)
            .unwrap_or_else(|| default_model.clone());
        vars.insert(tier_env_var(tier).to_string(), resolved);
    }

    // No fallback for thinking: unset means the variable is absent
    match first_set([tiers.get(Tier::Thinking), request.thinking_model.as_deref()]) {
        Some(thinking) => {
            vars.insert(THINKING_MODEL_VAR.to_string(), normalize_model_id(thinking));
        }
        None => {
            vars.remove(THINKING_MODEL_VAR);
        }
    }

    vars.insert(
        MAX_TOKENS_VAR.to_string(),
        request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS).to_string(),
    );
    vars.insert(NONESSENTIAL_TRAFFIC_VAR.to_string(), "1".to_string());

    for (key, value) in &request.env_overrides {
        vars.insert(key.clone(), value.clone());
    }

    Ok(LaunchEnvironment { vars })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint {
            base_url: "https://api.synthetic.new/anthropic".to_string(),
            auth_token: "syn_test".to_string(),
        }
    }

    fn no_parent() -> Vec<(String, String)> {
        Vec::new()
    }

    #[test]
    fn test_normalize_model_id() {
        assert_eq!(normalize_model_id("openai:gpt-4"), "openai:gpt-4");
        assert_eq!(normalize_model_id("gpt-4"), "hf:gpt-4");
        assert_eq!(normalize_model_id("hf:Qwen/Qwen3"), "hf:Qwen/Qwen3");
        for id in ["gpt-4", "claude:x", " meta:llama ", "deepseek-ai/DeepSeek-V3", "hf:", "Google:x"] {
            let once = normalize_model_id(id);
            assert_eq!(normalize_model_id(&once), once, "not idempotent for {id}");
        }
    }

    #[test]
    fn test_default_fills_every_tier() {
        let request = LaunchRequest {
            tiers: TierSelection::default().with(Tier::Default, "m1"),
            ..Default::default()
        };
        let env = compose_environment(no_parent(), &endpoint(), &request).unwrap();

        let expected = normalize_model_id("m1");
        for var in [
            DEFAULT_MODEL_VAR,
            OPUS_MODEL_VAR,
            SONNET_MODEL_VAR,
            HAIKU_MODEL_VAR,
            SUBAGENT_MODEL_VAR,
        ] {
            assert_eq!(env.get(var), Some(expected.as_str()), "{var}");
        }
        assert!(!env.contains(THINKING_MODEL_VAR));
        assert_eq!(env.get(MAX_TOKENS_VAR), Some("32000"));
        assert_eq!(env.get(NONESSENTIAL_TRAFFIC_VAR), Some("1"));
        assert_eq!(env.get(BASE_URL_VAR), Some("https://api.synthetic.new/anthropic"));
        assert_eq!(env.get(AUTH_TOKEN_VAR), Some("syn_test"));
    }

    #[test]
    fn test_tier_overrides_and_legacy_model() {
        let request = LaunchRequest {
            tiers: TierSelection::default()
                .with(Tier::Opus, "hf:big")
                .with(Tier::Haiku, "small"),
            model: Some("openai:gpt-4".to_string()),
            thinking_model: Some("deepseek-ai/DeepSeek-R1".to_string()),
            max_tokens: Some(8192),
            ..Default::default()
        };
        let env = compose_environment(no_parent(), &endpoint(), &request).unwrap();

        assert_eq!(env.get(DEFAULT_MODEL_VAR), Some("openai:gpt-4"));
        assert_eq!(env.get(OPUS_MODEL_VAR), Some("hf:big"));
        assert_eq!(env.get(HAIKU_MODEL_VAR), Some("hf:small"));
        assert_eq!(env.get(SONNET_MODEL_VAR), Some("openai:gpt-4"));
        assert_eq!(env.get(SUBAGENT_MODEL_VAR), Some("openai:gpt-4"));
        assert_eq!(env.get(THINKING_MODEL_VAR), Some("hf:deepseek-ai/DeepSeek-R1"));
        assert_eq!(env.get(MAX_TOKENS_VAR), Some("8192"));
    }

    #[test]
    fn test_tier_default_beats_legacy_model() {
        let request = LaunchRequest {
            tiers: TierSelection::default()
                .with(Tier::Default, "hf:tier")
                .with(Tier::Thinking, "hf:think-tier"),
            model: Some("hf:legacy".to_string()),
            thinking_model: Some("hf:think-arg".to_string()),
            ..Default::default()
        };
        let env = compose_environment(no_parent(), &endpoint(), &request).unwrap();
        assert_eq!(env.get(DEFAULT_MODEL_VAR), Some("hf:tier"));
        assert_eq!(env.get(THINKING_MODEL_VAR), Some("hf:think-tier"));
    }

    #[test]
    fn test_parent_env_is_inherited_and_overridden() {
        let parent = vec![
            ("PATH", "/usr/bin"),
            (BASE_URL_VAR, "https://api.anthropic.com"),
            (THINKING_MODEL_VAR, "stale"),
        ];
        let request = LaunchRequest {
            tiers: TierSelection::default().with(Tier::Default, "hf:m"),
            ..Default::default()
        };
        let env = compose_environment(parent, &endpoint(), &request).unwrap();

        assert_eq!(env.get("PATH"), Some("/usr/bin"));
        assert_eq!(env.get(BASE_URL_VAR), Some("https://api.synthetic.new/anthropic"));
        assert!(!env.contains(THINKING_MODEL_VAR));
    }

    #[test]
    fn test_caller_overrides_win() {
        let mut overrides = BTreeMap::new();
        overrides.insert(BASE_URL_VAR.to_string(), "http://localhost:9999".to_string());
        overrides.insert(OPUS_MODEL_VAR.to_string(), "raw-unnormalized".to_string());
        let request = LaunchRequest {
            tiers: TierSelection::default().with(Tier::Default, "hf:m"),
            env_overrides: overrides,
            ..Default::default()
        };
        let env = compose_environment(no_parent(), &endpoint(), &request).unwrap();

        assert_eq!(env.get(BASE_URL_VAR), Some("http://localhost:9999"));
        assert_eq!(env.get(OPUS_MODEL_VAR), Some("raw-unnormalized"));
    }

    #[test]
    fn test_no_model_is_an_error() {
        let request = LaunchRequest {
            thinking_model: Some("hf:think".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            compose_environment(no_parent(), &endpoint(), &request),
            Err(Error::Launch(_))
        ));
    }

    #[test]
    fn test_any_tier_fills_default() {
        let request = LaunchRequest {
            tiers: TierSelection::default().with(Tier::Haiku, "hf:small"),
            ..Default::default()
        };
        let env = compose_environment(no_parent(), &endpoint(), &request).unwrap();
        assert_eq!(env.get(DEFAULT_MODEL_VAR), Some("hf:small"));
        assert_eq!(env.get(OPUS_MODEL_VAR), Some("hf:small"));
        assert_eq!(env.get(HAIKU_MODEL_VAR), Some("hf:small"));
    }
}
