//! Model tiers
//!
//! Claude Code can be pointed at a different model per tier. A selection is
//! sparse: unset tiers fall back to `default` when the environment is
//! composed, except `thinking`, which stays unset.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Default,
    Opus,
    Sonnet,
    Haiku,
    Subagent,
    Thinking,
}

impl Tier {
    pub const ALL: [Tier; 6] = [
        Tier::Default,
        Tier::Opus,
        Tier::Sonnet,
        Tier::Haiku,
        Tier::Subagent,
        Tier::Thinking,
    ];

    /// Tiers that inherit the default model when left empty.
    pub const FALLBACK_TIERS: [Tier; 4] = [Tier::Opus, Tier::Sonnet, Tier::Haiku, Tier::Subagent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Default => "default",
            Tier::Opus => "opus",
            Tier::Sonnet => "sonnet",
            Tier::Haiku => "haiku",
            Tier::Subagent => "subagent",
            Tier::Thinking => "thinking",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Tier::Default),
            "opus" => Ok(Tier::Opus),
            "sonnet" => Ok(Tier::Sonnet),
            "haiku" => Ok(Tier::Haiku),
            "subagent" => Ok(Tier::Subagent),
            "thinking" => Ok(Tier::Thinking),
            other => Err(format!("unknown tier '{}'", other)),
        }
    }
}

/// Optional model id per tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sonnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub haiku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subagent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

impl TierSelection {
    fn slot(&self, tier: Tier) -> &Option<String> {
        match tier {
            Tier::Default => &self.default,
            Tier::Opus => &self.opus,
            Tier::Sonnet => &self.sonnet,
            Tier::Haiku => &self.haiku,
            Tier::Subagent => &self.subagent,
            Tier::Thinking => &self.thinking,
        }
    }

    fn slot_mut(&mut self, tier: Tier) -> &mut Option<String> {
        match tier {
            Tier::Default => &mut self.default,
            Tier::Opus => &mut self.opus,
            Tier::Sonnet => &mut self.sonnet,
            Tier::Haiku => &mut self.haiku,
            Tier::Subagent => &mut self.subagent,
            Tier::Thinking => &mut self.thinking,
        }
    }

    /// The model set for `tier`, ignoring blank values.
    pub fn get(&self, tier: Tier) -> Option<&str> {
        self.slot(tier)
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }

    pub fn set(&mut self, tier: Tier, model: Option<String>) {
        *self.slot_mut(tier) = model.filter(|m| !m.trim().is_empty());
    }

    pub fn with(mut self, tier: Tier, model: impl Into<String>) -> Self {
        self.set(tier, Some(model.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        Tier::ALL.iter().all(|t| self.get(*t).is_none())
    }

    /// True when some tier can supply the default model at launch.
    pub fn has_launch_model(&self) -> bool {
        self.get(Tier::Default).is_some()
            || Tier::FALLBACK_TIERS.iter().any(|t| self.get(*t).is_some())
    }

    /// Overlay every tier that `other` sets on top of `self`.
    pub fn merged_with(mut self, other: &TierSelection) -> Self {
        for tier in Tier::ALL {
            if let Some(model) = other.get(tier) {
                self.set(tier, Some(model.to_string()));
            }
        }
        self
    }

    /// Fill an empty `default` with a discovered preferred model.
    pub fn or_preferred(mut self, preferred: Option<&str>) -> Self {
        if self.get(Tier::Default).is_none()
            && let Some(preferred) = preferred
        {
            self.set(Tier::Default, Some(preferred.to_string()));
        }
        self
    }
}
