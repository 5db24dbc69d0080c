//! Model records parsed from the catalog
//!
//! `RawModel` mirrors one entry of the catalog's `data` array (and of the
//! cache snapshot). `ModelRecord` is the validated form everything else uses.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::RecordError;

/// One model entry as it appears on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawModel {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<ModelPricing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supported_features: Vec<String>,
}

/// Per-token and per-request costs. The catalog sends these either as
/// strings ("$0.00000055") or bare numbers; both are kept as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPricing {
    #[serde(default, deserialize_with = "price_field", skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, deserialize_with = "price_field", skip_serializing_if = "Option::is_none")]
    pub completion: Option<String>,
    #[serde(default, deserialize_with = "price_field", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "price_field", skip_serializing_if = "Option::is_none")]
    pub request: Option<String>,
    #[serde(default, deserialize_with = "price_field", skip_serializing_if = "Option::is_none")]
    pub input_cache_reads: Option<String>,
    #[serde(default, deserialize_with = "price_field", skip_serializing_if = "Option::is_none")]
    pub input_cache_writes: Option<String>,
}

fn price_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a price string or number, got {}",
            other
        ))),
    }
}

/// A validated catalog model. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecord {
    id: String,
    display_name: Option<String>,
    provider: String,
    context_length: Option<u64>,
    max_output_length: Option<u64>,
    pricing: Option<ModelPricing>,
    quantization: Option<String>,
    supported_features: BTreeSet<String>,
}

impl ModelRecord {
    /// Build a record with only an id. Fails on an empty or blank id.
    pub fn new(id: impl Into<String>) -> Result<Self, RecordError> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(RecordError::MissingId);
        }
        let provider = provider_from_id(&id);
        Ok(Self {
            id,
            display_name: None,
            provider,
            context_length: None,
            max_output_length: None,
            pricing: None,
            quantization: None,
            supported_features: BTreeSet::new(),
        })
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_context_length(mut self, tokens: u64) -> Self {
        self.context_length = Some(tokens);
        self
    }

    pub fn with_max_output_length(mut self, tokens: u64) -> Self {
        self.max_output_length = Some(tokens);
        self
    }

    pub fn with_pricing(mut self, pricing: ModelPricing) -> Self {
        self.pricing = Some(pricing);
        self
    }

    pub fn with_quantization(mut self, quantization: impl Into<String>) -> Self {
        self.quantization = Some(quantization.into());
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.supported_features.insert(feature.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// The part of the id after the provider prefix, or the whole id when
    /// there is no prefix.
    pub fn name_part(&self) -> &str {
        self.id.split_once(':').map(|(_, name)| name).unwrap_or(&self.id)
    }

    /// Get display name (name if available, otherwise id)
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    pub fn context_length(&self) -> Option<u64> {
        self.context_length
    }

    pub fn max_output_length(&self) -> Option<u64> {
        self.max_output_length
    }

    pub fn pricing(&self) -> Option<&ModelPricing> {
        self.pricing.as_ref()
    }

    pub fn quantization(&self) -> Option<&str> {
        self.quantization.as_deref()
    }

    pub fn supported_features(&self) -> &BTreeSet<String> {
        &self.supported_features
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.supported_features
            .iter()
            .any(|f| f.eq_ignore_ascii_case(feature))
    }

    /// Whether the model looks suitable for the thinking tier.
    pub fn is_thinking_capable(&self) -> bool {
        self.has_feature("reasoning")
            || self.has_feature("thinking")
            || self.id.to_lowercase().contains("thinking")
    }

    /// Short context label for listings, e.g. `128K` or `1M`.
    pub fn context_label(&self) -> Option<String> {
        let tokens = self.context_length?;
        Some(if tokens >= 1_000_000 && tokens % 1_000_000 == 0 {
            format!("{}M", tokens / 1_000_000)
        } else if tokens >= 1_000 {
            format!("{}K", tokens / 1_000)
        } else {
            tokens.to_string()
        })
    }

    /// Convert back to the wire shape, used when writing the cache snapshot.
    pub fn to_raw(&self) -> RawModel {
        RawModel {
            id: self.id.clone(),
            name: self.display_name.clone(),
            provider: Some(self.provider.clone()),
            context_length: self.context_length,
            max_output_length: self.max_output_length,
            pricing: self.pricing.clone(),
            quantization: self.quantization.clone(),
            supported_features: self.supported_features.iter().cloned().collect(),
        }
    }
}

impl TryFrom<RawModel> for ModelRecord {
    type Error = RecordError;

    fn try_from(raw: RawModel) -> Result<Self, Self::Error> {
        let mut record = ModelRecord::new(raw.id)?;
        if let Some(provider) = raw.provider.filter(|p| !p.trim().is_empty()) {
            record.provider = provider.trim().to_string();
        }
        record.display_name = raw.name.filter(|n| !n.trim().is_empty());
        record.context_length = raw.context_length;
        record.max_output_length = raw.max_output_length;
        record.pricing = raw.pricing;
        record.quantization = raw.quantization;
        record.supported_features = raw.supported_features.into_iter().collect();
        Ok(record)
    }
}

/// Parse one raw JSON entry into a record.
///
/// Used per entry so a single bad entry can be skipped without losing the
/// rest of the batch.
pub fn parse_model_entry(value: &Value) -> Result<ModelRecord, RecordError> {
    let raw: RawModel =
        serde_json::from_value(value.clone()).map_err(|e| RecordError::Shape(e.to_string()))?;
    ModelRecord::try_from(raw)
}

/// Provider prefix of an id (`hf:foo/bar` -> `hf`). Ids without a prefix get
/// `unknown`.
pub fn provider_from_id(id: &str) -> String {
    match id.split_once(':') {
        Some((provider, _)) if !provider.is_empty() => provider.to_string(),
        _ => "unknown".to_string(),
    }
}
