//! Sampling parameter types shared by every generation endpoint.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Generation parameters accepted by the gateway endpoints.
///
/// Every field is optional on the wire. Each model endpoint carries a
/// default set in its configuration; [`SamplingParams::merge_over`]
/// combines the two before dispatch. Absent fields are skipped during
/// serialization, so a field set in neither place never reaches the
/// backend.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct SamplingParams {
    /// Amount of randomness injected into sampling, between 0 and 1
    #[validate(range(
        min = 0.0,
        max = 1.0,
        message = "temperature must be between 0.0 and 1.0"
    ))]
    pub temperature: Option<f32>,

    /// The maximum number of tokens to generate
    #[validate(range(min = 1, message = "max_tokens must be greater than 0"))]
    pub max_tokens: Option<u32>,

    /// Nucleus sampling threshold, between 0 and 1
    #[validate(range(min = 0.0, max = 1.0, message = "top_p must be between 0.0 and 1.0"))]
    pub top_p: Option<f32>,

    /// Number between -2.0 and 2.0. Positive values penalize tokens by their frequency so far
    #[validate(range(
        min = -2.0,
        max = 2.0,
        message = "frequency_penalty must be between -2.0 and 2.0"
    ))]
    pub frequency_penalty: Option<f32>,

    /// Number between -2.0 and 2.0. Positive values penalize tokens that already appeared
    #[validate(range(
        min = -2.0,
        max = 2.0,
        message = "presence_penalty must be between -2.0 and 2.0"
    ))]
    pub presence_penalty: Option<f32>,

    /// If specified, the backend samples deterministically on a best-effort basis
    pub seed: Option<i64>,

    /// Structured directive for the shape of the model output
    pub response_format: Option<ResponseFormat>,
}

impl SamplingParams {
    /// Overlay `overrides` on top of these defaults.
    ///
    /// Fields present in `overrides` win; fields absent in `overrides`
    /// keep the default; fields absent in both stay absent. Pure data
    /// combination, no validation, no field-order dependence.
    pub fn merge_over(&self, overrides: Option<&SamplingParams>) -> SamplingParams {
        let Some(overrides) = overrides else {
            return self.clone();
        };
        SamplingParams {
            temperature: overrides.temperature.or(self.temperature),
            max_tokens: overrides.max_tokens.or(self.max_tokens),
            top_p: overrides.top_p.or(self.top_p),
            frequency_penalty: overrides.frequency_penalty.or(self.frequency_penalty),
            presence_penalty: overrides.presence_penalty.or(self.presence_penalty),
            seed: overrides.seed.or(self.seed),
            response_format: overrides
                .response_format
                .clone()
                .or_else(|| self.response_format.clone()),
        }
    }
}

/// Requested output format for a completion.
///
/// Parsed once at the request boundary (multipart endpoints accept it
/// as a JSON-encoded string) and carried as a typed union from there on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Plain text output
    Text,
    /// Any syntactically valid JSON object
    JsonObject,
    /// JSON constrained by a named schema
    JsonSchema {
        json_schema: JsonSchemaFormat,
    },
}

/// Named JSON schema constraint for structured output.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchemaFormat {
    /// Identifier for the schema, echoed back by some backends
    pub name: String,

    /// The JSON schema the output must conform to
    pub schema: Value,

    /// Whether the backend must follow the schema exactly
    pub strict: Option<bool>,
}
