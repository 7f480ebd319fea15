//! Text Generation
//!
//! The external text-generation capability, the offline template generator,
//! and the fan-out that runs one request per accepted task with its own timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::error::TextGenError;
use crate::learning::{Approach, StrategyRecommendation};

/// Everything the generator needs to draft a decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub agent_id: String,
    pub role: String,
    pub personality_summary: String,
    pub task_context: String,
    pub memories: Vec<String>,
    pub recommendation: StrategyRecommendation,
}

/// A drafted decision. Structured fields are optional; the engine falls back
/// to reading the free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
    #[serde(default)]
    pub approach: Option<Approach>,
    /// Generator's own quality estimate in [0, 1]
    #[serde(default)]
    pub quality_hint: Option<f32>,
}

impl GenerationResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            approach: None,
            quality_hint: None,
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, TextGenError>;
}

/// Deterministic offline generator built from canned phrasing.
///
/// Follows the learned recommendation when it has evidence; otherwise picks
/// an approach from the agent's personality summary.
#[derive(Debug, Clone, Default)]
pub struct TemplateTextGenerator;

impl TemplateTextGenerator {
    fn choose(request: &GenerationRequest) -> Approach {
        if request.recommendation.has_evidence() {
            return request.recommendation.approach;
        }
        let summary = request.personality_summary.as_str();
        if summary.contains("risk-seeking") || summary.contains("decisive") {
            Approach::Aggressive
        } else if summary.contains("risk-averse") {
            Approach::Conservative
        } else if summary.contains("innovative") {
            Approach::Innovative
        } else if summary.contains("collaborative") {
            Approach::Collaborative
        } else {
            Approach::Balanced
        }
    }
}

#[async_trait]
impl TextGenerator for TemplateTextGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, TextGenError> {
        let approach = Self::choose(&request);
        let phrasing = match approach {
            Approach::Aggressive => "move fast and commit resources immediately",
            Approach::Conservative => "take a careful, gradual path and protect the downside",
            Approach::Innovative => "run an experimental pilot with a new angle",
            Approach::Collaborative => "bring the team together and build consensus",
            Approach::Balanced => "weigh the trade-offs and proceed steadily",
        };
        let text = format!(
            "As {}, for {} I will {}. Drawing on {} related experience(s).",
            request.role,
            request.task_context,
            phrasing,
            request.memories.len()
        );

        Ok(GenerationResponse {
            text,
            approach: Some(approach),
            quality_hint: None,
        })
    }
}

/// Rejects responses that carry no usable text.
pub fn check_response(response: GenerationResponse) -> Result<GenerationResponse, TextGenError> {
    if response.text.trim().is_empty() {
        return Err(TextGenError::MalformedOutput("empty response".to_string()));
    }
    if let Some(hint) = response.quality_hint {
        if !hint.is_finite() || !(0.0..=1.0).contains(&hint) {
            return Err(TextGenError::MalformedOutput(format!("quality hint {} out of range", hint)));
        }
    }
    Ok(response)
}

/// Runs every request concurrently, each under its own timeout, and returns
/// the results in request order.
pub async fn generate_all(
    generator: Arc<dyn TextGenerator>,
    requests: Vec<GenerationRequest>,
    timeout: Duration,
) -> Vec<Result<GenerationResponse, TextGenError>> {
    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let generator = Arc::clone(&generator);
            tokio::spawn(async move {
                match tokio::time::timeout(timeout, generator.generate(request)).await {
                    Ok(result) => result.and_then(check_response),
                    Err(_) => Err(TextGenError::Timeout),
                }
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(err) => Err(TextGenError::MalformedOutput(format!("generation task failed: {}", err))),
        };
        if let Err(err) = &result {
            warn!(%err, "text generation failed");
        }
        results.push(result);
    }
    results
}
