//! Ollama Analyzer
//!
//! Analyzer provider speaking the Ollama `/api/chat` endpoint with JSON
//! structured output. Any server exposing the same endpoint works. HTTP
//! failures surface as `Unavailable`; a response the prompts' JSON schema
//! does not parse out of surfaces as `Malformed` (the gateway retries once).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use engram_core::{
    AnalyzedType, Analyzer, AnalyzerError, ConceptDraft, MemoryRecord, Mood,
    SignificanceJudgment,
};

/// Default chat endpoint
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "llama3.1";

const EXTRACT_PROMPT: &str = "You split a memory record into 2-4 self-contained concepts. \
Respond with JSON only: {\"concepts\": [{\"title\": string, \"description\": \"2-3 sentences\", \
\"analyzedType\": one of faktenwissen|prozedurales_wissen|erlebnisse|bewusstsein|humor|zusammenarbeit, \
\"confidence\": number 0..1, \"mood\": positive|neutral|negative, \
\"keywords\": [3-5 strings], \"extractedConcepts\": [2-4 strings]}]}. \
Use one consistent analyzedType for all concepts of a record.";

const JUDGE_PROMPT: &str = "You judge whether a memory is significant. Significant means: \
first-time establishment of a pattern, a paradigm shift, a crisis resolution, or a novel \
collaboration pattern. Routine, incremental, or repetitive events are NOT significant. \
When unsure, answer not significant. \
Respond with JSON only: {\"significant\": boolean, \"reason\": string}.";

const RANK_PROMPT: &str = "You score how relevant each candidate text is to a query. \
Respond with JSON only: {\"scores\": [number 0..1, one per candidate, in input order]}.";

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    format: &'a str,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractPayload {
    concepts: Vec<ConceptPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConceptPayload {
    title: String,
    description: String,
    analyzed_type: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    mood: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    extracted_concepts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct JudgePayload {
    significant: bool,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct RankPayload {
    scores: Vec<f64>,
}

// ============================================================================
// PROVIDER
// ============================================================================

/// Analyzer backed by an Ollama-compatible chat endpoint
pub struct OllamaAnalyzer {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaAnalyzer {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    async fn chat(&self, system: &str, user: String) -> Result<String, AnalyzerError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user,
                },
            ],
            stream: false,
            format: "json",
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalyzerError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalyzerError::Unavailable(format!(
                "chat endpoint returned {}",
                response.status()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnalyzerError::Malformed(e.to_string()))?;
        Ok(parsed.message.content)
    }
}

impl Default for OllamaAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_MODEL)
    }
}

#[async_trait]
impl Analyzer for OllamaAnalyzer {
    async fn extract_and_analyze(
        &self,
        record: &MemoryRecord,
    ) -> Result<Vec<ConceptDraft>, AnalyzerError> {
        let user = format!(
            "Category: {}\nTopic: {}\nContent:\n{}",
            record.category, record.topic, record.content
        );
        let content = self.chat(EXTRACT_PROMPT, user).await?;

        let payload: ExtractPayload = serde_json::from_str(&content)
            .map_err(|e| AnalyzerError::Malformed(format!("concepts json: {e}")))?;

        payload
            .concepts
            .into_iter()
            .map(|c| {
                let analyzed_type = AnalyzedType::parse_name(&c.analyzed_type).ok_or_else(|| {
                    AnalyzerError::Malformed(format!("unknown analyzed type: {}", c.analyzed_type))
                })?;
                Ok(ConceptDraft {
                    title: c.title,
                    description: c.description,
                    analyzed_type,
                    confidence: c.confidence.clamp(0.0, 1.0),
                    mood: Mood::parse_name(&c.mood),
                    keywords: c.keywords,
                    extracted_concepts: c.extracted_concepts,
                })
            })
            .collect()
    }

    async fn judge_significance(
        &self,
        record: &MemoryRecord,
        analyzed_type: AnalyzedType,
    ) -> Result<SignificanceJudgment, AnalyzerError> {
        let user = format!(
            "Type: {}\nTopic: {}\nContent:\n{}",
            analyzed_type, record.topic, record.content
        );
        let content = self.chat(JUDGE_PROMPT, user).await?;

        let payload: JudgePayload = serde_json::from_str(&content)
            .map_err(|e| AnalyzerError::Malformed(format!("judgment json: {e}")))?;
        Ok(SignificanceJudgment {
            significant: payload.significant,
            reason: if payload.reason.is_empty() {
                "no reason given".to_string()
            } else {
                payload.reason
            },
        })
    }

    async fn rank_results(
        &self,
        query: &str,
        candidates: &[String],
    ) -> Result<Vec<f64>, AnalyzerError> {
        let mut user = format!("Query: {query}\nCandidates:\n");
        for (index, candidate) in candidates.iter().enumerate() {
            // Bound prompt size per candidate
            let snippet: String = candidate.chars().take(400).collect();
            user.push_str(&format!("{index}. {snippet}\n"));
        }
        let content = self.chat(RANK_PROMPT, user).await?;

        let payload: RankPayload = serde_json::from_str(&content)
            .map_err(|e| AnalyzerError::Malformed(format!("scores json: {e}")))?;
        if payload.scores.len() != candidates.len() {
            return Err(AnalyzerError::Malformed(format!(
                "expected {} scores, got {}",
                candidates.len(),
                payload.scores.len()
            )));
        }
        Ok(payload
            .scores
            .into_iter()
            .map(|s| s.clamp(0.0, 1.0))
            .collect())
    }
}

// ============================================================================
// TESTS
// ============================================================================
