//! Wire formats for the reward API and the generative-AI service

use serde::{Deserialize, Serialize};
use serde_json::Value;
use voyage_core::{ModelRef, Prompt, Result, UserProfile, VoyageError};

/// `GET /voyage/leaderboard` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardResponse {
    #[serde(default)]
    pub my_rank: Option<RankEntry>,
}

/// The caller's own leaderboard entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RankEntry {
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub twitter_screen_name: Option<String>,
    #[serde(default)]
    pub total_points: Option<f64>,
    /// Display-only; accepted as any JSON number
    #[serde(default)]
    pub rank: Option<f64>,
}

impl LeaderboardResponse {
    /// Extract the profile; a missing entry or user id is a validation failure
    pub fn into_profile(self) -> Result<UserProfile> {
        let entry = self
            .my_rank
            .ok_or_else(|| VoyageError::Validation("my_rank missing".to_string()))?;
        let id = entry
            .user_id
            .ok_or_else(|| VoyageError::Validation("user ID missing".to_string()))?;
        let username = entry
            .user_name
            .filter(|name| !name.is_empty())
            .or(entry.twitter_screen_name)
            .unwrap_or_default();

        Ok(UserProfile {
            id,
            username,
            total_points: entry.total_points,
            rank: entry.rank,
        })
    }
}

/// `GET /questions/user/x2-point-recommendations` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationsResponse {
    #[serde(default)]
    pub result: Option<RecommendationPage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationPage {
    #[serde(default)]
    pub data: Vec<Prompt>,
}

impl RecommendationsResponse {
    pub fn into_prompts(self) -> Vec<Prompt> {
        self.result.map(|page| page.data).unwrap_or_default()
    }
}

/// `GET /questions/user/recommendations` response (fallback)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategorizedResponse {
    #[serde(default)]
    pub data: Vec<PromptCategory>,
}

/// A category of prompts in the fallback endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptCategory {
    #[serde(default)]
    pub questions: Vec<Prompt>,
}

impl CategorizedResponse {
    /// All prompts of all categories, in order
    pub fn flatten(self) -> Vec<Prompt> {
        self.data
            .into_iter()
            .flat_map(|category| category.questions)
            .collect()
    }
}

/// `GET /api/ai-models/search` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelSearchResponse {
    #[serde(default)]
    pub data: Vec<ModelRef>,
}

impl ModelSearchResponse {
    /// First hit; a missing or id-less entry is a validation failure
    pub fn into_first(self) -> Result<ModelRef> {
        match self.data.into_iter().next() {
            Some(model) if !model.id.is_null() => Ok(model),
            _ => Err(VoyageError::Validation("No model found".to_string())),
        }
    }
}

/// JavaScript-style truthiness of a JSON value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Gemini `generateContent` request
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    pub fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Gemini `generateContent` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}
