//! Reward API client
//!
//! One method per endpoint, each a single attempt. Retrying is the caller's
//! job (see [`ResilientClient`](crate::ResilientClient)); every call here
//! builds a fresh client so each attempt carries a new user agent.

use async_trait::async_trait;
use serde_json::Value;
use voyage_core::{AccountSlot, InteractionRecord, ModelRef, Prompt, Result, UserProfile, VoyageError};

use crate::transport::{build_client, network_error, read_json};
use crate::types::{
    is_truthy, CategorizedResponse, LeaderboardResponse, ModelSearchResponse,
    RecommendationsResponse,
};

const LEADERBOARD_PATH: &str = "/voyage/leaderboard";
const RECOMMENDATIONS_PATH: &str = "/questions/user/x2-point-recommendations";
const CATEGORIZED_PATH: &str = "/questions/user/recommendations";
const MODEL_SEARCH_PATH: &str = "/api/ai-models/search";
const INTERACTIONS_PATH: &str = "/interactions";

/// The remote reward API, as seen by one account
#[async_trait]
pub trait VoyageApi: Send + Sync {
    /// Leaderboard entry of the account
    async fn fetch_profile(&self, slot: &AccountSlot) -> Result<UserProfile>;

    /// Prompts from the primary (double-points) endpoint; may be empty
    async fn fetch_recommended_prompts(&self, slot: &AccountSlot) -> Result<Vec<Prompt>>;

    /// Prompts from the categorized fallback endpoint, flattened; may be empty
    async fn fetch_categorized_prompts(&self, slot: &AccountSlot) -> Result<Vec<Prompt>>;

    /// First model matching `tag`
    async fn search_model(&self, slot: &AccountSlot, tag: &str) -> Result<ModelRef>;

    /// Post a signed interaction; the response must carry a truthy `aiResponse`
    async fn submit_interaction(
        &self,
        slot: &AccountSlot,
        record: &InteractionRecord,
    ) -> Result<Value>;
}

/// HTTP implementation of [`VoyageApi`]
#[derive(Debug, Clone)]
pub struct HttpVoyageApi {
    base_url: String,
}

impl HttpVoyageApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T>(&self, slot: &AccountSlot, path: &str, query: &[(&str, &str)]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let client = build_client(slot.proxy.as_ref())?;
        let mut request = client
            .get(self.url(path))
            .bearer_auth(&slot.account.bearer);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request
            .send()
            .await
            .map_err(|e| network_error(&format!("GET {}", path), e))?;
        read_json(response).await
    }
}

#[async_trait]
impl VoyageApi for HttpVoyageApi {
    async fn fetch_profile(&self, slot: &AccountSlot) -> Result<UserProfile> {
        let response: LeaderboardResponse = self
            .get(
                slot,
                LEADERBOARD_PATH,
                &[("page", "1"), ("limit", "100"), ("period", "all_time")],
            )
            .await?;
        response.into_profile()
    }

    async fn fetch_recommended_prompts(&self, slot: &AccountSlot) -> Result<Vec<Prompt>> {
        let response: RecommendationsResponse = self
            .get(
                slot,
                RECOMMENDATIONS_PATH,
                &[("take", "100"), ("page", "1"), ("sort_type", "ASC")],
            )
            .await?;
        Ok(response.into_prompts())
    }

    async fn fetch_categorized_prompts(&self, slot: &AccountSlot) -> Result<Vec<Prompt>> {
        let response: CategorizedResponse = self
            .get(slot, CATEGORIZED_PATH, &[])
            .await?;
        Ok(response.flatten())
    }

    async fn search_model(&self, slot: &AccountSlot, tag: &str) -> Result<ModelRef> {
        let response: ModelSearchResponse = self
            .get(slot, MODEL_SEARCH_PATH, &[("query", tag)])
            .await?;
        response.into_first()
    }

    async fn submit_interaction(
        &self,
        slot: &AccountSlot,
        record: &InteractionRecord,
    ) -> Result<Value> {
        let client = build_client(slot.proxy.as_ref())?;
        let response = client
            .post(self.url(INTERACTIONS_PATH))
            .bearer_auth(&slot.account.bearer)
            .json(record)
            .send()
            .await
            .map_err(|e| network_error("POST /interactions", e))?;

        let body: Value = read_json(response).await?;
        if !body.get("aiResponse").map(is_truthy).unwrap_or(false) {
            return Err(VoyageError::Validation("aiResponse missing".to_string()));
        }
        Ok(body)
    }
}
