//! In-memory doubles for the reward API and the reply generator

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::watch;
use voyage_agent::{ReplyGenerator, ResilientClient, RetryPolicy, VoyageApi};
use voyage_core::{
    Account, AccountSlot, ChatCount, InteractionRecord, ModelRef, OutputArbiter, OutputBuffer,
    Prompt, Result, UserProfile, VoyageConfig, VoyageError,
};
use voyage_orchestrator::{AccountPipeline, PipelineSettings};

pub fn prompts(texts: &[&str]) -> Vec<Prompt> {
    texts.iter().map(|t| Prompt::new(*t)).collect()
}

pub fn slot(index: usize) -> AccountSlot {
    AccountSlot::new(
        index,
        Account::new(format!("tok-{}", index + 1), format!("gem-{}", index + 1)),
        None,
    )
}

/// User id the mock hands out for a bearer token like `tok-3`
pub fn user_id_for(bearer: &str) -> u64 {
    let n: u64 = bearer
        .rsplit('-')
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    1000 + n
}

/// Scriptable reward API
#[derive(Default)]
pub struct MockApi {
    primary: Vec<Prompt>,
    categorized: Vec<Prompt>,
    failing_bearers: HashSet<String>,
    /// Profile calls beyond this many fail
    profile_limit: Option<usize>,
    /// Submissions that fail before the first success
    submit_failures: AtomicUsize,
    gate: Option<watch::Receiver<bool>>,
    profile_calls: AtomicUsize,
    primary_calls: AtomicUsize,
    categorized_calls: AtomicUsize,
    searched: Mutex<Vec<String>>,
    submissions: Mutex<Vec<InteractionRecord>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_primary(mut self, texts: &[&str]) -> Self {
        self.primary = prompts(texts);
        self
    }

    pub fn with_categorized(mut self, texts: &[&str]) -> Self {
        self.categorized = prompts(texts);
        self
    }

    pub fn with_failing_profile(mut self, bearer: &str) -> Self {
        self.failing_bearers.insert(bearer.to_string());
        self
    }

    pub fn with_profile_limit(mut self, limit: usize) -> Self {
        self.profile_limit = Some(limit);
        self
    }

    pub fn with_submit_failures(self, count: usize) -> Self {
        self.submit_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Profile calls block until the returned sender publishes `true`
    pub fn gated(mut self) -> (Self, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        self.gate = Some(rx);
        (self, tx)
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn primary_calls(&self) -> usize {
        self.primary_calls.load(Ordering::SeqCst)
    }

    pub fn categorized_calls(&self) -> usize {
        self.categorized_calls.load(Ordering::SeqCst)
    }

    pub fn searched(&self) -> Vec<String> {
        self.searched.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<InteractionRecord> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl VoyageApi for MockApi {
    async fn fetch_profile(&self, slot: &AccountSlot) -> Result<UserProfile> {
        let call = self.profile_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate {
            let mut gate = gate.clone();
            let _ = gate.wait_for(|open| *open).await;
        }
        if self.failing_bearers.contains(&slot.account.bearer) {
            return Err(VoyageError::Status {
                status: 500,
                body: "leaderboard down".to_string(),
            });
        }
        if self.profile_limit.is_some_and(|limit| call > limit) {
            return Err(VoyageError::Network("connection reset".to_string()));
        }
        Ok(UserProfile {
            id: user_id_for(&slot.account.bearer),
            username: format!("user-{}", slot.index + 1),
            total_points: Some(100.0),
            rank: Some(5.0),
        })
    }

    async fn fetch_recommended_prompts(&self, _slot: &AccountSlot) -> Result<Vec<Prompt>> {
        self.primary_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.primary.clone())
    }

    async fn fetch_categorized_prompts(&self, _slot: &AccountSlot) -> Result<Vec<Prompt>> {
        self.categorized_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.categorized.clone())
    }

    async fn search_model(&self, _slot: &AccountSlot, tag: &str) -> Result<ModelRef> {
        self.searched.lock().unwrap().push(tag.to_string());
        Ok(ModelRef {
            id: json!(format!("model-{}", tag)),
            name: tag.to_uppercase(),
        })
    }

    async fn submit_interaction(
        &self,
        _slot: &AccountSlot,
        record: &InteractionRecord,
    ) -> Result<Value> {
        let failing = self
            .submit_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(VoyageError::Validation("aiResponse missing".to_string()));
        }
        self.submissions.lock().unwrap().push(record.clone());
        Ok(json!({ "aiResponse": "stored" }))
    }
}

/// Generator that always answers with the same text
pub struct StaticGenerator {
    reply: String,
    calls: AtomicUsize,
}

impl StaticGenerator {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReplyGenerator for StaticGenerator {
    async fn generate(&self, _credential: &str, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reply.is_empty() {
            return Err(VoyageError::Generation("Empty response from model".to_string()));
        }
        Ok(self.reply.clone())
    }
}

/// Pipeline over the mocks with no retry waits and no pacing
pub fn pipeline(
    api: Arc<MockApi>,
    generator: Arc<StaticGenerator>,
    chat_count: u32,
) -> (AccountPipeline<MockApi, StaticGenerator>, OutputBuffer) {
    paced_pipeline(api, generator, chat_count, Duration::ZERO)
}

/// Pipeline over the mocks with no retry waits and the given wait between chats
pub fn paced_pipeline(
    api: Arc<MockApi>,
    generator: Arc<StaticGenerator>,
    chat_count: u32,
    chat_interval: Duration,
) -> (AccountPipeline<MockApi, StaticGenerator>, OutputBuffer) {
    let (output, buffer) = OutputArbiter::in_memory();
    let client = ResilientClient::new(RetryPolicy::immediate(5), output);
    let config = VoyageConfig::default();
    let mut settings = PipelineSettings::from_config(
        &config,
        ChatCount::try_from(chat_count).unwrap(),
        false,
    );
    settings.chat_interval = chat_interval;
    (
        AccountPipeline::new(api, generator, client, settings),
        buffer,
    )
}
