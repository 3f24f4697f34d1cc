//! Account pipeline - one account's full pass through the reward API
//!
//! Each run:
//! 1. Fetches the profile (failure aborts the account)
//! 2. Fetches prompts, falling back to the categorized endpoint when empty
//! 3. Shuffles them and runs `chat_count` chats: generate, resolve model, sign and submit
//! 4. Fetches the profile again and prints a summary
//!
//! Every remote step goes through the [`ResilientClient`]. A failed chat is
//! counted and the loop moves on.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};
use voyage_agent::{ReplyGenerator, ResilientClient, VoyageApi};
use voyage_core::output::{display_timestamp, progress_bar};
use voyage_core::signer::sign_interaction;
use voyage_core::{
    AccountSlot, ChatCount, InteractionMetadata, ModelRef, OutputArbiter, Prompt, Result, Tone,
    UnsignedInteraction, UserProfile, VoyageConfig, VoyageError,
};

use crate::report::{AccountOutcome, AccountReport, ModelUsage};

/// Knobs for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub chat_count: ChatCount,
    /// Wait after every chat iteration
    pub chat_interval: Duration,
    /// Model tags, used round-robin
    pub model_tags: Vec<String>,
    /// Type replies out character by character
    pub animate_replies: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &VoyageConfig, chat_count: ChatCount, animate_replies: bool) -> Self {
        Self {
            chat_count,
            chat_interval: config.pacing.chat_interval(),
            model_tags: config.model_tags.clone(),
            animate_replies,
        }
    }
}

/// Round-robin cursor over the model tags
///
/// Only advances once a tag has been resolved to a model.
#[derive(Debug)]
struct ModelRotation<'a> {
    tags: &'a [String],
    index: usize,
}

impl<'a> ModelRotation<'a> {
    fn new(tags: &'a [String]) -> Self {
        Self { tags, index: 0 }
    }

    fn current(&self) -> Option<&'a str> {
        if self.tags.is_empty() {
            None
        } else {
            Some(self.tags[self.index % self.tags.len()].as_str())
        }
    }

    fn advance(&mut self) {
        self.index += 1;
    }
}

/// Shuffle the fetched prompts and keep the first `count` as the working set
fn select_working_set(prompts: &[Prompt], count: usize) -> Vec<Prompt> {
    let mut shuffled = prompts.to_vec();
    shuffled.shuffle(&mut rand::thread_rng());
    shuffled.truncate(count);
    shuffled
}

/// Prompt for iteration `j`; past the working set, any fetched prompt will do
fn prompt_for(working_set: &[Prompt], all: &[Prompt], j: usize) -> Option<Prompt> {
    working_set
        .get(j)
        .or_else(|| all.choose(&mut rand::thread_rng()))
        .cloned()
}

/// Drives one account through a cycle
pub struct AccountPipeline<A, G> {
    api: Arc<A>,
    generator: Arc<G>,
    client: ResilientClient,
    settings: PipelineSettings,
}

impl<A: VoyageApi, G: ReplyGenerator> AccountPipeline<A, G> {
    pub fn new(
        api: Arc<A>,
        generator: Arc<G>,
        client: ResilientClient,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            api,
            generator,
            client,
            settings,
        }
    }

    pub fn output(&self) -> &OutputArbiter {
        self.client.output()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run one account; never fails, the outcome is in the report
    pub async fn run(&self, slot: &AccountSlot, total_accounts: usize) -> AccountReport {
        let out = self.output();
        out.header(format!(
            "Processing Account {}/{}",
            slot.index + 1,
            total_accounts
        ));
        out.line(
            Tone::Muted,
            format!(" ┊ Token: {}", slot.account.masked_token()),
        );
        match &slot.proxy {
            Some(proxy) => out.line(Tone::Detail, format!(" ┊ Using proxy: {}", proxy)),
            None => out.line(Tone::Detail, " ┊ Not using proxy"),
        }
        info!("Processing account {}/{}", slot.index + 1, total_accounts);

        let before = match self.fetch_profile(slot).await {
            Ok(profile) => profile,
            Err(err) => return self.abort(slot, None, err),
        };
        self.show_profile("User Info", &before);

        let prompts = match self.fetch_prompts(slot).await {
            Ok(prompts) => prompts,
            Err(err) => return self.abort(slot, Some(before), err),
        };
        out.line(
            Tone::Info,
            format!(" ┊ Found {} recommended questions", prompts.len()),
        );

        let chat_count = self.settings.chat_count.as_usize();
        let working_set = select_working_set(&prompts, chat_count);
        let mut rotation = ModelRotation::new(&self.settings.model_tags);
        let mut usage = ModelUsage::default();
        let mut tags_used = Vec::new();
        let mut successful_chats = 0u32;
        let mut failed_chats = 0u32;

        for j in 0..chat_count {
            out.line(
                Tone::Warning,
                format!(" ┊ ├─ Chat {} ──", progress_bar(j + 1, chat_count)),
            );

            let result = match prompt_for(&working_set, &prompts, j) {
                Some(prompt) => {
                    out.line(Tone::Detail, format!(" ┊ │ Message: {}", prompt));
                    self.run_chat(slot, &before, &prompt, &mut rotation, &mut usage, &mut tags_used)
                        .await
                }
                None => Err(VoyageError::Validation(
                    "No recommended questions found".to_string(),
                )),
            };

            match result {
                Ok(()) => successful_chats += 1,
                Err(err) => {
                    failed_chats += 1;
                    warn!("Chat {} for account {} failed: {}", j + 1, slot.index + 1, err);
                    out.line(
                        Tone::Error,
                        format!(" ┊ ✗ Chat {} failed: {}", j + 1, err.root_cause()),
                    );
                }
            }
            out.line(Tone::Warning, " ┊ └──");
            tokio::time::sleep(self.settings.chat_interval).await;
        }

        let after = match self.fetch_profile(slot).await {
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!("Final profile fetch for account {} failed: {}", slot.index + 1, err);
                out.line(
                    Tone::Error,
                    format!(" ┊ ✗ Could not refresh user info: {}", err.root_cause()),
                );
                None
            }
        };

        let outcome = if successful_chats > 0 {
            AccountOutcome::Succeeded
        } else {
            AccountOutcome::NoSuccessfulChats
        };
        let report = AccountReport {
            index: slot.index,
            before: Some(before),
            after,
            successful_chats,
            failed_chats,
            tags_used,
            model_usage: usage,
            outcome,
        };
        self.show_summary(&report);
        report
    }

    /// Leaderboard entry of the account, retried
    pub async fn fetch_profile(&self, slot: &AccountSlot) -> Result<UserProfile> {
        self.client
            .call_with(
                "Getting User Info",
                || self.api.fetch_profile(slot),
                |_| "User Info Fetched Successfully".to_string(),
            )
            .await
    }

    /// Primary prompts, or the flattened fallback when the primary set is empty
    ///
    /// Both endpoints run inside the same attempt, so an empty pair is retried
    /// like any other failure.
    pub async fn fetch_prompts(&self, slot: &AccountSlot) -> Result<Vec<Prompt>> {
        let api = &self.api;
        self.client
            .call_with(
                "Getting Recommended Questions",
                || async move {
                    let primary = api.fetch_recommended_prompts(slot).await?;
                    if !primary.is_empty() {
                        return Ok(primary);
                    }
                    debug!("Primary prompt list empty, trying categorized list");
                    let fallback = api.fetch_categorized_prompts(slot).await?;
                    if fallback.is_empty() {
                        return Err(VoyageError::Validation(
                            "No recommended questions found".to_string(),
                        ));
                    }
                    Ok(fallback)
                },
                |prompts: &Vec<Prompt>| format!("Recommended Questions Fetched ({})", prompts.len()),
            )
            .await
    }

    async fn run_chat(
        &self,
        slot: &AccountSlot,
        profile: &UserProfile,
        prompt: &Prompt,
        rotation: &mut ModelRotation<'_>,
        usage: &mut ModelUsage,
        tags_used: &mut Vec<String>,
    ) -> Result<()> {
        let generator = &self.generator;
        let credential = slot.account.gemini_api_key.as_str();
        let reply = self
            .client
            .call_with(
                "Sending Chat",
                || generator.generate(credential, &prompt.text),
                |_| "Chat Sent".to_string(),
            )
            .await?;
        self.output()
            .type_text(&reply, self.settings.animate_replies)
            .await;

        let tag = rotation
            .current()
            .ok_or_else(|| VoyageError::Config("no model tags configured".to_string()))?;
        let api = &self.api;
        let model = self
            .client
            .call_with(
                &format!("Searching AI Model ({})", tag),
                || api.search_model(slot, tag),
                |model: &ModelRef| format!("AI Model Fetched: {}", model.name),
            )
            .await?;
        rotation.advance();
        usage.record(tag);
        tags_used.push(tag.to_string());

        let model = &model;
        let reply = reply.as_str();
        let user_id = profile.id;
        self.client
            .call_with(
                "Submitting Interaction",
                || async move {
                    let unsigned = UnsignedInteraction {
                        user_id,
                        model_id: model.id.clone(),
                        request_text: prompt.text.clone(),
                        response_text: reply.to_string(),
                        metadata: InteractionMetadata::default(),
                    };
                    let record = sign_interaction(unsigned, Utc::now().timestamp_millis())?;
                    api.submit_interaction(slot, &record).await
                },
                |_| "Interaction Submitted Successfully".to_string(),
            )
            .await?;
        Ok(())
    }

    fn abort(
        &self,
        slot: &AccountSlot,
        before: Option<UserProfile>,
        err: VoyageError,
    ) -> AccountReport {
        warn!("Account {} aborted: {}", slot.index + 1, err);
        self.output().line(
            Tone::Error,
            format!(
                " ┊ ✗ Error processing account {}: {}",
                slot.index + 1,
                err.root_cause()
            ),
        );
        AccountReport::aborted(slot.index, before, err.to_string())
    }

    fn show_profile(&self, title: &str, profile: &UserProfile) {
        let out = self.output();
        out.line(Tone::Info, format!(" ┊ ┌── {} ──", title));
        out.line(Tone::Detail, format!(" ┊ │ Username: {}", profile.username));
        out.line(Tone::Detail, format!(" ┊ │ User ID: {}", profile.id));
        out.line(
            Tone::Detail,
            format!(" ┊ │ Total Points: {}", display_optional(profile.total_points)),
        );
        out.line(
            Tone::Detail,
            format!(" ┊ │ Rank: {}", display_optional(profile.rank)),
        );
        out.line(Tone::Info, " ┊ └──");
    }

    fn show_summary(&self, report: &AccountReport) {
        let out = self.output();
        if let Some(after) = &report.after {
            self.show_profile("Final User Info", after);
        }
        out.line(Tone::Accent, " ┊ ┌── Summary ──");
        out.line(
            Tone::Success,
            format!(" ┊ │ Successful chats: {}", report.successful_chats),
        );
        out.line(
            Tone::Error,
            format!(" ┊ │ Failed chats: {}", report.failed_chats),
        );
        if !report.model_usage.is_empty() {
            out.line(Tone::Detail, " ┊ │ Agents Used:");
            for (tag, count) in report.model_usage.entries() {
                out.line(Tone::Detail, format!(" ┊ │   {}: {}", tag, count));
            }
        }
        out.line(
            Tone::Muted,
            format!(" ┊ │ Finished: {}", display_timestamp(Utc::now())),
        );
        out.line(Tone::Accent, " ┊ └──");
    }
}

fn display_optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
}
