//! Per-account and per-cycle outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use voyage_core::UserProfile;

/// How an account's run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountOutcome {
    /// At least one chat was submitted
    Succeeded,
    /// Ran to completion, but every chat failed
    NoSuccessfulChats,
    /// Profile or prompt fetch failed; nothing else ran
    Aborted { reason: String },
}

/// Tag usage counts, kept in first-use order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUsage {
    entries: Vec<(String, u32)>,
}

impl ModelUsage {
    pub fn record(&mut self, tag: &str) {
        match self.entries.iter_mut().find(|(t, _)| t == tag) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((tag.to_string(), 1)),
        }
    }

    pub fn count(&self, tag: &str) -> u32 {
        self.entries
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    pub fn entries(&self) -> &[(String, u32)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Summary of one account within a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountReport {
    /// Zero-based account index
    pub index: usize,
    /// Profile before any chat
    pub before: Option<UserProfile>,
    /// Profile after the chats, if the second fetch worked
    pub after: Option<UserProfile>,
    pub successful_chats: u32,
    pub failed_chats: u32,
    /// Model tags resolved, in chat order
    pub tags_used: Vec<String>,
    pub model_usage: ModelUsage,
    pub outcome: AccountOutcome,
}

impl AccountReport {
    pub(crate) fn aborted(index: usize, before: Option<UserProfile>, reason: String) -> Self {
        Self {
            index,
            before,
            after: None,
            successful_chats: 0,
            failed_chats: 0,
            tags_used: Vec::new(),
            model_usage: ModelUsage::default(),
            outcome: AccountOutcome::Aborted { reason },
        }
    }

    /// Success is decided solely by whether any chat went through
    pub fn is_success(&self) -> bool {
        self.outcome == AccountOutcome::Succeeded
    }
}

/// Summary of one full cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// When the next cycle is due
    pub next_run_at: DateTime<Utc>,
    pub accounts: Vec<AccountReport>,
}

impl CycleReport {
    pub fn succeeded(&self) -> usize {
        self.accounts.iter().filter(|a| a.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.accounts.len() - self.succeeded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_usage_first_use_order() {
        let mut usage = ModelUsage::default();
        usage.record("grok-4");
        usage.record("gpt-3-5");
        usage.record("grok-4");
        assert_eq!(
            usage.entries(),
            &[("grok-4".to_string(), 2), ("gpt-3-5".to_string(), 1)]
        );
        assert_eq!(usage.count("deepseek_default"), 0);
    }

    #[test]
    fn test_cycle_counts() {
        let ok = AccountReport {
            outcome: AccountOutcome::Succeeded,
            successful_chats: 1,
            ..AccountReport::aborted(0, None, String::new())
        };
        let failed = AccountReport::aborted(1, None, "boom".into());
        let idle = AccountReport {
            outcome: AccountOutcome::NoSuccessfulChats,
            ..AccountReport::aborted(2, None, String::new())
        };
        let now = Utc::now();
        let report = CycleReport {
            cycle_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            next_run_at: now,
            accounts: vec![ok, failed, idle],
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
    }
}
