//! Core type definitions for Voyage

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest number of chats a single account may run per cycle
pub const MAX_CHAT_COUNT: u32 = 20;

/// Credentials for one account
///
/// Loaded once at startup from `account.json` and never mutated afterwards.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Bearer token for the reward API
    pub bearer: String,
    /// Credential for the generative-AI service
    #[serde(rename = "geminiApiKey")]
    pub gemini_api_key: String,
}

impl Account {
    pub fn new(bearer: impl Into<String>, gemini_api_key: impl Into<String>) -> Self {
        Self {
            bearer: bearer.into(),
            gemini_api_key: gemini_api_key.into(),
        }
    }

    /// Bearer token shortened to `first8...last6` for display
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.bearer.chars().collect();
        if chars.len() <= 14 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 6..].iter().collect();
        format!("{}...{}", head, tail)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("bearer", &self.masked_token())
            .field("gemini_api_key", &"<redacted>")
            .finish()
    }
}

/// Egress proxy assigned to one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyAssignment {
    pub uri: String,
}

impl ProxyAssignment {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

impl fmt::Display for ProxyAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}

/// One account together with its position and proxy, as processed by a cycle
#[derive(Debug, Clone)]
pub struct AccountSlot {
    /// Zero-based position in the account list
    pub index: usize,
    pub account: Account,
    pub proxy: Option<ProxyAssignment>,
}

impl AccountSlot {
    pub fn new(index: usize, account: Account, proxy: Option<ProxyAssignment>) -> Self {
        Self {
            index,
            account,
            proxy,
        }
    }
}

/// Snapshot of the account's leaderboard entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    pub total_points: Option<f64>,
    pub rank: Option<f64>,
}

/// A prompt candidate returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Prompt {
    pub text: String,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Remote model entry resolved from a model tag
///
/// The id is echoed verbatim into the interaction payload, so its JSON type
/// (string or number) is preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    pub id: serde_json::Value,
    #[serde(default)]
    pub name: String,
}

/// Number of chats to run per account, always within `1..=MAX_CHAT_COUNT`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ChatCount(u32);

impl ChatCount {
    pub fn get(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u32> for ChatCount {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if (1..=MAX_CHAT_COUNT).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!(
                "Invalid chat count: {}. Use a number between 1 and {}.",
                value, MAX_CHAT_COUNT
            ))
        }
    }
}

impl From<ChatCount> for u32 {
    fn from(count: ChatCount) -> Self {
        count.0
    }
}

impl std::str::FromStr for ChatCount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("Invalid chat count: {}", s.trim()))?;
        Self::try_from(value)
    }
}

impl fmt::Display for ChatCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Search flags attached to every interaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionMetadata {
    pub has_search: bool,
    pub has_deep_search: bool,
}

/// Interaction payload before signing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedInteraction {
    pub user_id: u64,
    pub model_id: serde_json::Value,
    pub request_text: String,
    pub response_text: String,
    pub metadata: InteractionMetadata,
}

/// Interaction payload as posted to `/interactions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub user_id: u64,
    pub model_id: serde_json::Value,
    pub request_text: String,
    pub response_text: String,
    pub metadata: InteractionMetadata,
    pub signature: String,
}

impl InteractionRecord {
    /// Attach a signature to an unsigned payload
    pub fn from_unsigned(unsigned: UnsignedInteraction, signature: String) -> Self {
        Self {
            user_id: unsigned.user_id,
            model_id: unsigned.model_id,
            request_text: unsigned.request_text,
            response_text: unsigned.response_text,
            metadata: unsigned.metadata,
            signature,
        }
    }
}
