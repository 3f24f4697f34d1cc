//! # voyage-agent
//!
//! Remote-call layer for Voyage.
//!
//! This crate provides:
//! - [`ResilientClient`]: fixed-interval retry wrapper used around every remote call
//! - [`VoyageApi`] / [`HttpVoyageApi`]: the reward API contract
//! - [`ReplyGenerator`] / [`GeminiGenerator`]: reply generation
//!
//! ## Key Pattern
//!
//! Every attempt builds a fresh HTTP client with a newly drawn user agent and
//! the account's proxy.

mod api;
mod generator;
mod resilient;
mod transport;
mod types;
mod user_agent;

pub use api::{HttpVoyageApi, VoyageApi};
pub use generator::{GeminiGenerator, ReplyGenerator};
pub use resilient::{ResilientClient, RetryPolicy};
pub use transport::build_client;
pub use types::*;
pub use user_agent::{random_user_agent, USER_AGENTS};
