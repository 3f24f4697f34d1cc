//! # voyage-core
//!
//! Core types for the Voyage reward-API orchestrator.
//!
//! Voyage drives a fixed daily cycle against one remote reward-tracking API:
//! for every configured account it reads the profile, asks for prompts,
//! generates replies through a generative-AI service and submits signed
//! interaction records.
//!
//! ## Contents
//!
//! - Unified error type ([`VoyageError`])
//! - Account, profile, prompt and interaction types
//! - The request signer used by the interaction endpoint
//! - Configuration loaded from `voyage.toml`
//! - Account and proxy loaders
//! - The console [`OutputArbiter`](output::OutputArbiter)

pub mod accounts;
pub mod config;
mod error;
pub mod output;
pub mod signer;
mod types;

pub use config::VoyageConfig;
pub use error::{Result, VoyageError};
pub use output::{IndicatorGuard, OutputArbiter, OutputBuffer, Tone};
pub use types::*;
