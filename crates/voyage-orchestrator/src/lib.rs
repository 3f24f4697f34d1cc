//! # voyage-orchestrator
//!
//! Scheduling layer for Voyage.
//!
//! This crate provides:
//! - The account pipeline (profile, prompts, chats, summary)
//! - The cycle controller with its processing guard and countdown
//! - Per-account and per-cycle reports

mod cycle;
mod pipeline;
mod report;

pub use cycle::{CycleController, ScheduleSettings};
pub use pipeline::{AccountPipeline, PipelineSettings};
pub use report::{AccountOutcome, AccountReport, CycleReport, ModelUsage};
