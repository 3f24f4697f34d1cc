//! Cycle controller - runs every account once a day
//!
//! Only one cycle runs at a time. A timer tick that lands while a cycle is
//! still processing, or while any indicator is on screen, is dropped rather
//! than queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;
use voyage_agent::{ReplyGenerator, VoyageApi};
use voyage_core::config::MAX_CYCLE_INTERVAL_SECS;
use voyage_core::output::display_timestamp;
use voyage_core::{AccountSlot, OutputArbiter, Result, Tone, VoyageConfig, VoyageError};

use crate::pipeline::AccountPipeline;
use crate::report::CycleReport;

/// Floor for timer periods; tokio intervals reject zero
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Ceiling for the cycle interval, keeps instant arithmetic in range
const MAX_PERIOD: Duration = Duration::from_secs(MAX_CYCLE_INTERVAL_SECS);

/// Timer settings for the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSettings {
    /// Time between cycle starts
    pub cycle_interval: Duration,
    /// Countdown repaint period
    pub countdown_tick: Duration,
}

impl ScheduleSettings {
    pub fn from_config(config: &VoyageConfig) -> Self {
        Self {
            cycle_interval: config.pacing.cycle_interval(),
            countdown_tick: config.pacing.countdown_tick(),
        }
    }

    /// Cycle interval clamped to the range the timers accept
    pub fn effective_interval(&self) -> Duration {
        self.cycle_interval.clamp(MIN_PERIOD, MAX_PERIOD)
    }
}

/// Clears the processing flag when dropped
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Schedules account cycles and owns the countdown display
pub struct CycleController<A, G> {
    slots: Vec<AccountSlot>,
    pipeline: AccountPipeline<A, G>,
    schedule: ScheduleSettings,
    processing: AtomicBool,
    cycles_completed: AtomicU64,
    last_cycle_end: Mutex<Option<DateTime<Utc>>>,
    countdown: Mutex<Option<JoinHandle<()>>>,
}

impl<A, G> CycleController<A, G>
where
    A: VoyageApi + 'static,
    G: ReplyGenerator + 'static,
{
    pub fn new(
        slots: Vec<AccountSlot>,
        pipeline: AccountPipeline<A, G>,
        schedule: ScheduleSettings,
    ) -> Result<Self> {
        if slots.is_empty() {
            return Err(VoyageError::Accounts(
                "at least one account is required".to_string(),
            ));
        }
        Ok(Self {
            slots,
            pipeline,
            schedule,
            processing: AtomicBool::new(false),
            cycles_completed: AtomicU64::new(0),
            last_cycle_end: Mutex::new(None),
            countdown: Mutex::new(None),
        })
    }

    pub fn output(&self) -> &OutputArbiter {
        self.pipeline.output()
    }

    pub fn slots(&self) -> &[AccountSlot] {
        &self.slots
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Acquire)
    }

    /// End time of the most recent finished cycle
    pub fn last_cycle_end(&self) -> Option<DateTime<Utc>> {
        self.last_cycle_end.lock().ok().and_then(|guard| *guard)
    }

    fn try_begin(&self) -> Option<ProcessingGuard<'_>> {
        self.processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ProcessingGuard(&self.processing))
    }

    /// Run one cycle unless another is already processing
    ///
    /// Returns `None` when the call was dropped.
    pub async fn run_cycle(&self) -> Option<CycleReport> {
        let Some(_guard) = self.try_begin() else {
            debug!("Cycle already in progress, skipping");
            return None;
        };

        let cycle_id = Uuid::new_v4();
        let span = info_span!("cycle", id = %cycle_id);
        let report = self.process_all(cycle_id).instrument(span).await;
        Some(report)
    }

    /// Timer entry point; dropped while busy or while an indicator is showing
    pub async fn on_tick(&self) -> Option<CycleReport> {
        if self.output().is_suppressed() {
            debug!("Indicator active, dropping tick");
            return None;
        }
        self.run_cycle().await
    }

    /// First cycle now, then one per interval, forever
    pub async fn run_forever(self: Arc<Self>) {
        self.output().line(
            Tone::Info,
            format!("⏰ Starting process for {} accounts...", self.slots.len()),
        );
        self.run_cycle().await;

        let interval = self.schedule.effective_interval();
        self.output().line(
            Tone::Info,
            format!(
                "⏰ Process repeats every {}",
                humanize_interval(interval)
            ),
        );

        let mut timer = tokio::time::interval_at(Instant::now() + interval, interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            timer.tick().await;
            let controller = Arc::clone(&self);
            tokio::spawn(async move {
                controller.on_tick().await;
            });
        }
    }

    async fn process_all(&self, cycle_id: Uuid) -> CycleReport {
        let started_at = Utc::now();
        let total = self.slots.len();
        info!("Cycle {} started for {} accounts", cycle_id, total);
        self.output().line(
            Tone::Info,
            format!("Cycle started at {}", display_timestamp(started_at)),
        );

        let mut accounts = Vec::with_capacity(total);
        for slot in &self.slots {
            accounts.push(self.pipeline.run(slot, total).await);
        }

        let finished_at = Utc::now();
        let next_run_at = finished_at
            + chrono::Duration::from_std(self.schedule.effective_interval())
                .unwrap_or_else(|_| chrono::Duration::days(1));
        if let Ok(mut last) = self.last_cycle_end.lock() {
            *last = Some(finished_at);
        }
        self.cycles_completed.fetch_add(1, Ordering::AcqRel);

        let report = CycleReport {
            cycle_id,
            started_at,
            finished_at,
            next_run_at,
            accounts,
        };
        info!(
            "Cycle {} finished: {} succeeded, {} failed",
            cycle_id,
            report.succeeded(),
            report.failed()
        );
        self.output().header(format!(
            "Cycle complete: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        ));
        self.output().line(
            Tone::Muted,
            format!("Next run at {}", display_timestamp(next_run_at)),
        );
        self.start_countdown();
        report
    }

    /// Replace any running countdown with a fresh one
    fn start_countdown(&self) {
        let output = self.output().clone();
        let tick = self.schedule.countdown_tick.max(MIN_PERIOD);
        let deadline = Instant::now() + self.schedule.effective_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                output.wait_until_idle().await;
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                output.countdown(remaining);
            }
        });

        if let Ok(mut slot) = self.countdown.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }
}

impl<A, G> Drop for CycleController<A, G> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.countdown.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

fn humanize_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs > 0 && secs % 3600 == 0 {
        format!("{} hours", secs / 3600)
    } else if secs > 0 && secs % 60 == 0 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{:?}", interval)
    }
}
