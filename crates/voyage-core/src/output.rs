//! Console output arbiter
//!
//! All user-facing console writes go through one [`OutputArbiter`]. Remote
//! calls open an indicator scope ([`IndicatorGuard`]); while any scope is open
//! the countdown repaint is held back, so progress lines and the countdown
//! never interleave. The scope is released on drop, whatever the exit path.

use chrono::{DateTime, FixedOffset, Utc};
use crossterm::cursor::MoveToColumn;
use crossterm::style::{style, Color, Stylize};
use crossterm::terminal::{Clear, ClearType};
use crossterm::QueueableCommand;
use std::io::{IsTerminal, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

/// Longest reply preview shown on the console
pub const PREVIEW_CHARS: usize = 80;

/// Total time spent on the typed-output animation
const TYPE_ANIMATION: Duration = Duration::from_millis(200);

/// Offset used for console timestamps (Asia/Jakarta, no DST)
const DISPLAY_OFFSET_SECS: i32 = 7 * 3600;

const PROGRESS_BAR_WIDTH: usize = 30;

/// Colour role of a console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Error,
    Warning,
    Detail,
    Muted,
    Header,
    Accent,
}

impl Tone {
    fn color(self) -> Color {
        match self {
            Tone::Info => Color::Cyan,
            Tone::Success => Color::Green,
            Tone::Error => Color::Red,
            Tone::Warning => Color::Yellow,
            Tone::Detail => Color::White,
            Tone::Muted => Color::DarkGrey,
            Tone::Header => Color::Blue,
            Tone::Accent => Color::Magenta,
        }
    }
}

struct Sink {
    writer: Box<dyn Write + Send>,
    /// The countdown left an unterminated line behind
    dirty_line: bool,
}

struct Inner {
    sink: Mutex<Sink>,
    styled: bool,
    active: watch::Sender<usize>,
}

/// Single owner of console output
#[derive(Clone)]
pub struct OutputArbiter {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for OutputArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputArbiter")
            .field("styled", &self.inner.styled)
            .field("active_indicators", &self.active_indicators())
            .finish()
    }
}

impl OutputArbiter {
    /// Arbiter over an arbitrary writer
    pub fn new(writer: Box<dyn Write + Send>, styled: bool) -> Self {
        let (active, _) = watch::channel(0usize);
        Self {
            inner: Arc::new(Inner {
                sink: Mutex::new(Sink {
                    writer,
                    dirty_line: false,
                }),
                styled,
                active,
            }),
        }
    }

    /// Arbiter over stdout, coloured when stdout is a terminal
    pub fn stdout() -> Self {
        let styled = std::io::stdout().is_terminal();
        Self::new(Box::new(std::io::stdout()), styled)
    }

    /// Unstyled arbiter writing into a shared buffer
    pub fn in_memory() -> (Self, OutputBuffer) {
        let buffer = OutputBuffer::default();
        let arbiter = Self::new(Box::new(buffer.clone()), false);
        (arbiter, buffer)
    }

    fn sink(&self) -> MutexGuard<'_, Sink> {
        // A panic mid-write leaves nothing worth protecting
        self.inner.sink.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn paint(&self, tone: Tone, text: &str) -> String {
        if self.inner.styled {
            format!("{}", style(text).with(tone.color()))
        } else {
            text.to_string()
        }
    }

    fn settle_line(&self, sink: &mut Sink) {
        if !sink.dirty_line {
            return;
        }
        if self.inner.styled {
            let _ = sink.writer.queue(MoveToColumn(0));
            let _ = sink.writer.queue(Clear(ClearType::CurrentLine));
        } else {
            let _ = sink.writer.write_all(b"\n");
        }
        sink.dirty_line = false;
    }

    /// Write one full line
    pub fn line(&self, tone: Tone, text: impl AsRef<str>) {
        let painted = self.paint(tone, text.as_ref());
        let mut sink = self.sink();
        self.settle_line(&mut sink);
        let _ = writeln!(sink.writer, "{}", painted);
        let _ = sink.writer.flush();
    }

    /// Section header, e.g. the per-account banner
    pub fn header(&self, text: impl AsRef<str>) {
        self.line(Tone::Header, text);
    }

    /// Write text without a line break
    fn fragment(&self, tone: Tone, text: &str) {
        let painted = self.paint(tone, text);
        let mut sink = self.sink();
        self.settle_line(&mut sink);
        let _ = write!(sink.writer, "{}", painted);
        let _ = sink.writer.flush();
    }

    /// Open an indicator scope; countdown output is held back until it drops
    pub fn indicator(&self, label: impl Into<String>) -> IndicatorGuard {
        self.inner.active.send_modify(|n| *n += 1);
        let guard = IndicatorGuard {
            output: self.clone(),
        };
        guard.show(&label.into());
        guard
    }

    /// Number of open indicator scopes
    pub fn active_indicators(&self) -> usize {
        *self.inner.active.borrow()
    }

    /// Whether countdown output is currently held back
    pub fn is_suppressed(&self) -> bool {
        self.active_indicators() > 0
    }

    /// Resolve once no indicator scope is open
    pub async fn wait_until_idle(&self) {
        let mut rx = self.inner.active.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|active| *active == 0).await;
    }

    /// Repaint the countdown line; returns `false` if held back by an indicator
    pub fn countdown(&self, remaining: Duration) -> bool {
        if self.is_suppressed() {
            return false;
        }
        let text = format!(" ┊ ⏳ Waiting Next Loop: {}", format_countdown(remaining));
        let painted = self.paint(Tone::Info, &text);
        let mut sink = self.sink();
        if self.inner.styled {
            let _ = sink.writer.queue(MoveToColumn(0));
            let _ = sink.writer.queue(Clear(ClearType::CurrentLine));
        } else if sink.dirty_line {
            let _ = sink.writer.write_all(b"\n");
        }
        let _ = write!(sink.writer, "{}", painted);
        let _ = sink.writer.flush();
        sink.dirty_line = true;
        true
    }

    /// Show a generated reply, typed out character by character unless `animate` is off
    pub async fn type_text(&self, text: &str, animate: bool) {
        if self.is_suppressed() {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        let preview = preview(text);

        if !animate {
            self.line(Tone::Success, format!(" ┊ │ {}", preview));
            return;
        }

        self.line(Tone::Success, " ┊ ┌── Response Chat API ──");
        self.fragment(Tone::Success, " ┊ │ ");
        let count = preview.chars().count().max(1) as u32;
        let step = TYPE_ANIMATION / count;
        let mut buf = [0u8; 4];
        for ch in preview.chars() {
            self.fragment(Tone::Success, ch.encode_utf8(&mut buf));
            tokio::time::sleep(step).await;
        }
        self.fragment(Tone::Success, "\n");
        self.line(Tone::Success, " ┊ └──");
    }
}

/// Open indicator scope returned by [`OutputArbiter::indicator`]
pub struct IndicatorGuard {
    output: OutputArbiter,
}

impl IndicatorGuard {
    fn show(&self, label: &str) {
        self.output.line(Tone::Info, format!(" ┊ → {}", label));
    }

    /// Replace the indicator label, e.g. with a retry counter
    pub fn update(&self, label: impl AsRef<str>) {
        self.show(label.as_ref());
    }

    /// Report success; the scope stays open until the guard drops
    pub fn succeed(&self, message: impl AsRef<str>) {
        self.output
            .line(Tone::Success, format!(" ┊ ✓ {}", message.as_ref()));
    }

    /// Report failure; the scope stays open until the guard drops
    pub fn fail(&self, message: impl AsRef<str>) {
        self.output
            .line(Tone::Error, format!(" ┊ ✗ {}", message.as_ref()));
    }
}

impl Drop for IndicatorGuard {
    fn drop(&mut self) {
        self.output
            .inner
            .active
            .send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Shared in-memory writer, used to capture console output
#[derive(Clone, Default)]
pub struct OutputBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl OutputBuffer {
    /// Everything written so far
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Reply text cut to [`PREVIEW_CHARS`]
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// `HH:MM:SS`, hours not wrapped at 24
pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    )
}

/// `[████      2/5]` style progress bar
pub fn progress_bar(current: usize, total: usize) -> String {
    let total = total.max(1);
    let filled = ((current as f64 / total as f64) * PROGRESS_BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(PROGRESS_BAR_WIDTH);
    format!(
        "[{}{} {}/{}]",
        "█".repeat(filled),
        " ".repeat(PROGRESS_BAR_WIDTH - filled),
        current,
        total
    )
}

/// Console timestamp, `D/M/YYYY, HH:MM:SS` in UTC+7
pub fn display_timestamp(now: DateTime<Utc>) -> String {
    const FORMAT: &str = "%-d/%-m/%Y, %H:%M:%S";
    match FixedOffset::east_opt(DISPLAY_OFFSET_SECS) {
        Some(offset) => now.with_timezone(&offset).format(FORMAT).to_string(),
        None => now.format(FORMAT).to_string(),
    }
}
