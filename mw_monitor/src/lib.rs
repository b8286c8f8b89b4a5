//! ABOUTME: Motion monitor control loop with debounced display wake
//! ABOUTME: Drives frame source -> vision pipeline -> wake sink at a fixed cadence

use metrics::{counter, histogram};
use mw_capture::{FrameSource, SourceGuard};
use mw_core::{MonotonicTimer, Result, SessionId};
use mw_vision::{
    adapt_baseline, detect, preprocess, BaselineStore, BaselineUpdate, Detection,
    DetectionConfig, Frame,
};
use mw_wake::WakeSink;
use serde::{Deserialize, Serialize};
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use validator::Validate;

pub mod debounce;
pub mod preview;

pub use debounce::{on_tick, Action, DetectorState, QUIET_RESET_TICKS};
pub use preview::DebugPreview;

/// Control loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MonitorConfig {
    #[validate(nested)]
    pub detection: DetectionConfig,
    /// Minimum seconds between wake triggers while motion persists
    /// 0 wakes on every motion tick
    #[validate(range(max = 86400))]
    pub wake_interval_secs: u64,
    /// Log wake intents instead of invoking the wake sink
    pub dry_run: bool,
    /// Tick period; processing time counts against it
    #[validate(range(min = 1, max = 10000))]
    pub tick_interval_ms: u64,
    /// Write an annotated frame here after every tick
    pub preview_path: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            wake_interval_secs: 10,
            dry_run: false,
            tick_interval_ms: 100,
            preview_path: None,
        }
    }
}

impl MonitorConfig {
    pub fn wake_interval(&self) -> Duration {
        Duration::from_secs(self.wake_interval_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Everything decided during one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub motion: bool,
    /// `None` on the tick that seeded the baseline
    pub detection: Option<Detection>,
    pub action: Action,
    pub baseline_update: BaselineUpdate,
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitReason {
    Cancelled,
    EndOfStream,
    SourceFailed,
}

/// Counters reported when a run ends
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub session_id: SessionId,
    pub ticks: u64,
    pub motion_ticks: u64,
    /// Ticks where the debounce controller asked for a wake
    pub wake_triggers: u64,
    /// Calls actually made to the wake sink, including the shutdown wake
    pub sink_invocations: u64,
    pub sink_failures: u64,
    /// Wakes skipped because of dry-run, including the shutdown wake
    pub dry_run_intents: u64,
    pub exit_reason: ExitReason,
}

impl RunSummary {
    fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            ticks: 0,
            motion_ticks: 0,
            wake_triggers: 0,
            sink_invocations: 0,
            sink_failures: 0,
            dry_run_intents: 0,
            exit_reason: ExitReason::EndOfStream,
        }
    }

    fn record(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        if outcome.motion {
            self.motion_ticks += 1;
        }
        if outcome.action == Action::WakeNow {
            self.wake_triggers += 1;
        }
    }
}

/// Owns the baseline and detector state for one monitoring session
pub struct MotionMonitor {
    config: MonitorConfig,
    baseline: BaselineStore,
    state: DetectorState,
    preview: Option<DebugPreview>,
}

impl MotionMonitor {
    pub fn new(config: MonitorConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| mw_core::Error::Config(format!("Monitor config invalid: {}", e)))?;
        let preview = config.preview_path.clone().map(DebugPreview::new);
        Ok(Self {
            config,
            baseline: BaselineStore::new(),
            state: DetectorState::default(),
            preview,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn baseline(&self) -> &BaselineStore {
        &self.baseline
    }

    /// Run the vision pipeline and debounce policy for one frame; no I/O
    pub fn process_frame(&mut self, frame: &Frame, now: Instant) -> Result<TickOutcome> {
        let current = preprocess(frame, self.config.detection.blur_size);

        let detection = match self.baseline.get() {
            Some(baseline) => Some(detect(&current, baseline, &self.config.detection)?),
            None => None,
        };
        let motion = detection.as_ref().map(|d| d.motion).unwrap_or(false);

        let action = on_tick(motion, now, self.config.wake_interval(), &mut self.state);
        let baseline_update = adapt_baseline(
            &mut self.baseline,
            &current,
            motion,
            self.state.motion_run_count,
        )?;

        Ok(TickOutcome {
            motion,
            detection,
            action,
            baseline_update,
        })
    }

    /// Run until `cancel` fires or the source ends, then wake the display once
    /// more and release the source.
    pub async fn run<S: FrameSource>(
        &mut self,
        source: S,
        sink: &dyn WakeSink,
        cancel: CancellationToken,
    ) -> Result<RunSummary> {
        let session_id = SessionId::new();
        let span = info_span!("monitor", session = %session_id);
        self.run_session(session_id, source, sink, cancel)
            .instrument(span)
            .await
    }

    async fn run_session<S: FrameSource>(
        &mut self,
        session_id: SessionId,
        source: S,
        sink: &dyn WakeSink,
        cancel: CancellationToken,
    ) -> Result<RunSummary> {
        let mut source = SourceGuard::new(source);
        let mut summary = RunSummary::new(session_id);

        info!(
            source = %source.describe(),
            sink = sink.name(),
            dry_run = self.config.dry_run,
            wake_interval_secs = self.config.wake_interval_secs,
            sensitivity = self.config.detection.sensitivity,
            min_area = self.config.detection.min_area,
            "Motion monitor started"
        );
        if self.config.dry_run {
            info!("Dry run: wake commands will be logged, not executed");
        }

        let result = self.tick_loop(&mut source, sink, &cancel, &mut summary).await;

        // Leave the display awake on every exit path
        self.wake(sink, &mut summary, "shutdown").await;
        source.release();

        let reason = result?;
        summary.exit_reason = reason;
        info!(
            ?reason,
            ticks = summary.ticks,
            motion_ticks = summary.motion_ticks,
            wake_triggers = summary.wake_triggers,
            sink_failures = summary.sink_failures,
            "Motion monitor stopped"
        );
        Ok(summary)
    }

    async fn tick_loop<S: FrameSource>(
        &mut self,
        source: &mut SourceGuard<S>,
        sink: &dyn WakeSink,
        cancel: &CancellationToken,
        summary: &mut RunSummary,
    ) -> Result<ExitReason> {
        loop {
            if cancel.is_cancelled() {
                info!("Stopping motion monitor");
                return Ok(ExitReason::Cancelled);
            }

            let timer = MonotonicTimer::new();
            let frame = match source.read() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    warn!("Frame source ended");
                    return Ok(ExitReason::EndOfStream);
                }
                Err(e) => {
                    error!(error = %e, "Failed to read frame");
                    return Ok(ExitReason::SourceFailed);
                }
            };

            let outcome = self.process_frame(&frame, Instant::now())?;
            summary.record(&outcome);

            if outcome.motion {
                counter!("motion_ticks_total").increment(1);
                info!(
                    largest_area = outcome.detection.as_ref().map(|d| d.largest_area()),
                    motion_run = self.state.motion_run_count,
                    "Motion detected"
                );
            }
            debug!(
                motion = outcome.motion,
                action = ?outcome.action,
                baseline = ?outcome.baseline_update,
                no_motion_run = self.state.no_motion_run_count,
                "Tick complete"
            );

            if outcome.action == Action::WakeNow {
                counter!("wake_triggers_total").increment(1);
                self.wake(sink, summary, "motion").await;
            }

            if let Some(preview) = &self.preview {
                if let Err(e) = preview.render(&frame, &outcome, self.config.detection.min_area) {
                    warn!(error = %e, path = %preview.path().display(), "Failed to render preview");
                }
            }

            histogram!("tick_duration_seconds").record(timer.elapsed().as_secs_f64());

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Stopping motion monitor");
                    return Ok(ExitReason::Cancelled);
                }
                _ = tokio::time::sleep(timer.remaining(self.config.tick_interval())) => {}
            }
        }
    }

    async fn wake(&self, sink: &dyn WakeSink, summary: &mut RunSummary, reason: &str) {
        if self.config.dry_run {
            summary.dry_run_intents += 1;
            info!(reason, at = %mw_core::now_rfc3339(), "[DRY RUN] Would wake display");
            return;
        }

        summary.sink_invocations += 1;
        if let Err(e) = sink.trigger().await {
            summary.sink_failures += 1;
            counter!("wake_failures_total").increment(1);
            warn!(error = %e, sink = sink.name(), reason, "Failed to wake display");
        }
    }
}
