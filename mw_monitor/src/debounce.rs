//! ABOUTME: Wake rate limiting and motion/no-motion run bookkeeping
//! ABOUTME: Pure policy over DetectorState, evaluated once per tick

use serde::Serialize;
use std::time::{Duration, Instant};

/// Consecutive quiet ticks after which a motion streak is considered over (~10 s at 10 Hz)
pub const QUIET_RESET_TICKS: u32 = 100;

/// Per-session counters, owned by the control loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectorState {
    pub motion_run_count: u32,
    pub no_motion_run_count: u32,
    pub last_wake_time: Option<Instant>,
}

/// What the loop should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    WakeNow,
    NoOp,
}

/// Update run counters for one tick and decide whether to wake
pub fn on_tick(
    motion: bool,
    now: Instant,
    wake_interval: Duration,
    state: &mut DetectorState,
) -> Action {
    if !motion {
        state.no_motion_run_count = state.no_motion_run_count.saturating_add(1);
        if state.no_motion_run_count > QUIET_RESET_TICKS {
            state.motion_run_count = 0;
        }
        return Action::NoOp;
    }

    state.motion_run_count = state.motion_run_count.saturating_add(1);
    state.no_motion_run_count = 0;

    let due = match state.last_wake_time {
        None => true,
        Some(last) => now.saturating_duration_since(last) > wake_interval,
    };
    if due {
        state.last_wake_time = Some(now);
        Action::WakeNow
    } else {
        Action::NoOp
    }
}
