//! ABOUTME: Decides each tick how the baseline absorbs the current frame
//! ABOUTME: Holds steady during short motion, drifts when quiet, re-baselines after sustained motion

use crate::{BaselineStore, IntensityFrame};
use mw_core::Result;
use serde::Serialize;
use tracing::debug;

/// Consecutive motion ticks after which the scene is re-baselined (~2 s at 10 Hz)
pub const SUSTAINED_MOTION_TICKS: u32 = 20;

/// Share of the old baseline kept when re-baselining after sustained motion
pub const RESET_KEEP_WEIGHT: f32 = 0.1;

/// Share of the old baseline kept when tracking slow drift in a quiet scene
pub const DRIFT_KEEP_WEIGHT: f32 = 0.7;

/// What happened to the baseline this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BaselineUpdate {
    /// First frame assigned as the baseline
    Seeded,
    /// Sustained motion: the current frame becomes the new normal
    Reset,
    /// No motion: baseline tracks lighting drift
    Drift,
    /// Transient motion: baseline left untouched
    Held,
}

/// Apply the baseline policy for one tick.
///
/// `motion_run_count` must already include this tick.
pub fn adapt_baseline(
    store: &mut BaselineStore,
    current: &IntensityFrame,
    motion: bool,
    motion_run_count: u32,
) -> Result<BaselineUpdate> {
    let update = if !store.is_initialized() {
        store.seed(current.clone());
        BaselineUpdate::Seeded
    } else if motion_run_count > SUSTAINED_MOTION_TICKS {
        store.blend(current, RESET_KEEP_WEIGHT)?;
        BaselineUpdate::Reset
    } else if !motion {
        store.blend(current, DRIFT_KEEP_WEIGHT)?;
        BaselineUpdate::Drift
    } else {
        BaselineUpdate::Held
    };

    debug!(?update, motion, motion_run_count, "Baseline adapted");
    Ok(update)
}
