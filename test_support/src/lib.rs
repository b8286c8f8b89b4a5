//! ABOUTME: Shared testing utilities and helper functions
//! ABOUTME: Scripted frame sources and recording wake sinks for monitor tests

use async_trait::async_trait;
use mw_capture::FrameSource;
use mw_core::{Error, Result};
use mw_vision::{
    utils::{rgb_frame_with_block, solid_rgb_frame},
    Frame,
};
use mw_wake::WakeSink;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio_util::sync::CancellationToken;

pub const TEST_WIDTH: u32 = 64;
pub const TEST_HEIGHT: u32 = 48;

/// Empty dark scene
pub fn quiet_frame() -> Frame {
    solid_rgb_frame(TEST_WIDTH, TEST_HEIGHT, [20, 20, 20])
}

/// Dark scene with a bright 20x20 block, well above the default test min_area
pub fn busy_frame() -> Frame {
    rgb_frame_with_block(TEST_WIDTH, TEST_HEIGHT, 10, 10, 20, 20, [20, 20, 20], [240, 240, 240])
}

/// Frame source that replays a fixed list, optionally failing or cancelling at the end
pub struct ScriptedFrameSource {
    frames: VecDeque<Frame>,
    fail_when_empty: bool,
    cancel_after: Option<(usize, CancellationToken)>,
    reads: usize,
    releases: Arc<AtomicUsize>,
}

impl ScriptedFrameSource {
    pub fn new<I: IntoIterator<Item = Frame>>(frames: I) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            fail_when_empty: false,
            cancel_after: None,
            reads: 0,
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Return a capture error instead of end-of-stream once the script runs out
    pub fn failing_when_empty(mut self) -> Self {
        self.fail_when_empty = true;
        self
    }

    /// Cancel `token` right after the `reads`-th frame has been handed out
    pub fn cancel_after(mut self, reads: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((reads, token));
        self
    }

    /// Shared counter of `release` calls, readable after the source is consumed
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.releases)
    }
}

impl FrameSource for ScriptedFrameSource {
    fn read(&mut self) -> Result<Option<Frame>> {
        let Some(frame) = self.frames.pop_front() else {
            if self.fail_when_empty {
                return Err(Error::Capture("scripted read failure".to_string()));
            }
            return Ok(None);
        };

        self.reads += 1;
        if let Some((after, token)) = &self.cancel_after {
            if self.reads >= *after {
                token.cancel();
            }
        }
        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// Wake sink that counts calls and can be told to fail
#[derive(Default)]
pub struct RecordingWakeSink {
    calls: AtomicUsize,
    fail: bool,
}

impl RecordingWakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WakeSink for RecordingWakeSink {
    async fn trigger(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::External("display unavailable".to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}
