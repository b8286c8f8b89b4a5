//! ABOUTME: Frame sources for the motion monitor (ffmpeg camera, image replay)
//! ABOUTME: Provides the FrameSource trait and a release-on-drop guard

use mw_core::Result;
use mw_vision::Frame;
use std::ops::{Deref, DerefMut};
use tracing::{debug, info};

pub mod camera_source;
pub mod sequence_source;

pub use camera_source::{CameraConfig, FfmpegCameraSource};
pub use sequence_source::ImageSequenceSource;

/// A blocking source of color frames with a fixed resolution for its lifetime.
///
/// Opening happens in each implementation's constructor.
pub trait FrameSource {
    /// Read the next frame; `Ok(None)` means the stream has ended
    fn read(&mut self) -> Result<Option<Frame>>;

    /// Release the underlying device or process; must be idempotent
    fn release(&mut self);

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read(&mut self) -> Result<Option<Frame>> {
        (**self).read()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Owns a frame source and releases it when dropped, on every exit path
pub struct SourceGuard<S: FrameSource> {
    source: S,
    released: bool,
}

impl<S: FrameSource> SourceGuard<S> {
    pub fn new(source: S) -> Self {
        debug!(source = %source.describe(), "Frame source guarded");
        Self {
            source,
            released: false,
        }
    }

    /// Release now instead of waiting for drop
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.release();
            info!(source = %self.source.describe(), "Frame source released");
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl<S: FrameSource> Deref for SourceGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.source
    }
}

impl<S: FrameSource> DerefMut for SourceGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: FrameSource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    struct CountingSource {
        releases: Arc<AtomicUsize>,
    }

    impl FrameSource for CountingSource {
        fn read(&mut self) -> Result<Option<Frame>> {
            Ok(None)
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let releases = Arc::new(AtomicUsize::new(0));
        {
            let _guard = SourceGuard::new(CountingSource {
                releases: Arc::clone(&releases),
            });
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_releases_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut guard = SourceGuard::new(CountingSource {
            releases: Arc::clone(&releases),
        });
        guard.release();
        assert!(guard.is_released());
        drop(guard);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_releases_during_unwind() {
        let releases = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&releases);
        let result = std::panic::catch_unwind(move || {
            let _guard = SourceGuard::new(CountingSource { releases: counter });
            panic!("tick failed");
        });
        assert!(result.is_err());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_boxed_source_delegates() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut boxed: Box<dyn FrameSource> = Box::new(CountingSource {
            releases: Arc::clone(&releases),
        });
        assert!(boxed.read().unwrap().is_none());
        boxed.release();
        assert_eq!(boxed.describe(), "counting");
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
