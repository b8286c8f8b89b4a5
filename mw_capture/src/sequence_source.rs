//! ABOUTME: Replays a directory of still images as a frame stream
//! ABOUTME: Used for offline sensitivity tuning and deterministic end-to-end runs

use crate::FrameSource;
use mw_core::{Error, Result};
use mw_vision::Frame;
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Frames read from image files in lexical filename order
#[derive(Debug)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    pending: VecDeque<PathBuf>,
    dimensions: Option<(u32, u32)>,
}

impl ImageSequenceSource {
    /// Index the images in `dir`; fails if the directory is unreadable or holds no images
    #[instrument(skip(dir), fields(dir = %dir.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&dir).map_err(|e| {
            Error::Capture(format!("Cannot open replay directory {}: {}", dir.display(), e))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(Error::Capture(format!(
                "Replay directory {} contains no images",
                dir.display()
            )));
        }

        info!(frames = files.len(), "Replay source opened");
        Ok(Self {
            dir,
            pending: files.into(),
            dimensions: None,
        })
    }

    /// Frames not yet read
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceSource {
    fn read(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        let frame = image::open(&path)
            .map_err(|e| Error::Capture(format!("Failed to decode {}: {}", path.display(), e)))?
            .to_rgb8();

        match self.dimensions {
            None => self.dimensions = Some(frame.dimensions()),
            Some(expected) if expected != frame.dimensions() => {
                return Err(Error::Validation(format!(
                    "{} is {}x{}, expected {}x{}",
                    path.display(),
                    frame.width(),
                    frame.height(),
                    expected.0,
                    expected.1
                )));
            }
            Some(_) => {}
        }

        debug!(path = %path.display(), "Replayed frame");
        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.pending.clear();
    }

    fn describe(&self) -> String {
        format!("replay {}", self.dir.display())
    }
}
