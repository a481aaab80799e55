use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use strikecount_engine::traits::{FrameSample, FrameSource};
use thiserror::Error;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame directory not found: {0}")]
    NotFound(PathBuf),
    #[error("no image frames in {0}")]
    Empty(PathBuf),
    #[error("frame source not opened")]
    NotOpened,
    #[error("no more frames")]
    Exhausted,
    #[error("frame io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default)]
struct Cursor {
    frames: Vec<PathBuf>,
    next: usize,
}

/// Pre-recorded footage as a directory of still images, read in file-name order.
///
/// Each capture returns the next frame and then skips `stride - 1` frames, so a stride of
/// 15 over 30 fps footage samples twice per second.
#[derive(Debug)]
pub struct DirectoryFrameSource {
    dir: PathBuf,
    stride: usize,
    cursor: Mutex<Option<Cursor>>,
}

impl DirectoryFrameSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            stride: 1,
            cursor: Mutex::new(None),
        }
    }

    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lists image files in the directory, sorted by name.
    pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, FrameError> {
        if !dir.is_dir() {
            return Err(FrameError::NotFound(dir.to_path_buf()));
        }

        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            if is_image && path.is_file() {
                frames.push(path);
            }
        }
        frames.sort();

        if frames.is_empty() {
            return Err(FrameError::Empty(dir.to_path_buf()));
        }
        Ok(frames)
    }

    fn next_path(&self) -> Result<PathBuf, FrameError> {
        let mut guard = self.cursor.lock().map_err(|_| FrameError::NotOpened)?;
        let cursor = guard.as_mut().ok_or(FrameError::NotOpened)?;
        let path = cursor
            .frames
            .get(cursor.next)
            .cloned()
            .ok_or(FrameError::Exhausted)?;
        cursor.next = cursor.next.saturating_add(self.stride);
        Ok(path)
    }
}

#[async_trait]
impl FrameSource for DirectoryFrameSource {
    async fn open(&self) -> anyhow::Result<()> {
        let frames = Self::list_frames(&self.dir)?;
        log::info!(
            "opened {} frames from {} (stride {})",
            frames.len(),
            self.dir.display(),
            self.stride
        );
        let mut guard = self.cursor.lock().map_err(|_| FrameError::NotOpened)?;
        *guard = Some(Cursor { frames, next: 0 });
        Ok(())
    }

    async fn capture(&self) -> anyhow::Result<FrameSample> {
        let path = self.next_path()?;
        let bytes = tokio::fs::read(&path).await.map_err(FrameError::from)?;
        log::debug!("captured frame {}", path.display());
        Ok(FrameSample::new(bytes))
    }
}
