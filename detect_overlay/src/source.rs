//! Frame source replaying still images.
//!
use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use common::{Frame, FrameSource, SourceError};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Plays back a fixed sequence of frames, once or over and over again.
pub struct StillSource {
    frames: Vec<Frame>,
    next: usize,
    repeat: bool,
}

impl StillSource {
    pub fn new(frames: Vec<Frame>, repeat: bool) -> Self {
        Self {
            frames,
            next: 0,
            repeat,
        }
    }

    /// Load all images of a directory, in the order of their file names.
    pub fn from_dir(dir: impl AsRef<Path>, repeat: bool) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let mut paths = vec![];
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| {
                    IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                });
            if is_image {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(SourceError::Unavailable(format!(
                "no images found in {}",
                dir.display()
            )));
        }

        let frames = paths
            .iter()
            .map(|path| {
                log::debug!("Loading {}", path.display());
                Ok(Arc::new(image::open(path)?.to_rgb8()))
            })
            .collect::<Result<Vec<Frame>, SourceError>>()?;
        log::info!("Loaded {} frames from {}", frames.len(), dir.display());

        Ok(Self::new(frames, repeat))
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[async_trait]
impl FrameSource for StillSource {
    async fn current_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.next >= self.frames.len() {
            if !self.repeat || self.frames.is_empty() {
                return Ok(None);
            }
            self.next = 0;
        }

        let frame = Arc::clone(&self.frames[self.next]);
        self.next += 1;
        Ok(Some(frame))
    }
}

/// Hands out a frame read ahead of time, then keeps reading from the wrapped source.
pub struct Primed<S> {
    first: Option<Frame>,
    inner: S,
}

impl<S: FrameSource> Primed<S> {
    /// Read the first frame of `inner`, returns `None` if it ends right away.
    pub async fn read_first(mut inner: S) -> Result<Option<(Self, Frame)>, SourceError> {
        Ok(inner.current_frame().await?.map(|frame| {
            let first = Some(Arc::clone(&frame));
            (Self { first, inner }, frame)
        }))
    }
}

#[async_trait]
impl<S: FrameSource> FrameSource for Primed<S> {
    async fn current_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        match self.first.take() {
            Some(frame) => Ok(Some(frame)),
            None => self.inner.current_frame().await,
        }
    }
}
