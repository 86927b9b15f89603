use std::path::Path;

use image::RgbaImage;

use crate::encode::ffmpeg::VideoCodec;
use crate::foundation::core::{Fps, Geometry};
use crate::foundation::error::ReelResult;

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    /// Canonical geometry; every pushed frame has exactly these dimensions.
    pub geometry: Geometry,
    pub fps: Fps,
    pub codec: VideoCodec,
}

/// Sink contract for consuming frames in sequence order.
///
/// Ordering contract: `push_frame` is called with strictly increasing `idx`, starting at 0.
pub trait FrameSink {
    /// Open the output. Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()>;
    /// Push one frame of the canonical geometry.
    fn push_frame(&mut self, idx: u64, frame: &RgbaImage) -> ReelResult<()>;
    /// Finalize the output. Called once after the last frame.
    fn end(&mut self) -> ReelResult<()>;
}

/// Creates one sink per output video.
pub trait SinkFactory {
    fn create(&self, out_path: &Path) -> Box<dyn FrameSink>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(u64, RgbaImage)>,
    finished: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn frames(&self) -> &[(u64, RgbaImage)] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &RgbaImage) -> ReelResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        self.finished = true;
        Ok(())
    }
}
