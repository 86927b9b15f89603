use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use image::RgbaImage;

use crate::decode::flatten_over_bg;
use crate::encode::sink::{FrameSink, SinkConfig, SinkFactory};
use crate::foundation::error::{ReelError, ReelResult};

/// Video codec, identified by its four-character container tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VideoCodec {
    /// MPEG-4 Part 2 (`mp4v`).
    #[default]
    Mp4v,
    /// H.264 via libx264 (`avc1`).
    Avc1,
}

impl VideoCodec {
    pub fn fourcc(self) -> &'static str {
        match self {
            Self::Mp4v => "mp4v",
            Self::Avc1 => "avc1",
        }
    }

    fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::Mp4v => "mpeg4",
            Self::Avc1 => "libx264",
        }
    }
}

impl std::str::FromStr for VideoCodec {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp4v" => Ok(Self::Mp4v),
            "avc1" => Ok(Self::Avc1),
            other => Err(ReelError::validation(format!(
                "unknown codec tag '{other}' (expected mp4v or avc1)"
            ))),
        }
    }
}

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// Background color used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl Default for FfmpegSinkOpts {
    fn default() -> Self {
        Self {
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw RGBA frames to its stdin.
pub struct FfmpegSink {
    out_path: PathBuf,
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<u64>,
}

impl FfmpegSink {
    pub fn new(out_path: impl Into<PathBuf>, opts: FfmpegSinkOpts) -> Self {
        Self {
            out_path: out_path.into(),
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> ReelResult<()> {
        let geom = cfg.geometry;
        if geom.width == 0 || geom.height == 0 {
            return Err(ReelError::output_stream(
                "ffmpeg sink width/height must be non-zero",
            ));
        }

        ensure_parent_dir(&self.out_path)?;
        if !self.opts.overwrite && self.out_path.exists() {
            return Err(ReelError::output_stream(format!(
                "output file '{}' already exists",
                self.out_path.display()
            )));
        }

        if !is_ffmpeg_on_path() {
            return Err(ReelError::output_stream(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        if self.opts.overwrite {
            cmd.arg("-y");
        } else {
            cmd.arg("-n");
        }

        // Input: opaque RGBA8 frames (alpha is flattened in push_frame). Odd sides are padded
        // to even because yuv420p needs them.
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &geom.to_string(),
            "-r",
            &cfg.fps.get().to_string(),
            "-i",
            "pipe:0",
            "-an",
            "-vf",
            "pad=ceil(iw/2)*2:ceil(ih/2)*2",
            "-c:v",
            cfg.codec.ffmpeg_encoder(),
            "-tag:v",
            cfg.codec.fourcc(),
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(&self.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            ReelError::output_stream(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::output_stream("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::output_stream("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; (geom.width as usize) * (geom.height as usize) * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &RgbaImage) -> ReelResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ReelError::output_stream("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(ReelError::output_stream(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        let (width, height) = frame.dimensions();
        if width != cfg.geometry.width || height != cfg.geometry.height {
            return Err(ReelError::output_stream(format!(
                "frame size mismatch: got {width}x{height}, expected {}",
                cfg.geometry
            )));
        }

        self.scratch.copy_from_slice(frame.as_raw());
        flatten_over_bg(&mut self.scratch, self.opts.bg_rgba);

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ReelError::output_stream("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&self.scratch).map_err(|e| {
            ReelError::output_stream(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn end(&mut self) -> ReelResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ReelError::output_stream("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            ReelError::output_stream(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| ReelError::output_stream("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| ReelError::output_stream(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(ReelError::output_stream(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        self.cfg = None;
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        // Abandoned mid-stream: do not leave an ffmpeg process behind.
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Creates an [`FfmpegSink`] per output path with shared options.
#[derive(Clone, Debug, Default)]
pub struct FfmpegSinkFactory {
    pub opts: FfmpegSinkOpts,
}

impl FfmpegSinkFactory {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self { opts }
    }
}

impl SinkFactory for FfmpegSinkFactory {
    fn create(&self, out_path: &Path) -> Box<dyn FrameSink> {
        Box::new(FfmpegSink::new(out_path, self.opts.clone()))
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ReelResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ReelError::output_stream(format!(
                "failed to create output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::{Fps, Geometry};

    #[test]
    fn codec_tags_parse_case_insensitively() {
        assert_eq!("MP4V".parse::<VideoCodec>().unwrap(), VideoCodec::Mp4v);
        assert_eq!("avc1".parse::<VideoCodec>().unwrap(), VideoCodec::Avc1);
        assert!("h265".parse::<VideoCodec>().is_err());
        assert_eq!(VideoCodec::default().fourcc(), "mp4v");
    }

    #[test]
    fn push_before_begin_is_an_output_error() {
        let mut sink = FfmpegSink::new("unused.mp4", FfmpegSinkOpts::default());
        let err = sink.push_frame(0, &RgbaImage::new(2, 2)).unwrap_err();
        assert!(matches!(err, ReelError::OutputStream(_)));
        assert!(sink.end().is_err());
    }

    #[test]
    fn zero_geometry_is_rejected() {
        let mut sink = FfmpegSink::new("unused.mp4", FfmpegSinkOpts::default());
        let cfg = SinkConfig {
            geometry: Geometry::new(0, 4),
            fps: Fps::DEFAULT,
            codec: VideoCodec::Mp4v,
        };
        assert!(matches!(
            sink.begin(cfg).unwrap_err(),
            ReelError::OutputStream(_)
        ));
    }
}
