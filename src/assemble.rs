//! Two-pass video assembly.
//!
//! The first pass pins the canonical geometry from the first frame that decodes. The second pass
//! re-scans the whole sequence, conforms every decodable frame to that geometry and pushes it to
//! the sink. Frames that fail to decode are recorded and skipped; they never abort the run.

use std::path::Path;

use crate::decode::{FrameOutcome, SkippedFrame, conform, decode_frame};
use crate::encode::ffmpeg::VideoCodec;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Fps, Geometry};
use crate::foundation::error::{ReelError, ReelResult};
use crate::source::FrameSequence;

pub const NO_VALID_IMAGES: &str = "No valid images found";
pub const NO_READABLE_IMAGES: &str = "Could not read any images";

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct AssemblyReport {
    pub frames_written: u64,
    pub geometry: Geometry,
    pub skipped: Vec<SkippedFrame>,
}

/// Pin the canonical geometry: dimensions of the first frame that decodes.
pub fn canonical_geometry(sequence: &FrameSequence) -> Option<Geometry> {
    sequence
        .paths()
        .iter()
        .find_map(|path| match decode_frame(path) {
            FrameOutcome::Decoded(img) => Some(Geometry::of(&img)),
            FrameOutcome::Skipped(_) => None,
        })
}

/// Encode `sequence` into `sink`, which writes `out_path`.
///
/// `out_path` is only touched on failure: a partially written file is removed once the sink has
/// been opened and then fails.
pub fn assemble(
    sequence: &FrameSequence,
    fps: Fps,
    codec: VideoCodec,
    out_path: &Path,
    sink: &mut dyn FrameSink,
) -> ReelResult<AssemblyReport> {
    if sequence.is_empty() {
        return Err(ReelError::no_frames(NO_VALID_IMAGES));
    }

    let geometry =
        canonical_geometry(sequence).ok_or_else(|| ReelError::no_frames(NO_READABLE_IMAGES))?;

    sink.begin(SinkConfig {
        geometry,
        fps,
        codec,
    })?;

    match write_frames(sequence, geometry, sink) {
        Ok((frames_written, skipped)) => Ok(AssemblyReport {
            frames_written,
            geometry,
            skipped,
        }),
        Err(e) => {
            discard_partial_output(out_path);
            Err(e)
        }
    }
}

fn write_frames(
    sequence: &FrameSequence,
    geometry: Geometry,
    sink: &mut dyn FrameSink,
) -> ReelResult<(u64, Vec<SkippedFrame>)> {
    let mut written = 0u64;
    let mut skipped = Vec::new();

    for path in sequence.paths() {
        match decode_frame(path) {
            FrameOutcome::Decoded(img) => {
                let frame = conform(img, geometry);
                sink.push_frame(written, &frame)?;
                written += 1;
            }
            FrameOutcome::Skipped(reason) => {
                tracing::debug!(path = %path.display(), %reason, "skipping frame");
                skipped.push(SkippedFrame {
                    path: path.clone(),
                    reason,
                });
            }
        }
    }

    sink.end()?;
    Ok((written, skipped))
}

fn discard_partial_output(out_path: &Path) {
    match std::fs::remove_file(out_path) {
        Ok(()) => tracing::debug!(path = %out_path.display(), "removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %out_path.display(), error = %e, "failed to remove partial output")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::decode::SkipReason;
    use crate::encode::sink::InMemorySink;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32, rgba: [u8; 4]) -> PathBuf {
        let p = dir.join(name);
        RgbaImage::from_pixel(w, h, Rgba(rgba)).save(&p).unwrap();
        p
    }

    fn write_junk(dir: &Path, name: &str) -> PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, b"not an image").unwrap();
        p
    }

    fn run(seq: &FrameSequence, sink: &mut InMemorySink) -> ReelResult<AssemblyReport> {
        assemble(
            seq,
            Fps::DEFAULT,
            VideoCodec::Mp4v,
            Path::new("unused.mp4"),
            sink,
        )
    }

    #[test]
    fn empty_sequence_fails_before_opening_sink() {
        let mut sink = InMemorySink::new();
        let err = run(&FrameSequence::default(), &mut sink).unwrap_err();
        assert_eq!(err.to_string(), NO_VALID_IMAGES);
        assert!(sink.config().is_none());
    }

    #[test]
    fn nothing_decodable_fails_before_opening_sink() {
        let dir = tempfile::tempdir().unwrap();
        let seq = FrameSequence::new(vec![
            write_junk(dir.path(), "a.png"),
            write_junk(dir.path(), "b.png"),
        ]);
        let mut sink = InMemorySink::new();
        let err = run(&seq, &mut sink).unwrap_err();
        assert!(matches!(err, ReelError::NoFrames(_)));
        assert_eq!(err.to_string(), NO_READABLE_IMAGES);
        assert!(sink.config().is_none());
    }

    #[test]
    fn corrupt_frame_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let seq = FrameSequence::new(vec![
            write_junk(dir.path(), "0.png"),
            write_png(dir.path(), "1.png", 4, 2, [255, 0, 0, 255]),
            write_png(dir.path(), "2.png", 4, 2, [0, 255, 0, 255]),
        ]);
        let mut sink = InMemorySink::new();
        let report = run(&seq, &mut sink).unwrap();

        assert_eq!(report.frames_written, 2);
        assert_eq!(report.geometry, Geometry::new(4, 2));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, seq.paths()[0]);
        assert!(matches!(
            report.skipped[0].reason,
            SkipReason::Undecodable(_)
        ));
        assert_eq!(sink.frames().len(), 2);
        assert_eq!(sink.frames()[0].1.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert!(sink.is_finished());
    }

    #[test]
    fn mismatched_frames_are_resized_to_first_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let seq = FrameSequence::new(vec![
            write_png(dir.path(), "a.png", 6, 4, [1, 1, 1, 255]),
            write_png(dir.path(), "b.png", 12, 2, [2, 2, 2, 255]),
            write_png(dir.path(), "c.png", 3, 3, [3, 3, 3, 255]),
        ]);
        let mut sink = InMemorySink::new();
        let report = run(&seq, &mut sink).unwrap();

        assert_eq!(report.frames_written, 3);
        assert_eq!(report.geometry, Geometry::new(6, 4));
        assert_eq!(sink.config().unwrap().geometry, Geometry::new(6, 4));
        for (i, (idx, frame)) in sink.frames().iter().enumerate() {
            assert_eq!(*idx, i as u64);
            assert_eq!(frame.dimensions(), (6, 4));
        }
    }

    #[test]
    fn single_decodable_frame_still_produces_video() {
        let dir = tempfile::tempdir().unwrap();
        let seq = FrameSequence::new(vec![write_png(dir.path(), "only.png", 2, 2, [9, 9, 9, 255])]);
        let mut sink = InMemorySink::new();
        let report = run(&seq, &mut sink).unwrap();
        assert_eq!(report.frames_written, 1);
        assert!(report.skipped.is_empty());
    }

    struct RefusingSink;

    impl FrameSink for RefusingSink {
        fn begin(&mut self, _cfg: SinkConfig) -> ReelResult<()> {
            Err(ReelError::output_stream("codec unavailable"))
        }
        fn push_frame(&mut self, _idx: u64, _frame: &RgbaImage) -> ReelResult<()> {
            unreachable!("begin failed")
        }
        fn end(&mut self) -> ReelResult<()> {
            unreachable!("begin failed")
        }
    }

    #[test]
    fn sink_open_failure_is_output_stream_error() {
        let dir = tempfile::tempdir().unwrap();
        let seq = FrameSequence::new(vec![write_png(dir.path(), "a.png", 2, 2, [0, 0, 0, 255])]);
        let err = assemble(
            &seq,
            Fps::DEFAULT,
            VideoCodec::Mp4v,
            &dir.path().join("out.mp4"),
            &mut RefusingSink,
        )
        .unwrap_err();
        assert!(matches!(err, ReelError::OutputStream(_)));
        assert!(err.to_string().starts_with("Could not create video file"));
    }

    /// Writes a file on `begin`, then breaks on the second frame.
    struct BrokenPipeSink {
        out: PathBuf,
    }

    impl FrameSink for BrokenPipeSink {
        fn begin(&mut self, _cfg: SinkConfig) -> ReelResult<()> {
            std::fs::write(&self.out, b"partial").map_err(anyhow::Error::from)?;
            Ok(())
        }
        fn push_frame(&mut self, idx: u64, _frame: &RgbaImage) -> ReelResult<()> {
            if idx == 1 {
                return Err(ReelError::output_stream("broken pipe"));
            }
            Ok(())
        }
        fn end(&mut self) -> ReelResult<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.mp4");
        let seq = FrameSequence::new(vec![
            write_png(dir.path(), "a.png", 2, 2, [0, 0, 0, 255]),
            write_png(dir.path(), "b.png", 2, 2, [0, 0, 0, 255]),
        ]);
        let mut sink = BrokenPipeSink { out: out.clone() };
        let err = assemble(&seq, Fps::DEFAULT, VideoCodec::Mp4v, &out, &mut sink).unwrap_err();
        assert!(matches!(err, ReelError::OutputStream(_)));
        assert!(!out.exists());
    }
}
