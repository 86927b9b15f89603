use std::path::{Path, PathBuf};

use image::{RgbaImage, imageops::FilterType};

use crate::foundation::core::Geometry;

/// Why a frame candidate contributed nothing to the video.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The file could not be opened or its format sniffed.
    Unreadable(String),
    /// The file was read but did not decode as an image.
    Undecodable(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreadable(e) => write!(f, "unreadable: {e}"),
            Self::Undecodable(e) => write!(f, "undecodable: {e}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SkippedFrame {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub enum FrameOutcome {
    Decoded(RgbaImage),
    Skipped(SkipReason),
}

/// Decode one frame candidate to straight-alpha RGBA8.
pub fn decode_frame(path: &Path) -> FrameOutcome {
    let reader = match image::ImageReader::open(path).and_then(|r| r.with_guessed_format()) {
        Ok(r) => r,
        Err(e) => return FrameOutcome::Skipped(SkipReason::Unreadable(e.to_string())),
    };
    match reader.decode() {
        Ok(img) => FrameOutcome::Decoded(img.to_rgba8()),
        Err(e) => FrameOutcome::Skipped(SkipReason::Undecodable(e.to_string())),
    }
}

/// Resize `frame` to `target` when its dimensions differ. Interpolates, never crops.
pub fn conform(frame: RgbaImage, target: Geometry) -> RgbaImage {
    if Geometry::of(&frame) == target {
        return frame;
    }
    image::imageops::resize(&frame, target.width, target.height, FilterType::Triangle)
}

/// Composite straight-alpha RGBA8 over an opaque background, in place.
pub fn flatten_over_bg(rgba: &mut [u8], bg_rgba: [u8; 4]) {
    let bg = [bg_rgba[0] as u16, bg_rgba[1] as u16, bg_rgba[2] as u16];

    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            px[c] = (mul_div255(px[c] as u16, a) + mul_div255(bg[c], inv)).min(255) as u8;
        }
        px[3] = 255;
    }
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_valid_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]))
            .save(&path)
            .unwrap();

        match decode_frame(&path) {
            FrameOutcome::Decoded(img) => assert_eq!(img.dimensions(), (3, 2)),
            FrameOutcome::Skipped(r) => panic!("unexpected skip: {r}"),
        }
    }

    #[test]
    fn corrupt_and_missing_files_are_skipped_with_reason() {
        let dir = tempfile::tempdir().unwrap();
        let corrupt = dir.path().join("bad.png");
        std::fs::write(&corrupt, b"definitely not a png").unwrap();

        assert!(matches!(
            decode_frame(&corrupt),
            FrameOutcome::Skipped(SkipReason::Undecodable(_))
        ));
        assert!(matches!(
            decode_frame(&dir.path().join("gone.png")),
            FrameOutcome::Skipped(SkipReason::Unreadable(_))
        ));
    }

    #[test]
    fn conform_resizes_instead_of_cropping() {
        let img = RgbaImage::from_pixel(8, 4, image::Rgba([200, 10, 10, 255]));
        let out = conform(img, Geometry::new(4, 4));
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(out.get_pixel(3, 3).0, [200, 10, 10, 255]);

        let same = RgbaImage::new(4, 4);
        assert_eq!(conform(same, Geometry::new(4, 4)).dimensions(), (4, 4));
    }

    #[test]
    fn flatten_straight_alpha_over_black() {
        let mut px = vec![255u8, 0, 0, 128];
        flatten_over_bg(&mut px, [0, 0, 0, 255]);
        assert_eq!(px, vec![128, 0, 0, 255]);
    }

    #[test]
    fn flatten_transparent_returns_bg_and_opaque_is_identity() {
        let mut px = vec![9u8, 9, 9, 0, 1, 2, 3, 255];
        flatten_over_bg(&mut px, [10, 20, 30, 255]);
        assert_eq!(px, vec![10, 20, 30, 255, 1, 2, 3, 255]);
    }
}
