//! Batch conversion of every subfolder of a source root.
//!
//! Each immediate, visible subfolder becomes one video named after the folder and written inside
//! it. A folder holding a PDF is converted from that document; otherwise its loose images are
//! used. Failures are isolated per folder: only an invalid root aborts the batch.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::assemble::{AssemblyReport, assemble};
use crate::classify::{Classified, classify_dir, is_visible_name};
use crate::encode::ffmpeg::VideoCodec;
use crate::encode::sink::SinkFactory;
use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};
use crate::order::{natural_cmp, order_names};
use crate::raster::DocumentRasterizer;
use crate::source::FrameSource;

pub const INVALID_SOURCE_DIR: &str = "Invalid source directory";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchOpts {
    pub fps: Fps,
    pub reverse: bool,
    pub codec: VideoCodec,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Result of converting one subfolder.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct ConversionOutcome {
    pub folder: String,
    pub status: Status,
    pub message: String,
    /// Output path relative to the source root; set on success only.
    #[serde(serialize_with = "lossy::opt_path")]
    pub video_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u64>,
    /// Frames that did not decode, relative to the folder (page file names for documents).
    #[serde(skip_serializing_if = "Vec::is_empty", serialize_with = "lossy::paths")]
    pub skipped: Vec<PathBuf>,
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct BatchReport {
    pub success: bool,
    pub results: Vec<ConversionOutcome>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Route {
    Document { document: String },
    Images { frames: Vec<String> },
}

/// What `run` would do for one subfolder.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct FolderPlan {
    pub folder: String,
    #[serde(flatten)]
    pub route: Route,
    #[serde(serialize_with = "lossy::path")]
    pub video_path: PathBuf,
}

pub struct BatchConverter {
    rasterizer: DocumentRasterizer,
    sinks: Box<dyn SinkFactory>,
}

impl BatchConverter {
    pub fn new(rasterizer: DocumentRasterizer, sinks: Box<dyn SinkFactory>) -> Self {
        Self { rasterizer, sinks }
    }

    /// Convert every visible subfolder of `root`, one after another.
    pub fn run(&self, root: &Path, opts: &BatchOpts) -> ReelResult<BatchReport> {
        let folders = subfolders(root)?;
        tracing::info!(root = %root.display(), folders = folders.len(), "starting batch");

        let results = folders
            .iter()
            .map(|name| self.convert_one(root, name, opts))
            .collect();
        Ok(BatchReport {
            success: true,
            results,
        })
    }

    fn convert_one(&self, root: &Path, name: &OsStr, opts: &BatchOpts) -> ConversionOutcome {
        let dir = root.join(name);
        let video_rel = video_rel_path(name);
        let folder = name.to_string_lossy().into_owned();
        match self.convert_folder(&dir, &root.join(&video_rel), opts) {
            Ok((report, unit)) => {
                tracing::info!(
                    folder = %folder,
                    frames = report.frames_written,
                    skipped = report.skipped.len(),
                    geometry = %report.geometry,
                    "created video"
                );
                let skipped = report
                    .skipped
                    .into_iter()
                    .map(|s| display_skipped(&dir, s.path))
                    .collect();
                ConversionOutcome {
                    folder,
                    status: Status::Success,
                    message: format!("Created video with {} {unit}", report.frames_written),
                    video_path: Some(video_rel),
                    frame_count: Some(report.frames_written),
                    skipped,
                }
            }
            Err(e) => {
                tracing::warn!(folder = %folder, error = %e, "conversion failed");
                ConversionOutcome {
                    folder,
                    status: Status::Error,
                    message: e.to_string(),
                    video_path: None,
                    frame_count: None,
                    skipped: Vec::new(),
                }
            }
        }
    }

    /// Convert one folder into `out_path`. Returns the report and the unit counted ("frames" or
    /// "pages").
    #[tracing::instrument(skip_all, fields(dir = %dir.display()))]
    pub fn convert_folder(
        &self,
        dir: &Path,
        out_path: &Path,
        opts: &BatchOpts,
    ) -> ReelResult<(AssemblyReport, &'static str)> {
        let classified = classify_dir(dir);
        let mut sink = self.sinks.create(out_path);

        match pick_document(&classified) {
            Some(document) => {
                // `doc` owns the scratch workspace; it is released when this arm exits.
                let doc = self.rasterizer.rasterize(&dir.join(document))?;
                let sequence = FrameSource::Document {
                    doc: &doc,
                    reverse: opts.reverse,
                }
                .sequence();
                let report = assemble(&sequence, opts.fps, opts.codec, out_path, sink.as_mut())?;
                Ok((report, "pages"))
            }
            None => {
                let sequence = FrameSource::Folder {
                    dir,
                    reverse: opts.reverse,
                }
                .sequence();
                let report = assemble(&sequence, opts.fps, opts.codec, out_path, sink.as_mut())?;
                Ok((report, "frames"))
            }
        }
    }
}

/// Describe each subfolder's route without decoding or encoding anything.
pub fn plan(root: &Path, reverse: bool) -> ReelResult<Vec<FolderPlan>> {
    Ok(subfolders(root)?
        .into_iter()
        .map(|folder| {
            let classified = classify_dir(&root.join(&folder));
            let document = pick_document(&classified).map(|d| d.to_string_lossy().into_owned());
            let route = match document {
                Some(document) => Route::Document { document },
                None => {
                    let mut frames = classified.images;
                    order_names(&mut frames, reverse);
                    Route::Images {
                        frames: frames
                            .iter()
                            .map(|f| f.to_string_lossy().into_owned())
                            .collect(),
                    }
                }
            };
            FolderPlan {
                video_path: video_rel_path(&folder),
                folder: folder.to_string_lossy().into_owned(),
                route,
            }
        })
        .collect())
}

/// `<folder>/<folder>.mp4`, relative to the source root.
pub fn video_rel_path(folder: impl AsRef<OsStr>) -> PathBuf {
    let folder = folder.as_ref();
    let mut file = folder.to_os_string();
    file.push(".mp4");
    Path::new(folder).join(file)
}

/// Skipped frames are reported relative to the folder. Rasterized pages live in a workspace
/// that is gone by the time the report is read, so they are reported by page file name.
fn display_skipped(dir: &Path, path: PathBuf) -> PathBuf {
    match path.strip_prefix(dir) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => path.file_name().map(PathBuf::from).unwrap_or(path),
    }
}

/// First document by natural name order, so the choice does not depend on listing order.
fn pick_document(classified: &Classified) -> Option<&OsStr> {
    classified
        .documents
        .iter()
        .min_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()))
        .map(OsString::as_os_str)
}

/// Visible immediate subfolders of `root`, naturally ordered.
fn subfolders(root: &Path) -> ReelResult<Vec<OsString>> {
    if !root.is_dir() {
        return Err(ReelError::validation(INVALID_SOURCE_DIR));
    }
    let read_dir = std::fs::read_dir(root).map_err(|e| {
        ReelError::validation(format!("{INVALID_SOURCE_DIR}: {e}"))
    })?;

    let mut names: Vec<OsString> = read_dir
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name())
        .filter(|n| is_visible_name(n))
        .collect();
    order_names(&mut names, false);
    Ok(names)
}

/// Path serializers that never fail on names that are not valid UTF-8.
mod lossy {
    use std::path::{Path, PathBuf};

    use serde::Serializer;

    pub fn path<S: Serializer>(p: &Path, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&p.to_string_lossy())
    }

    pub fn opt_path<S: Serializer>(p: &Option<PathBuf>, s: S) -> Result<S::Ok, S::Error> {
        match p {
            Some(p) => path(p, s),
            None => s.serialize_none(),
        }
    }

    pub fn paths<S: Serializer>(ps: &[PathBuf], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(ps.iter().map(|p| p.to_string_lossy()))
    }
}
