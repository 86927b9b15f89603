//! pagereel turns folders of page images, or one PDF per folder, into MP4 videos.
//!
//! - [`classify`] and [`order`] find frame candidates and put them in natural filename order
//! - [`raster`] renders PDF pages into a scratch workspace
//! - [`assemble`] decodes, conforms and streams frames into a [`FrameSink`]
//! - [`batch`] runs all of that over every subfolder of a source root
#![forbid(unsafe_code)]

pub mod assemble;
pub mod batch;
pub mod classify;
pub mod decode;
pub mod encode;
mod foundation;
pub mod order;
pub mod raster;
pub mod source;

pub use crate::foundation::core::{Fps, Geometry};
pub use crate::foundation::error::{ReelError, ReelResult};

pub use crate::assemble::{AssemblyReport, assemble};
pub use crate::batch::{
    BatchConverter, BatchOpts, BatchReport, ConversionOutcome, FolderPlan, Route, Status, plan,
};
pub use crate::classify::{Classified, EntryKind, classify_dir};
pub use crate::decode::{FrameOutcome, SkipReason, SkippedFrame};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkFactory, FfmpegSinkOpts, VideoCodec};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig, SinkFactory};
pub use crate::order::{natural_cmp, order_names};
pub use crate::raster::{
    DocumentRasterizer, PageRasterizer, PopplerRasterizer, RasterizedDocument, RasterizerConfig,
    ScratchWorkspace,
};
pub use crate::source::{FrameSequence, FrameSource};
