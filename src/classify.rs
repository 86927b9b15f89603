use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "tiff"];
pub const DOCUMENT_EXTENSIONS: [&str; 1] = ["pdf"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    Image,
    Document,
    Ignored,
}

impl EntryKind {
    pub fn of(name: impl AsRef<OsStr>) -> Self {
        let name = name.as_ref();
        if !is_visible_name(name) {
            return Self::Ignored;
        }
        let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) else {
            return Self::Ignored;
        };
        if IMAGE_EXTENSIONS.iter().any(|x| ext.eq_ignore_ascii_case(x)) {
            Self::Image
        } else if DOCUMENT_EXTENSIONS
            .iter()
            .any(|x| ext.eq_ignore_ascii_case(x))
        {
            Self::Document
        } else {
            Self::Ignored
        }
    }
}

/// Names starting with `.`, `~` or `$` are hidden, temporary or lock files.
pub fn is_visible_name(name: impl AsRef<OsStr>) -> bool {
    !name.as_ref().to_string_lossy().starts_with(['.', '~', '$'])
}

/// Entry names of one folder, partitioned by kind, in directory listing order.
///
/// Names are kept as `OsString` so entries that are not valid UTF-8 still reach the video.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classified {
    pub dir: PathBuf,
    pub images: Vec<OsString>,
    pub documents: Vec<OsString>,
    pub ignored: Vec<OsString>,
}

impl Classified {
    pub fn has_frames(&self) -> bool {
        !self.images.is_empty() || !self.documents.is_empty()
    }
}

/// Partition the files of `dir`.
///
/// A folder that cannot be listed classifies as empty rather than failing.
pub fn classify_dir(dir: &Path) -> Classified {
    let mut out = Classified {
        dir: dir.to_path_buf(),
        ..Classified::default()
    };

    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            tracing::debug!(dir = %dir.display(), error = %e, "cannot list folder, treating as empty");
            return out;
        }
    };

    for entry in read_dir.filter_map(Result::ok) {
        let name = entry.file_name();
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            out.ignored.push(name);
            continue;
        }
        match EntryKind::of(&name) {
            EntryKind::Image => out.images.push(name),
            EntryKind::Document => out.documents.push(name),
            EntryKind::Ignored => out.ignored.push(name),
        }
    }
    out
}
