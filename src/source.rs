use std::path::{Path, PathBuf};

use crate::classify::classify_dir;
use crate::order::order_names;
use crate::raster::RasterizedDocument;

/// Ordered frame candidate paths. The order is fixed at construction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameSequence(Vec<PathBuf>);

impl FrameSequence {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self(paths)
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Where a folder's frames come from.
#[derive(Debug)]
pub enum FrameSource<'a> {
    /// Loose images, naturally ordered by filename.
    Folder { dir: &'a Path, reverse: bool },
    /// Rasterized pages, kept in page order.
    Document {
        doc: &'a RasterizedDocument,
        reverse: bool,
    },
}

impl FrameSource<'_> {
    pub fn sequence(&self) -> FrameSequence {
        match self {
            FrameSource::Folder { dir, reverse } => {
                let mut names = classify_dir(dir).images;
                order_names(&mut names, *reverse);
                FrameSequence(names.into_iter().map(|n| dir.join(n)).collect())
            }
            FrameSource::Document { doc, reverse } => {
                let mut pages = doc.pages().to_vec();
                if *reverse {
                    pages.reverse();
                }
                FrameSequence(pages)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::error::ReelResult;
    use crate::raster::{DocumentRasterizer, PageRasterizer, RasterizerConfig};

    fn file_names(seq: &FrameSequence) -> Vec<String> {
        seq.paths()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn folder_sequence_is_naturally_ordered_images_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["f10.png", "f9.jpg", "F1.bmp", "notes.txt", "~f0.png", "doc.pdf"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let seq = FrameSource::Folder {
            dir: dir.path(),
            reverse: false,
        }
        .sequence();
        assert_eq!(file_names(&seq), vec!["F1.bmp", "f9.jpg", "f10.png"]);

        let rev = FrameSource::Folder {
            dir: dir.path(),
            reverse: true,
        }
        .sequence();
        assert_eq!(file_names(&rev), vec!["f10.png", "f9.jpg", "F1.bmp"]);
    }

    struct NamedPages(&'static [&'static str]);

    impl PageRasterizer for NamedPages {
        fn render_pages(&self, _document: &Path, into: &Path) -> ReelResult<Vec<PathBuf>> {
            self.0
                .iter()
                .map(|n| -> ReelResult<PathBuf> {
                    let p = into.join(n);
                    std::fs::write(&p, b"x").map_err(anyhow::Error::from)?;
                    Ok(p)
                })
                .collect()
        }
    }

    #[test]
    fn document_sequence_keeps_page_order() {
        // Backend order is authoritative even when names would sort differently.
        let r = DocumentRasterizer::with_backend(
            RasterizerConfig::platform_default(),
            Box::new(NamedPages(&["z.png", "a.png", "m.png"])),
        );
        let doc = r.rasterize(Path::new("book.pdf")).unwrap();

        let seq = FrameSource::Document {
            doc: &doc,
            reverse: false,
        }
        .sequence();
        assert_eq!(
            file_names(&seq),
            vec!["page_1.png", "page_2.png", "page_3.png"]
        );

        let rev = FrameSource::Document {
            doc: &doc,
            reverse: true,
        }
        .sequence();
        assert_eq!(
            file_names(&rev),
            vec!["page_3.png", "page_2.png", "page_1.png"]
        );
    }
}
