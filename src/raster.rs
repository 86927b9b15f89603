//! PDF page rasterization into a scoped scratch workspace.
//!
//! Rasterization itself is delegated to a [`PageRasterizer`] backend; the default backend runs
//! poppler's `pdftoppm` from an explicitly configured location. Page files live in a
//! [`ScratchWorkspace`] that is deleted when the owning [`RasterizedDocument`] is dropped, or as
//! soon as rasterization fails.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::foundation::error::{ReelError, ReelResult};
use crate::order::natural_cmp;

/// Renders the pages of one document into a directory.
pub trait PageRasterizer {
    /// Render every page of `document` into `into`, returning the page files in page order.
    fn render_pages(&self, document: &Path, into: &Path) -> ReelResult<Vec<PathBuf>>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterizerConfig {
    /// Directory holding the rasterizer tools. `None` resolves them from `PATH`.
    pub bin_dir: Option<PathBuf>,
    pub dpi: u32,
    /// Parent of scratch workspaces. `None` uses the system temp directory.
    pub scratch_root: Option<PathBuf>,
}

impl RasterizerConfig {
    pub const DEFAULT_DPI: u32 = 200;

    /// Platform default: `/usr/bin` on Unix, `PATH` lookup elsewhere.
    pub fn platform_default() -> Self {
        let bin_dir = if cfg!(unix) {
            Some(PathBuf::from("/usr/bin"))
        } else {
            None
        };
        Self {
            bin_dir,
            dpi: Self::DEFAULT_DPI,
            scratch_root: None,
        }
    }
}

impl Default for RasterizerConfig {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Temporary directory exclusively owned by one rasterization. Deleted on drop.
#[derive(Debug)]
pub struct ScratchWorkspace {
    dir: tempfile::TempDir,
}

impl ScratchWorkspace {
    pub fn create(root: Option<&Path>) -> ReelResult<Self> {
        use anyhow::Context as _;

        let mut builder = tempfile::Builder::new();
        builder.prefix("pagereel-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root).with_context(|| {
                    format!("failed to create scratch root '{}'", root.display())
                })?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .context("failed to create scratch workspace")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Rasterized pages, in page order, kept alive together with their workspace.
#[derive(Debug)]
pub struct RasterizedDocument {
    pages: Vec<PathBuf>,
    workspace: ScratchWorkspace,
}

impl RasterizedDocument {
    pub fn pages(&self) -> &[PathBuf] {
        &self.pages
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }
}

pub struct DocumentRasterizer {
    cfg: RasterizerConfig,
    backend: Box<dyn PageRasterizer>,
}

impl DocumentRasterizer {
    /// Rasterizer backed by poppler's `pdftoppm`.
    pub fn new(cfg: RasterizerConfig) -> Self {
        let backend = Box::new(PopplerRasterizer::new(cfg.bin_dir.clone(), cfg.dpi));
        Self { cfg, backend }
    }

    pub fn with_backend(cfg: RasterizerConfig, backend: Box<dyn PageRasterizer>) -> Self {
        Self { cfg, backend }
    }

    pub fn config(&self) -> &RasterizerConfig {
        &self.cfg
    }

    /// Render `document` into a fresh workspace, pages named `page_<n>` with 1-based `n`.
    ///
    /// The backend writes into a `raw/` subdirectory and pages are moved up into the workspace
    /// root, so backend file names can never collide with the final page names.
    pub fn rasterize(&self, document: &Path) -> ReelResult<RasterizedDocument> {
        use anyhow::Context as _;

        let workspace = ScratchWorkspace::create(self.cfg.scratch_root.as_deref())?;
        let raw_dir = workspace.path().join("raw");
        std::fs::create_dir(&raw_dir).context("failed to create raw page directory")?;

        let rendered = self.backend.render_pages(document, &raw_dir)?;
        if rendered.is_empty() {
            return Err(ReelError::rasterization("No pages found in PDF"));
        }

        let mut pages = Vec::with_capacity(rendered.len());
        for (i, src) in rendered.iter().enumerate() {
            let ext = src.extension().and_then(|e| e.to_str()).unwrap_or("png");
            let dst = workspace.path().join(format!("page_{}.{ext}", i + 1));
            std::fs::rename(src, &dst).map_err(|e| {
                ReelError::rasterization(format!(
                    "failed to materialize page {}: {e}",
                    i + 1
                ))
            })?;
            pages.push(dst);
        }

        tracing::debug!(
            document = %document.display(),
            pages = pages.len(),
            workspace = %workspace.path().display(),
            "rasterized document"
        );
        Ok(RasterizedDocument { pages, workspace })
    }
}

/// Backend running `pdftoppm -png`.
#[derive(Clone, Debug)]
pub struct PopplerRasterizer {
    bin_dir: Option<PathBuf>,
    dpi: u32,
}

const RAW_PREFIX: &str = "raw";

impl PopplerRasterizer {
    pub fn new(bin_dir: Option<PathBuf>, dpi: u32) -> Self {
        Self { bin_dir, dpi }
    }

    fn program(&self) -> ReelResult<PathBuf> {
        let exe = format!("pdftoppm{}", std::env::consts::EXE_SUFFIX);
        match &self.bin_dir {
            None => Ok(PathBuf::from(exe)),
            Some(dir) => {
                let p = dir.join(exe);
                if !p.is_file() {
                    return Err(ReelError::rasterization(format!(
                        "pdftoppm not found in configured poppler path '{}'",
                        dir.display()
                    )));
                }
                Ok(p)
            }
        }
    }
}

impl PageRasterizer for PopplerRasterizer {
    fn render_pages(&self, document: &Path, into: &Path) -> ReelResult<Vec<PathBuf>> {
        let program = self.program()?;
        let out = Command::new(&program)
            .args(["-png", "-r", &self.dpi.to_string()])
            .arg(document)
            .arg(into.join(RAW_PREFIX))
            .output()
            .map_err(|e| {
                ReelError::rasterization(format!(
                    "failed to run '{}': {e}",
                    program.display()
                ))
            })?;
        if !out.status.success() {
            return Err(ReelError::rasterization(format!(
                "pdftoppm failed for '{}': {}",
                document.display(),
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        collect_raw_pages(into)
    }
}

/// `pdftoppm` writes `raw-1.png`, `raw-01.png`, ... padded to the page count's width.
fn collect_raw_pages(dir: &Path) -> ReelResult<Vec<PathBuf>> {
    use anyhow::Context as _;

    let mut names: Vec<String> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list scratch workspace '{}'", dir.display()))?
        .filter_map(|e| e.ok()?.file_name().into_string().ok())
        .filter(|n| n.starts_with(&format!("{RAW_PREFIX}-")) && n.ends_with(".png"))
        .collect();
    names.sort_by(|a, b| natural_cmp(a, b));
    Ok(names.into_iter().map(|n| dir.join(n)).collect())
}
