use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pagereel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert every subfolder of SOURCE into `<sub>/<sub>.mp4` (requires `ffmpeg` on PATH).
    Convert(ConvertArgs),
    /// Print how each subfolder would be converted, without encoding anything.
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Source directory whose immediate subfolders are converted.
    source: PathBuf,

    /// Output frames per second.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    fps: u32,

    /// Reverse the frame order after sorting.
    #[arg(long)]
    reverse: bool,

    /// Video codec tag.
    #[arg(long, value_enum, default_value_t = CodecChoice::Mp4v)]
    codec: CodecChoice,

    /// Directory containing poppler's `pdftoppm` (platform default when omitted).
    #[arg(long, env = "PAGEREEL_POPPLER_PATH")]
    poppler_path: Option<PathBuf>,

    /// Resolution used when rasterizing PDF pages.
    #[arg(long, default_value_t = pagereel::RasterizerConfig::DEFAULT_DPI)]
    dpi: u32,

    /// Parent directory for temporary page images (system temp dir when omitted).
    #[arg(long, env = "PAGEREEL_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Source directory whose immediate subfolders are inspected.
    source: PathBuf,

    /// Reverse the frame order after sorting.
    #[arg(long)]
    reverse: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CodecChoice {
    Mp4v,
    Avc1,
}

/// Exit status for an invalid source directory.
const EXIT_INVALID_INPUT: u8 = 2;

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Convert(args) => cmd_convert(args),
        Command::Plan(args) => cmd_plan(args),
    };

    match result {
        Ok(json) => {
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_fatal() => {
            println!("{}", serde_json::json!({ "error": e.to_string() }));
            Ok(ExitCode::from(EXIT_INVALID_INPUT))
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_convert(args: ConvertArgs) -> pagereel::ReelResult<String> {
    let opts = pagereel::BatchOpts {
        fps: pagereel::Fps::new(args.fps)?,
        reverse: args.reverse,
        codec: match args.codec {
            CodecChoice::Mp4v => pagereel::VideoCodec::Mp4v,
            CodecChoice::Avc1 => pagereel::VideoCodec::Avc1,
        },
    };

    let mut raster_cfg = pagereel::RasterizerConfig::platform_default();
    if args.poppler_path.is_some() {
        raster_cfg.bin_dir = args.poppler_path;
    }
    raster_cfg.dpi = args.dpi;
    raster_cfg.scratch_root = args.scratch_dir;

    let converter = pagereel::BatchConverter::new(
        pagereel::DocumentRasterizer::new(raster_cfg),
        Box::new(pagereel::FfmpegSinkFactory::default()),
    );
    let report = converter.run(&args.source, &opts)?;

    let failed = report.results.iter().filter(|r| !r.is_success()).count();
    tracing::info!(folders = report.results.len(), failed, "batch finished");
    to_json(&report, args.pretty)
}

fn cmd_plan(args: PlanArgs) -> pagereel::ReelResult<String> {
    let plan = pagereel::plan(&args.source, args.reverse)?;
    to_json(&plan, true)
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> pagereel::ReelResult<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("serialize report")?;
    Ok(json)
}
