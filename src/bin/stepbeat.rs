use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stepbeat", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Overlay the step counter and captions onto a video (requires `ffmpeg` on PATH).
    Process(ProcessArgs),
    /// Print probed video metadata as JSON.
    Probe(ProbeArgs),
    /// Composite a single frame and save it as a PNG.
    Preview(PreviewArgs),
}

#[derive(Parser, Debug)]
struct ProcessArgs {
    /// Input video path.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Beats per minute.
    #[arg(long)]
    bpm: f64,

    /// First-beat offset in seconds.
    #[arg(long, default_value_t = 0.0)]
    offset: f64,

    /// Persistent title shown for the whole video.
    #[arg(long)]
    title: Option<String>,

    /// JSON file with timed captions:
    /// `[{"content": "...", "start_sec": 1.0, "end_sec": 2.5, "position": "bottom"}]`.
    #[arg(long)]
    captions: Option<PathBuf>,

    /// TTF/OTF font used for counter glyphs and captions.
    #[arg(long)]
    font: PathBuf,

    /// Composite frames within a chunk in parallel.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Frames decoded and composited per chunk.
    #[arg(long, default_value_t = 64)]
    chunk_size: usize,

    /// Overwrite output if it already exists.
    #[arg(long, default_value_t = true)]
    overwrite: bool,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Input video path.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input video path.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Frame time in seconds.
    #[arg(long, default_value_t = 0.0)]
    at: f64,

    /// Beats per minute.
    #[arg(long)]
    bpm: f64,

    /// First-beat offset in seconds.
    #[arg(long, default_value_t = 0.0)]
    offset: f64,

    /// Persistent title shown for the whole video.
    #[arg(long)]
    title: Option<String>,

    /// JSON file with timed captions.
    #[arg(long)]
    captions: Option<PathBuf>,

    /// TTF/OTF font used for counter glyphs and captions.
    #[arg(long)]
    font: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Process(args) => cmd_process(args),
        Command::Probe(args) => cmd_probe(args),
        Command::Preview(args) => cmd_preview(args),
    }
}

fn load_captions(path: Option<&PathBuf>) -> anyhow::Result<Vec<stepbeat::TimedText>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let bytes = std::fs::read(path)
        .with_context(|| format!("read captions file '{}'", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("parse captions file '{}'", path.display()))
}

fn cmd_process(args: ProcessArgs) -> anyhow::Result<()> {
    let request = stepbeat::OverlayRequest {
        beat: stepbeat::BeatSpec::new(args.bpm, args.offset)?,
        title: args.title,
        captions: load_captions(args.captions.as_ref())?,
    };
    let mut renderer = stepbeat::CpuTextRenderer::from_font_path(&args.font)?;
    let opts = stepbeat::CompositeOpts {
        parallel: args.parallel,
        chunk_size: args.chunk_size,
        threads: args.threads,
        overwrite: args.overwrite,
    };

    stepbeat::process(
        &args.in_path,
        &args.out,
        &request,
        &stepbeat::OverlayStyle::default(),
        &mut renderer,
        &opts,
    )?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let info = stepbeat::probe_video(&args.in_path)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let request = stepbeat::OverlayRequest {
        beat: stepbeat::BeatSpec::new(args.bpm, args.offset)?,
        title: args.title,
        captions: load_captions(args.captions.as_ref())?,
    };
    request.validate()?;

    let info = stepbeat::probe_video(&args.in_path)?;
    let meta = info.video_meta()?;
    let geometry = stepbeat::compute_geometry(&meta)?;
    let style = stepbeat::OverlayStyle::default();
    let cycle = stepbeat::StepCycle::bachata();

    let mut renderer = stepbeat::CpuTextRenderer::from_font_path(&args.font)?;
    let glyphs = stepbeat::GlyphCache::build(&mut renderer, &cycle, &style, &geometry);
    let elements = stepbeat::compose(
        &mut renderer,
        &geometry,
        &glyphs,
        &request.beat,
        &cycle,
        request.title.as_deref(),
        &request.captions,
        meta.duration_sec,
        &style,
    )?;

    let mut frames = stepbeat::decode_video_frames_rgba8(&info, args.at, 1)?;
    let mut frame = frames
        .pop()
        .ok_or_else(|| anyhow::anyhow!("no frame decoded at t={}", args.at))?;
    stepbeat::composite_frame(&mut frame, info.width, info.height, &elements, args.at);

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame,
        info.width,
        info.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
