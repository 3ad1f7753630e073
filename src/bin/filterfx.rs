use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use sha2::Digest as _;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "filterfx", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a filter to a PNG and write the result as a PNG.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Filter description JSON.
    #[arg(long)]
    filter: PathBuf,

    /// Source graphic; its size is the viewport.
    #[arg(long)]
    source: PathBuf,

    /// Optional background snapshot for BackgroundImage/BackgroundAlpha inputs.
    #[arg(long)]
    background: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Print the SHA-256 of the output pixels.
    #[arg(long, default_value_t = false)]
    digest: bool,

    /// Drop nodes that fail to validate instead of failing the whole filter.
    #[arg(long, default_value_t = false)]
    lenient: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
    }
}

fn read_raster(path: &Path) -> anyhow::Result<filterfx::RasterImage> {
    let bytes = std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    filterfx::RasterImage::decode(&bytes)
        .with_context(|| format!("decode image '{}'", path.display()))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&args.filter)
        .with_context(|| format!("read filter '{}'", args.filter.display()))?;
    let mut desc = filterfx::FilterDesc::from_json_str(&json)?;
    let assets_root = args.filter.parent().unwrap_or_else(|| Path::new("."));
    desc.load_images(assets_root)?;

    let graph = if args.lenient {
        desc.build_lenient()?
    } else {
        desc.build()?
    };
    for d in graph.dropped() {
        eprintln!("dropped node #{} '{}': {}", d.index, d.name, d.reason);
    }

    let source = read_raster(&args.source)?;
    let viewport = filterfx::Viewport::new(source.width, source.height);
    let client = filterfx::RasterGeometry::new(&source)?;

    let background = match &args.background {
        Some(path) => {
            let mut buf = read_raster(path)?.to_pixel_buffer()?;
            buf.premultiply();
            Some(buf)
        }
        None => None,
    };

    let mut filter = filterfx::Filter::new(graph)?;
    let outcome = filter.render(viewport, &client, background.as_ref())?;
    let Some(frame) = outcome.buffer() else {
        eprintln!("nothing to render: {outcome:?}");
        return Ok(());
    };

    // The PNG encoder expects straight alpha.
    let mut pixels = frame.clone();
    pixels.demultiply();
    let data = pixels.to_rgba8_vec();

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &data,
        pixels.width(),
        pixels.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    if args.digest {
        println!("{}", sha256_hex(&data));
    }
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
