use airbrush::imaging::{
    ImageBuffer, ImageProcessor, PreviewRequest, RustBackend, SizeSpec, TransformResult,
};
use airbrush::{batch, config, output};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "airbrush")]
#[command(about = "Resize, crop and preview images with color normalization")]
#[command(long_about = "\
Resize, crop and preview images with color normalization

Every output is normalized to RGB: CMYK sources are converted through a
generic CMYK profile to sRGB, grayscale and Lab sources pass through with
a warning.

Size syntax (previews):
  label=N        bound the longer edge to N, keep aspect ratio
  label=WxH      center-crop to the aspect ratio, then scale to exactly WxH

Preview output for dawn.jpg with --size small=200x100:
  out/dawn-small.jpg
  out/dawn.json      {\"small\": {...}, \"original\": [1500, 1000]}

Run 'airbrush gen-config' to generate a documented airbrush.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file means stock defaults)
    #[arg(long, default_value = "airbrush.toml", global = true)]
    config: PathBuf,

    /// Log every decode and transform
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scale an image; one dimension keeps the aspect ratio, two are exact
    Resize {
        input: PathBuf,
        #[arg(long)]
        width: Option<u32>,
        #[arg(long)]
        height: Option<u32>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Cut a rectangle out of an image
    Crop {
        input: PathBuf,
        #[arg(long)]
        x: u32,
        #[arg(long)]
        y: u32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Center-crop to the target aspect ratio, then scale to exactly WxH
    CropResize {
        input: PathBuf,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Render labelled previews for each input plus a JSON manifest
    Previews {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Preview size as label=N or label=WxH (repeatable; defaults from config)
        #[arg(long = "size", value_parser = parse_size_arg)]
        sizes: Vec<(String, SizeSpec)>,
        #[arg(short, long, default_value = "previews")]
        output: PathBuf,
    },
    /// Print dimensions and colorspace
    Identify { input: PathBuf },
    /// Print a stock airbrush.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = match cli.command {
        Command::GenConfig => config::ProcessorConfig::default(),
        _ => config::load_config(&cli.config)?,
    };
    let processor = ImageProcessor::new(RustBackend::from_config(&settings));

    match cli.command {
        Command::Resize {
            input,
            width,
            height,
            output,
        } => {
            let bytes = std::fs::read(&input)?;
            let result = processor.resize(&bytes, width, height)?;
            write_transform(&input, &output, &result)?;
        }
        Command::Crop {
            input,
            x,
            y,
            width,
            height,
            output,
        } => {
            let bytes = std::fs::read(&input)?;
            let result = processor.crop(&bytes, x, y, width, height)?;
            write_transform(&input, &output, &result)?;
        }
        Command::CropResize {
            input,
            width,
            height,
            output,
        } => {
            let bytes = std::fs::read(&input)?;
            let result = processor.crop_resize(&bytes, width, height)?;
            write_transform(&input, &output, &result)?;
        }
        Command::Previews {
            inputs,
            sizes,
            output: out_dir,
        } => {
            let request = if sizes.is_empty() {
                PreviewRequest::try_from(settings.previews.sizes.clone())?
            } else {
                let mut request = PreviewRequest::new();
                for (label, spec) in sizes {
                    request.insert(label, spec)?;
                }
                request
            };

            init_thread_pool(&settings.processing);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = batch::write_previews(&processor, &inputs, &request, &out_dir, Some(tx));
            if printer.join().is_err() {
                tracing::warn!("progress printer panicked");
            }
            let events = result?;
            println!("==> {} input(s) → {}", events.len(), out_dir.display());
        }
        Command::Identify { input } => {
            let bytes = std::fs::read(&input)?;
            let buffer = processor.decode(&bytes)?;
            output::print_identify(&input, buffer.dimensions(), buffer.colorspace());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn write_transform(
    input: &Path,
    output: &Path,
    result: &TransformResult,
) -> Result<(), std::io::Error> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, &result.image)?;
    output::print_transform(input, output, result);
    Ok(())
}

/// Parse `label=N` or `label=WxH`.
fn parse_size_arg(s: &str) -> Result<(String, SizeSpec), String> {
    let (label, spec) = s
        .split_once('=')
        .ok_or_else(|| format!("expected label=N or label=WxH, got '{s}'"))?;
    let label = label.trim();
    if label.is_empty() {
        return Err(format!("missing label in '{s}'"));
    }
    Ok((label.to_string(), spec.parse()?))
}

/// `RUST_LOG` wins; otherwise `warn`, or `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
