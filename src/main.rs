use clap::{Parser, Subcommand};
use snapscale::batch::{self, PendingSource};
use snapscale::config::{self, ConfigOverrides, ToolConfig};
use snapscale::estimate::{FormulaEstimator, estimate_or_fallback};
use snapscale::imaging::{
    DimensionChange, ImageBackend, OutputFormat, QualityPreset, ResizeMode, ResizeSettings,
    RustBackend, mime_from_file_name,
};
use snapscale::output;
use snapscale::session::EditingSession;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snapscale")]
#[command(about = "Resize, adjust and re-encode photos")]
#[command(long_about = "\
Resize, adjust and re-encode photos

Every input goes through the same settings: scale (by percentage or to a
width / height), color filters, rotation and flips, then an encode at a
quality preset. For JPEG and WebP output a target file size can be given
instead; quality is then searched until the output is close to it.

Outputs are named <stem>-<width>x<height>.<ext>:

  snapscale resize beach.jpg --percentage 50 --out small/
  small/beach-400x300.jpeg

A failing image is reported and skipped; the rest of the batch continues.

Run 'snapscale gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Log debug detail to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Per-run settings on top of config.toml.
#[derive(clap::Args, Clone)]
struct SettingsArgs {
    /// config.toml to start from
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output width in pixels (switches to dimensions mode)
    #[arg(long)]
    width: Option<u32>,

    /// Output height in pixels (switches to dimensions mode)
    #[arg(long)]
    height: Option<u32>,

    /// Scale in percent (switches to percentage mode)
    #[arg(long, short)]
    percentage: Option<u32>,

    /// Use width and height as given instead of keeping each image's ratio
    #[arg(long)]
    unlock_aspect_ratio: bool,

    /// Quality preset
    #[arg(long, short, value_enum)]
    quality: Option<QualityPreset>,

    /// Output format (default: PNG stays PNG, everything else becomes JPEG)
    #[arg(long, short, value_enum)]
    format: Option<OutputFormat>,

    /// Seek this output size in KB (JPEG and WebP only)
    #[arg(long, short = 't')]
    target_kb: Option<f64>,

    /// Brightness, -100..100
    #[arg(long, allow_hyphen_values = true)]
    brightness: Option<i32>,

    /// Contrast, -100..100
    #[arg(long, allow_hyphen_values = true)]
    contrast: Option<i32>,

    /// Saturation, -100..100
    #[arg(long, allow_hyphen_values = true)]
    saturation: Option<i32>,

    /// Clockwise rotation in degrees
    #[arg(long, allow_hyphen_values = true)]
    rotate: Option<f64>,

    /// Mirror left to right
    #[arg(long)]
    flip_horizontal: bool,

    /// Mirror top to bottom
    #[arg(long)]
    flip_vertical: bool,
}

impl SettingsArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            width: self.width,
            height: self.height,
            percentage: self.percentage,
            unlock_aspect_ratio: self.unlock_aspect_ratio,
            quality: self.quality,
            format: self.format,
            target_size_kb: self.target_kb,
            brightness: self.brightness,
            contrast: self.contrast,
            saturation: self.saturation,
            rotation: self.rotate,
            flip_horizontal: self.flip_horizontal,
            flip_vertical: self.flip_vertical,
        }
    }

    /// Config file (or defaults) with the flags applied, validated.
    fn resolve(&self) -> Result<ToolConfig, config::ConfigError> {
        let mut tool_config = match &self.config {
            Some(path) => config::load_config(path)?,
            None => ToolConfig::default(),
        };
        tool_config.apply_overrides(&self.overrides());
        tool_config.validate()?;
        Ok(tool_config)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Resize and re-encode images into an output directory
    Resize {
        /// Images to process, in order
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (created if missing)
        #[arg(long, short, default_value = "resized")]
        out: PathBuf,

        /// Also write a JSON report of the run
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Show the estimated output size for an image or a width x height
    Estimate {
        /// Image whose intrinsic size the edits apply to
        image: Option<PathBuf>,

        /// Output width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Output height in pixels
        #[arg(long)]
        height: Option<u32>,

        /// Scale in percent (needs an image)
        #[arg(long, short)]
        percentage: Option<u32>,

        /// Quality preset
        #[arg(long, short, value_enum, default_value_t)]
        quality: QualityPreset,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "snapscale=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Resize {
            inputs,
            out,
            report,
            settings,
        } => {
            let resize_settings = settings.resolve()?.to_settings();
            let sources: Vec<PendingSource> =
                inputs.into_iter().map(PendingSource::from_path).collect();

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = batch::run_to_directory(
                &RustBackend::new(),
                sources,
                &resize_settings,
                &out,
                Some(tx),
            );
            printer.join().map_err(|_| "output thread panicked")?;
            let run = result?;

            output::print_summary(&run);
            if let Some(path) = report {
                std::fs::write(&path, output::report_json(&run)?)?;
            }
            if !run.all_succeeded() {
                let missing = run.failed() + run.export_failures();
                return Err(format!("{missing} of {} images not written", run.total()).into());
            }
        }
        Command::Estimate {
            image,
            width,
            height,
            percentage,
            quality,
        } => {
            let (w, h, estimate) = match image {
                Some(path) => {
                    let bytes = std::fs::read(&path)?;
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    let backend = RustBackend::new();
                    let source = backend.decode(&bytes, mime_from_file_name(&name), &name)?;

                    let mut session = EditingSession::new(ResizeSettings::default());
                    session.set_active(source);
                    session.set_quality(quality);
                    if let Some(p) = percentage {
                        session.set_mode(ResizeMode::Percentage);
                        session.apply(DimensionChange::Percentage(p.into()))?;
                    }
                    if width.is_some() || height.is_some() {
                        session.set_mode(ResizeMode::Dimensions);
                    }
                    if let Some(w) = width {
                        session.apply(DimensionChange::Width(w.into()))?;
                    }
                    if let Some(h) = height {
                        session.apply(DimensionChange::Height(h.into()))?;
                    }
                    let state = session.dimensions();
                    let estimate = session
                        .refresh_estimate(&FormulaEstimator)
                        .ok_or("no estimate for the loaded image")?;
                    (state.width, state.height, estimate)
                }
                None => {
                    let (Some(w), Some(h)) = (width, height) else {
                        return Err("give an image, or both --width and --height".into());
                    };
                    let estimate =
                        estimate_or_fallback(&FormulaEstimator, w.into(), h.into(), quality);
                    (w, h, estimate)
                }
            };
            println!("{}", output::format_estimate(w, h, quality, &estimate));
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
