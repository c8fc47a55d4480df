use std::{fs, path::PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use docuflow::{
    AudioEncoding, AudioOptions, FfmpegLogLevel, FixedManualGenerator, GeneratedManual,
    ManualGenerator, MediaResource, NoOpProgress, OutlineGenerator, Pipeline, PipelineOptions,
    ProgressSink, SamplerOptions, extract_audio, sample,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  docuflow probe recording.mp4 --json\n  docuflow sample recording.mp4 --out frames --interval 1.0 --progress\n  docuflow extract-audio recording.mp4 --out narration\n  docuflow run recording.mp4 --out manual.md --manual response.json\n  docuflow completions zsh > _docuflow";

#[derive(Debug, Parser)]
#[command(
    name = "docuflow",
    version,
    about = "Turn screen recordings into step-by-step operating manuals",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args, Clone, Default)]
struct GlobalOptions {
    /// Enable debug-level logging.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar where supported.
    #[arg(long)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long)]
    overwrite: bool,

    /// FFmpeg log level (quiet, error, warning, info, debug).
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print metadata for a video resource.
    #[command(
        about = "Print resource metadata",
        visible_alias = "info",
        after_help = "Examples:\n  docuflow probe recording.mp4\n  docuflow probe recording.mp4 --json"
    )]
    Probe {
        /// Input video path.
        input: PathBuf,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Sample frames at a fixed interval into a directory.
    #[command(
        about = "Sample frames to a directory",
        after_help = "Examples:\n  docuflow sample recording.mp4 --out frames\n  docuflow sample recording.mp4 --out frames --interval 1.0 --max-height 512 --progress"
    )]
    Sample {
        /// Input video path.
        input: PathBuf,
        /// Output directory for sampled JPEG frames.
        #[arg(long)]
        out: PathBuf,
        /// Seconds between capture offsets.
        #[arg(long, default_value_t = docuflow::DEFAULT_SAMPLE_INTERVAL)]
        interval: f64,
        /// Maximum output frame height in pixels.
        #[arg(long, default_value_t = docuflow::DEFAULT_MAX_HEIGHT)]
        max_height: u32,
        /// JPEG quality as a 0-1 fraction.
        #[arg(long, default_value_t = docuflow::DEFAULT_JPEG_QUALITY)]
        quality: f32,
    },

    /// Best-effort audio capture to a file.
    #[command(
        about = "Capture the audio track",
        after_help = "Examples:\n  docuflow extract-audio recording.mp4 --out narration\n\nThe file extension is chosen from the negotiated encoding. Exits\nsuccessfully with a notice when the resource has no usable audio."
    )]
    ExtractAudio {
        /// Input video path.
        input: PathBuf,
        /// Output path without extension.
        #[arg(long)]
        out: PathBuf,
    },

    /// Run the full pipeline and export a Markdown manual.
    #[command(
        about = "Sample, capture audio, generate, and export",
        after_help = "Examples:\n  docuflow run recording.mp4 --out manual.md\n  docuflow run recording.mp4 --out manual.md --manual response.json\n\nWithout --manual an outline manual (one step per frame) is generated."
    )]
    Run {
        /// Input video path.
        input: PathBuf,
        /// Output Markdown path.
        #[arg(long)]
        out: PathBuf,
        /// Pre-generated manual JSON to attach instead of the outline.
        #[arg(long)]
        manual: Option<PathBuf>,
        /// Seconds between capture offsets.
        #[arg(long, default_value_t = docuflow::DEFAULT_SAMPLE_INTERVAL)]
        interval: f64,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Bridges sampling progress onto an indicatif bar.
struct BarProgress(ProgressBar);

impl ProgressSink for BarProgress {
    fn on_progress(&self, percent: u8) {
        self.0.set_position(percent as u64);
    }
}

fn parse_log_level(value: &str) -> Option<FfmpegLogLevel> {
    match value.to_ascii_lowercase().as_str() {
        "quiet" => Some(FfmpegLogLevel::Quiet),
        "error" => Some(FfmpegLogLevel::Error),
        "warning" | "warn" => Some(FfmpegLogLevel::Warning),
        "info" => Some(FfmpegLogLevel::Info),
        "debug" => Some(FfmpegLogLevel::Debug),
        _ => None,
    }
}

fn percent_bar() -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let bar = ProgressBar::new(100);
    let style =
        ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len}% {msg}")?;
    bar.set_style(style.progress_chars("##-"));
    Ok(bar)
}

fn ensure_writable_path(path: &PathBuf, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !overwrite {
        return Err(format!(
            "output file already exists: {} (use --overwrite)",
            path.display()
        )
        .into());
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(level) = &cli.global.log_level {
        let parsed = parse_log_level(level)
            .ok_or_else(|| format!("unknown --log-level value: {level}"))?;
        docuflow::set_ffmpeg_log_level(parsed);
    } else {
        docuflow::set_ffmpeg_log_level(FfmpegLogLevel::Error);
    }

    match cli.command {
        Commands::Probe { input, json } => {
            let resource = MediaResource::open(&input)?;
            let info = resource.info();

            if json {
                let value = json!({
                    "path": input.display().to_string(),
                    "format": info.format,
                    "duration_seconds": info.duration,
                    "width": info.width,
                    "height": info.height,
                    "has_audio": info.has_audio,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("{}: {}", "format".bold(), info.format);
                println!("{}: {:.2}s", "duration".bold(), info.duration);
                println!("{}: {}x{}", "video".bold(), info.width, info.height);
                println!(
                    "{}: {}",
                    "audio".bold(),
                    if info.has_audio { "yes" } else { "no" }
                );
            }
        }
        Commands::Sample {
            input,
            out,
            interval,
            max_height,
            quality,
        } => {
            fs::create_dir_all(&out)?;

            let resource = MediaResource::open(&input)?;
            let options = SamplerOptions::new()
                .with_interval(interval)
                .with_max_height(max_height)
                .with_jpeg_quality(quality);

            let bar = if cli.global.progress {
                Some(percent_bar()?)
            } else {
                None
            };

            let frames = match &bar {
                Some(bar) => sample(&resource, &options, &BarProgress(bar.clone()))?,
                None => sample(&resource, &options, &NoOpProgress)?,
            };

            for frame in &frames {
                let path = out.join(format!("frame_{:04}_{:.1}s.jpg", frame.index, frame.time));
                if path.exists() && !cli.global.overwrite {
                    return Err(format!(
                        "output file already exists: {} (use --overwrite)",
                        path.display()
                    )
                    .into());
                }
                fs::write(&path, &frame.image)?;
                log::debug!("saved frame {} -> {}", frame.index, path.display());
            }

            if let Some(bar) = bar {
                bar.finish_with_message("done");
            }

            println!(
                "{} {}",
                "success:".green().bold(),
                format!("Sampled {} frame(s) to {}", frames.len(), out.display()).green()
            );
        }
        Commands::ExtractAudio { input, out } => {
            let resource = MediaResource::open(&input)?;

            match extract_audio(&resource, &AudioOptions::new()) {
                Some(audio) => {
                    let extension = AudioEncoding::PREFERENCE
                        .iter()
                        .find(|encoding| encoding.mime_type() == audio.mime_type)
                        .map(|encoding| encoding.file_extension())
                        .unwrap_or("bin");
                    let path = out.with_extension(extension);
                    ensure_writable_path(&path, cli.global.overwrite)?;
                    fs::write(&path, &audio.payload)?;
                    println!(
                        "{} {} ({})",
                        "saved".green().bold(),
                        path.display(),
                        audio.mime_type
                    );
                }
                None => {
                    println!(
                        "{} no usable audio track, nothing written",
                        "notice:".yellow().bold()
                    );
                }
            }
        }
        Commands::Run {
            input,
            out,
            manual,
            interval,
        } => {
            ensure_writable_path(&out, cli.global.overwrite)?;

            let resource = MediaResource::open(&input)?;
            let options = PipelineOptions::new()
                .with_sampler(SamplerOptions::new().with_interval(interval));
            let pipeline = Pipeline::new(options);

            let generator: Box<dyn ManualGenerator> = match manual {
                Some(path) => {
                    let manual = GeneratedManual::from_json(&fs::read_to_string(path)?)?;
                    Box::new(FixedManualGenerator::new(manual))
                }
                None => Box::new(OutlineGenerator),
            };

            let bar = if cli.global.progress {
                Some(percent_bar()?)
            } else {
                None
            };

            let bundle = match &bar {
                Some(bar) => {
                    pipeline.run(&resource, generator.as_ref(), &BarProgress(bar.clone()))?
                }
                None => pipeline.run(&resource, generator.as_ref(), &NoOpProgress)?,
            };

            if let Some(bar) = bar {
                bar.finish_with_message("done");
            }

            docuflow::export::save_markdown(&out, &bundle.manual, &bundle.frames)?;

            println!(
                "{} {}",
                "success:".green().bold(),
                format!(
                    "{} step(s), {} frame(s), audio: {} -> {}",
                    bundle.manual.steps.len(),
                    bundle.frames.len(),
                    if bundle.audio.is_some() { "yes" } else { "no" },
                    out.display(),
                )
                .green()
            );
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "docuflow", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if cli.global.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, parse_log_level};
    use clap::Parser;
    use docuflow::FfmpegLogLevel;

    #[test]
    fn parse_log_level_aliases() {
        assert_eq!(parse_log_level("quiet"), Some(FfmpegLogLevel::Quiet));
        assert_eq!(parse_log_level("warn"), Some(FfmpegLogLevel::Warning));
        assert_eq!(parse_log_level("WARNING"), Some(FfmpegLogLevel::Warning));
        assert_eq!(parse_log_level("trace"), None);
    }

    #[test]
    fn verbose_flag_lands_in_global_options() {
        let cli = Cli::try_parse_from(["docuflow", "--verbose", "probe", "input.mp4"])
            .expect("parse");
        assert!(cli.global.verbose);

        let cli = Cli::try_parse_from(["docuflow", "probe", "input.mp4"]).expect("parse");
        assert!(!cli.global.verbose);
    }
}
