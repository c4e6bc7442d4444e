//! Kalman Video Denoising CLI
//!
//! Reads headerless raw video (or a synthetic demo pattern), filters it
//! frame by frame and writes headerless raw video.

use clap::Parser;
use kalman_denoise::{
    config::{ConfigError, FileConfig},
    filter::{Device, FilterMode},
    metrics::{MetricsError, MetricsRegistry},
    pipeline::{PipelineError, StreamProcessor, StreamSummary},
    stream::{
        FrameSource, NoiseInjector, NoisySource, PixelFormat, RawVideoSink, RawVideoSource,
        SinkError, SourceError, SyntheticSource,
    },
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "kalman-denoise", version, about = "Spatio-temporal Kalman video denoiser")]
struct Args {
    /// Raw video input (`-` for stdin). Without it a synthetic pattern is used.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Raw video output.
    #[arg(short, long, default_value = "results/output.raw")]
    output: PathBuf,

    /// Frame width of the raw input.
    #[arg(long)]
    width: Option<u32>,

    /// Frame height of the raw input.
    #[arg(long)]
    height: Option<u32>,

    /// Channel layout of the raw input.
    #[arg(long, value_enum)]
    format: Option<PixelFormat>,

    /// Nominal frame rate of the raw input.
    #[arg(long)]
    fps: Option<f64>,

    /// Filter variant. Overrides `--accelerated`.
    #[arg(long, value_enum)]
    mode: Option<FilterMode>,

    /// Select the variant meant for a parallel accelerator.
    #[arg(long)]
    accelerated: bool,

    /// TOML configuration file. Command-line flags take precedence.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Add Gaussian noise with this standard deviation before filtering.
    #[arg(long, value_name = "SIGMA")]
    add_noise: Option<f32>,

    /// Seed for the noise generator.
    #[arg(long)]
    seed: Option<u64>,

    /// Number of synthetic frames when no input is given.
    #[arg(long, default_value_t = 90)]
    frames: u64,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to open input: {0}")]
    Source(#[from] SourceError),
    #[error("failed to create output: {0}")]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Kalman Denoise v{}", kalman_denoise::VERSION);

    let args = Args::parse();
    match run(&args) {
        Ok(summary) => {
            println!(
                "{} frames written to {} in {:.2}s ({:.1} fps){}",
                summary.frames_written,
                args.output.display(),
                summary.elapsed.as_secs_f64(),
                summary.fps(),
                if summary.cancelled { ", cancelled" } else { "" }
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<FileConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            FileConfig::from_file(path)?
        }
        None => FileConfig::default(),
    };

    if let Some(mode) = args.mode {
        config.filter.mode = mode;
    } else if args.accelerated {
        config.filter.mode = FilterMode::for_device(Device::Accelerated);
    }
    if let Some(width) = args.width {
        config.stream.width = width;
    }
    if let Some(height) = args.height {
        config.stream.height = height;
    }
    if let Some(format) = args.format {
        config.stream.format = format;
    }
    if let Some(fps) = args.fps {
        config.stream.fps = fps;
    }

    config.validate()?;
    Ok(config)
}

fn open_source(args: &Args, config: &FileConfig) -> Result<Box<dyn FrameSource>, CliError> {
    let stream = &config.stream;
    let source: Box<dyn FrameSource> = match &args.input {
        Some(path) => Box::new(RawVideoSource::open(path, stream.info())?),
        None => {
            info!(frames = args.frames, "No input given, using synthetic source");
            Box::new(SyntheticSource::new(
                stream.width,
                stream.height,
                stream.format,
                args.frames,
            ))
        }
    };

    Ok(match args.add_noise {
        Some(sigma) => {
            let noise = match args.seed {
                Some(seed) => NoiseInjector::with_seed(sigma, seed),
                None => NoiseInjector::new(sigma),
            };
            info!(sigma, seed = ?args.seed, "Injecting Gaussian noise");
            Box::new(NoisySource::new(source, noise))
        }
        None => source,
    })
}

fn run(args: &Args) -> Result<StreamSummary, CliError> {
    let config = load_config(args)?;
    let mut source = open_source(args, &config)?;
    let mut sink = RawVideoSink::create(&args.output, source.info())?;

    let mut processor = StreamProcessor::new(config.filter.clone())
        .with_progress_interval(config.output.progress_interval);

    if config.output.metrics_port != 0 {
        let registry = MetricsRegistry::new()?;
        start_metrics_server(config.output.metrics_port, registry.clone());
        processor = processor.with_metrics(registry);
    }

    let cancel = processor.cancel_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        cancel.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    Ok(processor.run(source.as_mut(), &mut sink)?)
}

#[cfg(feature = "metrics")]
fn start_metrics_server(port: u16, registry: MetricsRegistry) {
    use kalman_denoise::metrics::{MetricsServer, MetricsServerConfig};

    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Runtime::new() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "Failed to start metrics runtime");
                return;
            }
        };
        let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
        if let Err(e) = runtime.block_on(server.run()) {
            warn!(error = %e, "Metrics server stopped");
        }
    });
}

#[cfg(not(feature = "metrics"))]
fn start_metrics_server(port: u16, _registry: MetricsRegistry) {
    warn!(
        port,
        "metrics_port is set but the binary was built without the `metrics` feature"
    );
}
