use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use telemetry_transform::{config, Config, ErrorMode, Profiles, TelemetrySettings, TransformResult};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// JSON-encoded batch of profiles
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the transformed batch (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overrides the config's default error mode
    #[arg(short, long)]
    error_mode: Option<ErrorMode>,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: &Cli) -> TransformResult<()> {
    let mut config = Config::from_file(&cli.config)?;
    if let Some(mode) = cli.error_mode {
        config.error_mode = mode;
    }
    config.validate()?;
    info!("config loaded.");
    debug!("config: {:?}", config);

    let processor = config.build_processor(TelemetrySettings::default())?;

    let mut batch: Profiles = config::from_file(&cli.input)?;
    debug!("read {} profiles from {:?}", batch.profile_count(), cli.input);

    let batch = processor.process(&mut batch)?;
    let json = serde_json::to_string_pretty(batch)?;
    match &cli.output {
        Some(path) => std::fs::write(path, json)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
