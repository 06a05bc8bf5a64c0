use std::path::PathBuf;

use anyhow::{Context, Result};
use bridgetape::config::Config;
use bridgetape::replay::BehaviorCache;
use bridgetape::transform::{syntax, Transformer, Variant};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "bridgetape")]
#[command(about = "Record and replay tagged boundary functions", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./bridgetape.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a behavior cache from trace streams
    Cache {
        /// Where to write the cache
        #[arg(short, long)]
        output: PathBuf,

        /// Trace streams; later streams win on colliding runs
        #[arg(required = true)]
        traces: Vec<PathBuf>,
    },
    /// Rewrite tagged declarations in a source file
    Instrument {
        /// Hook to call from the rewritten declarations
        #[arg(short, long, value_enum, default_value_t = ModeArg::Trace)]
        mode: ModeArg,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Trace,
    Mock,
}

impl From<ModeArg> for Variant {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Trace => Variant::Trace,
            ModeArg::Mock => Variant::Mock,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };

    match cli.command {
        Commands::Cache { output, traces } => {
            let cache = BehaviorCache::from_streams(&traces)
                .context("Failed to build behavior cache")?;
            cache
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "Wrote {} behaviors from {} trace stream(s) to {}",
                cache.len(),
                traces.len(),
                output.display()
            );
        }
        Commands::Instrument { mode, output, file } => {
            let transformer = Transformer::new(config.transform_options(mode.into()))?;
            let result = transformer
                .instrument(&file)
                .with_context(|| format!("Failed to instrument {}", file.display()))?;
            match output {
                Some(path) => {
                    syntax::write(&path, &result.source)?;
                    eprintln!(
                        "Instrumented {} declaration(s) in {} -> {}",
                        result.wrapped.len(),
                        file.display(),
                        path.display()
                    );
                }
                None => {
                    print!("{}", result.source);
                    eprintln!(
                        "Instrumented {} declaration(s) in {}",
                        result.wrapped.len(),
                        file.display()
                    );
                }
            }
        }
    }

    Ok(())
}
