mod cmd;
mod output;

use clap::{Args, Parser, Subcommand};
use devlens::{BackendConfig, BackendKind, GenerationStrategy, Generator, RetryConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "devlens",
    about = "Structured answers from language models about your code",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    backend: BackendArgs,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log pipeline details to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct BackendArgs {
    /// Backend to use (ollama, openai, none)
    #[arg(long, global = true, env = "DEVLENS_BACKEND", default_value = "ollama")]
    backend: BackendKind,

    /// Model name (default depends on the backend)
    #[arg(long, global = true, env = "DEVLENS_MODEL")]
    model: Option<String>,

    /// Backend base URL
    #[arg(long, global = true, env = "DEVLENS_BASE_URL")]
    base_url: Option<String>,

    /// API key for hosted backends
    #[arg(long, global = true, env = "DEVLENS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Sampling temperature
    #[arg(long, global = true, env = "DEVLENS_TEMPERATURE")]
    temperature: Option<f64>,

    /// Maximum generation attempts
    #[arg(long, global = true, env = "DEVLENS_ATTEMPTS", default_value_t = 3)]
    attempts: u32,

    /// Make one call and skip repair, whatever the backend's default
    #[arg(long, global = true, env = "DEVLENS_SINGLE_SHOT")]
    single_shot: bool,
}

impl BackendArgs {
    fn config(&self) -> BackendConfig {
        let mut config = BackendConfig::new(self.backend);
        if let Some(model) = &self.model {
            config = config.with_model(model);
        }
        if let Some(url) = &self.base_url {
            config = config.with_base_url(url);
        }
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key);
        }
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        config
    }

    fn generator(&self) -> Generator {
        let generator = Generator::from_boxed(devlens::build_backend(&self.config()))
            .with_retry(RetryConfig::new().max_attempts(self.attempts));
        if self.single_shot {
            generator.with_strategy(GenerationStrategy::SingleShot)
        } else {
            generator
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Review a source file and print the verdict
    Review {
        /// File to review ("-" for stdin)
        file: PathBuf,

        /// Extra context for the reviewer (ticket text, PR description)
        #[arg(long)]
        context: Option<String>,
    },

    /// Recover the JSON object from saved model output
    Extract {
        /// File holding model output ("-" for stdin)
        file: PathBuf,
    },

    /// List the backend's models
    Models,

    /// Show backend configuration and reachability
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Review { file, context } => {
            cmd::review::run(&cli.backend.generator(), &file, context.as_deref(), cli.json).await
        }
        Commands::Extract { file } => cmd::extract::run(&file, cli.json),
        Commands::Models => cmd::models::run(&cli.backend.generator(), cli.json).await,
        Commands::Status => cmd::status::run(&cli.backend.generator(), cli.json).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
