use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sorng_gcf::{
    CommandOptions, ConsoleSink, GoogleProvider, InvokeFunction, RetrieveLogs, ServiceManifest,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "gcf", version, about = "Invoke Google Cloud Functions and read their logs")]
struct Cli {
    /// Service manifest describing the provider and its functions.
    #[arg(long, global = true, default_value = "serverless.yml")]
    config: PathBuf,

    /// Abort when the command takes longer than this many seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Invoke a deployed function and print its result.
    Invoke(InvokeArgs),
    /// Print the most recent log lines of a function.
    Logs(LogsArgs),
}

#[derive(Debug, Args)]
struct Target {
    /// Function name as declared in the manifest.
    #[arg(short, long)]
    function: String,
    #[arg(short, long)]
    region: Option<String>,
    #[arg(short, long)]
    stage: Option<String>,
}

#[derive(Debug, Args)]
struct InvokeArgs {
    #[command(flatten)]
    target: Target,
    /// Payload passed to the function.
    #[arg(short, long)]
    data: Option<String>,
}

#[derive(Debug, Args)]
struct LogsArgs {
    #[command(flatten)]
    target: Target,
    /// Number of entries to show.
    #[arg(short = 'n', long)]
    count: Option<u32>,
}

impl Target {
    fn into_options(self) -> CommandOptions {
        CommandOptions {
            function: self.function,
            region: self.region,
            stage: self.stage,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let manifest = ServiceManifest::from_file(&cli.config)
        .with_context(|| format!("failed to load service manifest {}", cli.config.display()))?;

    let work = run(&manifest, cli.command);
    match cli.timeout {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), work)
            .await
            .with_context(|| format!("command timed out after {}s", secs))?,
        None => work.await,
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run(manifest: &ServiceManifest, command: Command) -> Result<()> {
    let sink = ConsoleSink;
    match command {
        Command::Invoke(args) => {
            let options = CommandOptions {
                data: args.data,
                ..args.target.into_options()
            }
            .invoke_options(manifest);
            let provider = GoogleProvider::new(manifest.provider_config(&options.region)?);
            log::debug!("Using provider {}", GoogleProvider::provider_name());
            InvokeFunction::new(
                &provider,
                &provider.config().project_id,
                &manifest.functions,
                &options,
                &sink,
            )
            .run()
            .await
            .with_context(|| format!("failed to invoke function {}", options.function))?;
        }
        Command::Logs(args) => {
            let options = CommandOptions {
                count: args.count,
                ..args.target.into_options()
            }
            .logs_options(manifest);
            let provider = GoogleProvider::new(manifest.provider_config(&options.region)?);
            RetrieveLogs::new(
                &provider,
                &provider.config().project_id,
                &manifest.functions,
                &options,
                &sink,
            )
            .run()
            .await
            .with_context(|| format!("failed to read logs of function {}", options.function))?;
        }
    }
    Ok(())
}
