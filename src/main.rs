use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use worksim::config::ConfigOverrides;

mod cmd;

#[derive(Parser)]
#[command(name = "worksim")]
#[command(
    version,
    about = "Synthetic work-management dataset generator and validator"
)]
pub struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// Number of users in the organization
    #[arg(long)]
    pub users: Option<u32>,

    /// Number of teams (each gets 2-8 projects)
    #[arg(long)]
    pub teams: Option<u32>,

    /// Seed for every random draw
    #[arg(long)]
    pub seed: Option<u64>,

    /// Share (0-100) of task titles, descriptions and comments sent to the remote service
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub llm_percentage: Option<u8>,

    /// SQLite file to write; an existing file is replaced
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Reference time as YYYY-MM-DDTHH:MM:SS (defaults to the current UTC time)
    #[arg(long)]
    pub now: Option<String>,

    /// Config file (defaults to ./worksim.toml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl From<&GenerateArgs> for ConfigOverrides {
    fn from(args: &GenerateArgs) -> Self {
        ConfigOverrides {
            users: args.users,
            teams: args.teams,
            seed: args.seed,
            llm_percentage: args.llm_percentage,
            output: args.output.clone(),
            now: args.now.clone(),
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// Date overdue status is measured against, YYYY-MM-DD (defaults to the reference "now")
    #[arg(long)]
    pub as_of: Option<String>,

    /// Print the report as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a fresh dataset
    Generate(GenerateArgs),
    /// Validate an existing dataset (exit code 1 on failure)
    Validate {
        /// Store to validate (defaults to the configured output)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Config file used to resolve the default store and reference time
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        report: ReportArgs,
    },
    /// Generate, then validate the result
    Run {
        #[command(flatten)]
        generate: GenerateArgs,

        #[command(flatten)]
        report: ReportArgs,
    },
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let passed = match &cli.command {
        Commands::Generate(args) => {
            cmd::cmd_generate(args).await?;
            true
        }
        Commands::Validate { db, config, report } => {
            cmd::cmd_validate(db.as_deref(), config.as_deref(), report)?
        }
        Commands::Run { generate, report } => cmd::cmd_run(generate, report).await?,
    };

    Ok(if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
