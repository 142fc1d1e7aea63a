mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "crucible")]
#[command(about = "Crucible - run untrusted code against test cases", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a source file, optionally scoring it against test cases
    Run {
        /// Path to the source file
        #[arg(short, long)]
        file: String,

        /// Language id (javascript, python, java, cpp)
        #[arg(short, long)]
        language: String,

        /// Path to a JSON file holding an array of test cases
        #[arg(short, long)]
        tests: Option<String>,

        /// Bare-run timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Compiler timeout in milliseconds
        #[arg(long)]
        compile_timeout_ms: Option<u64>,

        /// Per-test-case timeout in milliseconds
        #[arg(long)]
        test_timeout_ms: Option<u64>,
    },

    /// List registered languages
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            language,
            tests,
            timeout_ms,
            compile_timeout_ms,
            test_timeout_ms,
        } => {
            commands::run(
                &file,
                &language,
                tests.as_deref(),
                timeout_ms,
                compile_timeout_ms,
                test_timeout_ms,
            )
            .await?;
        }
        Commands::Languages => {
            commands::languages();
        }
    }

    Ok(())
}
