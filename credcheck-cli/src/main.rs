//! CredCheck CLI - certificate and QR document authentication.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod exit_codes;
mod render;

use exit_codes::ExitCode;

#[derive(Parser)]
#[command(name = "credcheck")]
#[command(author, version, about = "Certificate and QR document authentication", long_about = None)]
#[command(after_help = exit_codes::HELP)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify a certificate image against the verification service
    Verify {
        /// Certificate image (JPEG, PNG or TIFF, at most 10 MB)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Verification service base URL
        #[arg(long, env = "CREDCHECK_API_URL")]
        api_url: Option<String>,

        /// Use the legacy /verify endpoint
        #[arg(long)]
        legacy: bool,

        /// Request timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,

        /// Only set the exit code
        #[arg(short, long)]
        quiet: bool,
    },

    /// Read the QR code in an image
    Scan {
        /// Image containing a QR code (any image type, at most 10 MB)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,

        /// Only set the exit code
        #[arg(short, long)]
        quiet: bool,
    },

    /// Check that the verification service is reachable
    Health {
        /// Verification service base URL
        #[arg(long, env = "CREDCHECK_API_URL")]
        api_url: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "credcheck_core=debug,credcheck=debug,info"
    } else {
        "credcheck_core=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Verify {
            file,
            api_url,
            legacy,
            timeout,
            json,
            quiet,
        } => {
            let options = commands::verify::VerifyOptions {
                api_url,
                legacy,
                timeout,
                json,
                quiet,
            };
            commands::verify::execute(file, options).await
        }
        Commands::Scan { file, json, quiet } => commands::scan::execute(file, json, quiet).await,
        Commands::Health { api_url } => commands::health::execute(api_url).await,
    };

    if let Err(err) = result {
        let exit = ExitCode::from_anyhow(&err);
        if let Some(message) = exit.message {
            eprintln!("Error: {message}");
        }
        std::process::exit(exit.code);
    }
}
