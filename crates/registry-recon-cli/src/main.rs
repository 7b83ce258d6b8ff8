//! registry-recon: run a reconciliation connector over JSON-lines rows.

use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use registry_recon::{ClientSettings, ConnectorKind, HttpContext};
use registry_recon_cli::{input, params, run_batch};

#[derive(Parser)]
#[command(
    name = "registry-recon",
    about = "Reconcile rows against HM Land Registry and Companies House",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available connectors.
    List,

    /// Print a connector's parameters and output columns as JSON.
    Describe {
        /// Connector name, e.g. companies-house-officers.
        connector: String,
    },

    /// Run a connector over JSON-lines input, one object per line.
    Run {
        /// Connector name.
        connector: String,

        /// Connector parameter as key=value. Repeatable.
        #[arg(short, long)]
        param: Vec<String>,

        /// JSON file holding a parameter object. `--param` values override it.
        #[arg(long)]
        params: Option<PathBuf>,

        /// Input file, or `-` for stdin.
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Rows processed at once.
        #[arg(long, default_value_t = 4)]
        concurrency: usize,

        /// Per-request timeout in milliseconds.
        /// Also reads from REGISTRY_RECON_TIMEOUT_MS.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   registry-recon completions bash > ~/.local/share/bash-completion/completions/registry-recon
    ///   registry-recon completions zsh > ~/.zfunc/_registry-recon
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::List => {
            for kind in ConnectorKind::ALL {
                println!("{:<26} {}", kind.name(), kind.summary());
            }
        }

        Commands::Describe { connector } => {
            let kind = ConnectorKind::from_name(&connector)?;
            println!("{}", serde_json::to_string_pretty(kind.details())?);
        }

        Commands::Run {
            connector,
            param,
            params: params_file,
            input: input_path,
            concurrency,
            timeout_ms,
        } => {
            let kind = ConnectorKind::from_name(&connector)?;
            let mut parameters = params::load(params_file.as_deref(), &param)
                .context("failed to load connector parameters")?;
            params::apply_env_defaults(kind, &mut parameters);

            let rows = if input_path == "-" {
                input::read_rows(io::stdin().lock())?
            } else {
                let file = std::fs::File::open(&input_path)
                    .with_context(|| format!("failed to open input {input_path}"))?;
                input::read_rows(BufReader::new(file))?
            };

            let settings = ClientSettings::resolve(timeout_ms);
            let ctx = HttpContext::new(&settings)?;
            let connector = kind.initialise(&parameters, &ctx)?;

            let mut out = io::stdout().lock();
            let summary =
                run_batch(connector.as_ref(), rows, concurrency, ctx.abort(), &mut out).await?;

            if let Some(message) = summary.fatal {
                eprintln!("Error: {message}");
                std::process::exit(1);
            }
        }

        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "registry-recon",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}
