use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "focustomato", version, about = "FocusTomato CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the timer and barrier, reading commands from stdin
    Run {
        /// Milliseconds per timer second (lower values fast-forward)
        #[arg(long, default_value_t = 1000)]
        tick_ms: u64,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Blocklist management
    Blocklist {
        #[command(subcommand)]
        action: commands::blocklist::BlocklistAction,
    },
}

/// Logs go to stderr so stdout stays machine-readable.
fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("focustomato=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    setup_logging();

    let result = match cli.command {
        Commands::Run { tick_ms } => commands::run::run(tick_ms),
        Commands::Config { action } => commands::config::run(action),
        Commands::Blocklist { action } => commands::blocklist::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
