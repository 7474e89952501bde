use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

mod alerts;
mod commands;

#[derive(Parser)]
#[command(name = "quarterlog", version, about = "Log what you did every fifteen minutes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive work session
    Start(commands::session::StartArgs),
    /// Project folder management
    Folders {
        #[command(subcommand)]
        action: commands::folders::FoldersAction,
    },
    /// Alert testing and notification permission
    Alert {
        #[command(subcommand)]
        action: commands::alert::AlertAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("QUARTERLOG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Start(args) => commands::session::run(args),
        Commands::Folders { action } => commands::folders::run(action),
        Commands::Alert { action } => commands::alert::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "quarterlog", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
