use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sitelimit-cli", version, about = "Sitelimit CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current budget state
    Status,
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Tracked site management
    Sites {
        #[command(subcommand)]
        action: commands::sites::SitesAction,
    },
    /// Daily budget management
    Budget {
        #[command(subcommand)]
        action: commands::budget::BudgetAction,
    },
    /// Turn tracking and blocking on
    Enable,
    /// Turn tracking and blocking off
    Disable,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Replay a scenario file deterministically
    Simulate {
        /// Path to a JSON scenario
        file: std::path::PathBuf,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Status => commands::status::run(),
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Sites { action } => commands::sites::run(action),
        Commands::Budget { action } => commands::budget::run(action),
        Commands::Enable => commands::toggle::run(true),
        Commands::Disable => commands::toggle::run(false),
        Commands::Config { action } => commands::config::run(action),
        Commands::Simulate { file } => commands::simulate::run(&file),
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "sitelimit-cli", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
