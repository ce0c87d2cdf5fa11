use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lifedash", version, about = "Lifedash CLI")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current state as JSON
    Status,
    /// Simulation parameters
    Params {
        #[command(subcommand)]
        action: commands::params::ParamsAction,
    },
    /// Deadline tasks
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run the periodic tick loop
    Run {
        /// Stop after this many ticks instead of waiting for Ctrl-C
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Status => commands::status::run(),
        Commands::Params { action } => commands::params::run(action),
        Commands::Task { action } => commands::task::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Run { ticks } => commands::run::run(ticks),
        Commands::Completions { shell } => commands::completions::run(shell),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
