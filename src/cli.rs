use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "crawler", about = "Polite breadth-first HTML crawler")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the crawler until interrupted
    Run {
        /// Override the default seed URL
        #[arg(long)]
        seed: Option<String>,
    },
    /// Print document store stats
    Status,
}
