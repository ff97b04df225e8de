//! CLI interface for polysynth

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Polyphonic voice engine with envelope scheduling and lane visualisation
#[derive(Parser)]
#[command(name = "polysynth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "polysynth.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,

    /// Run a note script offline and print the backend plan as JSON
    Plan {
        /// Configuration file path (defaults are used if it does not exist)
        #[arg(short, long, default_value = "polysynth.yaml")]
        config: PathBuf,

        /// Note script to run
        script: PathBuf,

        /// Also capture display frames every this many seconds
        #[arg(short, long)]
        frames: Option<f64>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Play a note script in real time in the terminal
    Watch {
        /// Configuration file path (defaults are used if it does not exist)
        #[arg(short, long, default_value = "polysynth.yaml")]
        config: PathBuf,

        /// Note script to play
        script: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_plan() {
        let cli = Cli::parse_from(["polysynth", "plan", "demo.yaml", "--frames", "0.1"]);
        match cli.command {
            Commands::Plan {
                config,
                script,
                frames,
                pretty,
            } => {
                assert_eq!(config, PathBuf::from("polysynth.yaml"));
                assert_eq!(script, PathBuf::from("demo.yaml"));
                assert_eq!(frames, Some(0.1));
                assert!(!pretty);
            }
            _ => panic!("expected plan command"),
        }
    }
}
