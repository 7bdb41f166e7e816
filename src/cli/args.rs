//! CLI argument definitions using clap
//!
//! Commands:
//! - dirquery query --config <path> [--filter <text>]
//! - dirquery explain --config <path> --filter <text>
//! - dirquery methods

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dirquery - attack-path queries over directory object graphs
#[derive(Parser, Debug)]
#[command(name = "dirquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit per-query TRACE logs on stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run filters against the configured object file.
    ///
    /// With --filter, runs that one filter. Without it, reads one filter
    /// per line from stdin.
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./dirquery.json")]
        config: PathBuf,

        /// Filter text, e.g. "(&(objectClass=user)(_canpwn=*))"
        #[arg(long)]
        filter: Option<String>,
    },

    /// Show how a filter would be executed
    Explain {
        /// Path to configuration file
        #[arg(long, default_value = "./dirquery.json")]
        config: PathBuf,

        /// Filter text
        #[arg(long)]
        filter: String,
    },

    /// List accepted attack method names
    Methods,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_with_filter() {
        let cli = Cli::try_parse_from([
            "dirquery",
            "query",
            "--config",
            "/tmp/c.json",
            "--filter",
            "(cn=bob)",
        ])
        .unwrap();
        match cli.command {
            Command::Query { config, filter } => {
                assert_eq!(config, PathBuf::from("/tmp/c.json"));
                assert_eq!(filter.as_deref(), Some("(cn=bob)"));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["dirquery", "--verbose", "explain", "--filter", "(cn=*)"])
            .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Explain { config, .. } => {
                assert_eq!(config, PathBuf::from("./dirquery.json"))
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_explain_requires_filter() {
        assert!(Cli::try_parse_from(["dirquery", "explain"]).is_err());
    }
}
