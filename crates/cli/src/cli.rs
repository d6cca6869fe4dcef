use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level parser for the `crosspost` binary.
#[derive(Debug, Parser)]
#[command(
    name = "crosspost",
    version,
    about = "Rewrite one piece of content for many platforms, with caching and delivery recovery"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug logging (overridden by CROSSPOST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract content DNA and show which platforms fit
    Recommend {
        /// Markdown or text file to analyse
        source: PathBuf,

        /// Ask the language model instead of the built-in profile scorer
        #[arg(long)]
        advisor: bool,
    },

    /// Generate platform variants for a source document
    Generate {
        source: PathBuf,

        /// Generate only these platforms (repeatable), skipping fit selection
        #[arg(short, long = "platform", value_name = "ID")]
        platforms: Vec<String>,

        /// Ignore cached artifacts and call the generator again
        #[arg(long)]
        no_cache: bool,

        /// Ask the language model for fit selection
        #[arg(long)]
        advisor: bool,
    },

    /// Rank subreddits for a source document
    Subreddits {
        source: PathBuf,

        /// How many communities to suggest
        #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
        max: u64,
    },

    /// Show posting windows and whether now is a good time to post
    Timing {
        /// Only these platforms (repeatable); all when omitted
        #[arg(short, long = "platform", value_name = "ID")]
        platforms: Vec<String>,
    },

    /// List the built-in platforms
    Platforms,

    /// Resubmit failed deliveries whose backoff has elapsed
    Retry,

    /// List failed deliveries and their retry state
    Failures,

    /// Delete a failed-delivery record
    Abandon {
        /// Failure id as shown by `crosspost failures`
        id: String,
    },

    /// Allow more retries for a failed delivery
    RetryExtend {
        id: String,

        /// Additional attempts to allow
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        additional: u32,
    },

    /// Inspect or clean the fingerprint cache
    Cache {
        #[command(subcommand)]
        action: CacheCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum CacheCommands {
    /// Entry counts and disk usage
    Stats,
    /// Delete expired and unreadable entries
    Sweep,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::{CacheCommands, Cli, Commands};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_accepts_repeated_platforms() {
        let cli = Cli::try_parse_from([
            "crosspost",
            "generate",
            "post.md",
            "--platform",
            "devto",
            "-p",
            "hackernews",
            "--no-cache",
        ])
        .expect("cli should parse");

        match cli.command {
            Commands::Generate {
                source,
                platforms,
                no_cache,
                advisor,
            } => {
                assert_eq!(source.to_str(), Some("post.md"));
                assert_eq!(platforms, vec!["devto".to_string(), "hackernews".to_string()]);
                assert!(no_cache);
                assert!(!advisor);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn retry_extend_rejects_zero() {
        assert!(Cli::try_parse_from(["crosspost", "retry-extend", "devto_x", "0"]).is_err());
        let cli = Cli::try_parse_from(["crosspost", "retry-extend", "devto_x", "2"]).unwrap();
        assert!(matches!(cli.command, Commands::RetryExtend { additional: 2, .. }));
    }

    #[test]
    fn subreddits_max_defaults_and_rejects_zero() {
        let cli = Cli::try_parse_from(["crosspost", "subreddits", "post.md"]).unwrap();
        assert!(matches!(cli.command, Commands::Subreddits { max: 3, .. }));
        assert!(Cli::try_parse_from(["crosspost", "subreddits", "post.md", "--max", "0"]).is_err());
    }

    #[test]
    fn timing_accepts_optional_platforms() {
        let cli = Cli::try_parse_from(["crosspost", "timing"]).unwrap();
        assert!(matches!(cli.command, Commands::Timing { ref platforms } if platforms.is_empty()));

        let cli = Cli::try_parse_from(["crosspost", "timing", "-p", "lobsters"]).unwrap();
        match cli.command {
            Commands::Timing { platforms } => assert_eq!(platforms, vec!["lobsters".to_string()]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cache_subcommands_parse() {
        let cli = Cli::try_parse_from(["crosspost", "-v", "cache", "sweep"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Cache {
                action: CacheCommands::Sweep
            }
        ));
    }
}
