use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `humanizer` - draft, style-edit and self-check articles with a local model.
#[derive(Parser, Debug)]
#[command(name = "humanizer")]
#[command(version)]
#[command(
    about = "Generate natural-sounding articles with a local Ollama model.",
    long_about = None
)]
pub struct Cli {
    /// Config file (default: ~/.humanizer/config.toml, created on first run)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log pipeline internals (prompt sizes, metric values)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Draft, style-edit and repair an article until it passes the checks
    Generate {
        /// Article topic
        #[arg(long)]
        topic: String,

        /// Mandatory details the article must cover
        #[arg(long)]
        details: String,

        /// Model to use (overrides config)
        #[arg(long)]
        model: Option<String>,

        /// Focus keyword for the H1 and the opening
        #[arg(long)]
        keyword: Option<String>,

        /// Output file for the final text
        #[arg(long, default_value = "out.md")]
        out: PathBuf,

        /// Also save the pre-edit draft as <stem>_draft.<ext>
        #[arg(long)]
        show_draft: bool,

        /// Corrective rewrites allowed (0 - 10, overrides config)
        #[arg(long)]
        max_attempts: Option<u32>,

        /// Minimum word count
        #[arg(long)]
        min_words: Option<usize>,

        /// Maximum word count
        #[arg(long)]
        max_words: Option<usize>,

        /// Also require the recipe article layout, "ich" in the opening and SEO field lengths
        #[arg(long)]
        check_structure: bool,
    },

    /// Evaluate an existing text file without calling a model
    Check {
        /// Text file to evaluate
        file: PathBuf,

        /// Focus keyword expected in the H1 and the opening
        #[arg(long)]
        keyword: Option<String>,

        /// Minimum word count
        #[arg(long)]
        min_words: Option<usize>,

        /// Maximum word count
        #[arg(long)]
        max_words: Option<usize>,

        /// Also require the recipe article layout, "ich" in the opening and SEO field lengths
        #[arg(long)]
        check_structure: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_generate_with_defaults() {
        let cli = Cli::try_parse_from([
            "humanizer",
            "generate",
            "--topic",
            "One-Pot-Pasta",
            "--details",
            "12 Min",
        ])
        .unwrap();
        assert!(!cli.verbose);
        assert!(cli.config.is_none());
        match cli.command {
            Commands::Generate {
                topic,
                out,
                show_draft,
                max_attempts,
                keyword,
                check_structure,
                ..
            } => {
                assert_eq!(topic, "One-Pot-Pasta");
                assert_eq!(out, PathBuf::from("out.md"));
                assert!(!show_draft);
                assert!(max_attempts.is_none());
                assert!(keyword.is_none());
                assert!(!check_structure);
            }
            Commands::Check { .. } => panic!("expected generate"),
        }
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "humanizer",
            "check",
            "article.md",
            "--min-words",
            "700",
            "--verbose",
            "--config",
            "/tmp/h.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/h.toml")));
        assert!(matches!(
            cli.command,
            Commands::Check {
                min_words: Some(700),
                max_words: None,
                ..
            }
        ));
    }

    #[test]
    fn check_takes_keyword_and_structure_flag() {
        let cli = Cli::try_parse_from([
            "humanizer",
            "check",
            "article.md",
            "--keyword",
            "Linsencurry",
            "--check-structure",
        ])
        .unwrap();
        match cli.command {
            Commands::Check {
                keyword,
                check_structure,
                ..
            } => {
                assert_eq!(keyword.as_deref(), Some("Linsencurry"));
                assert!(check_structure);
            }
            Commands::Generate { .. } => panic!("expected check"),
        }
    }

    #[test]
    fn generate_requires_topic() {
        assert!(Cli::try_parse_from(["humanizer", "generate", "--details", "x"]).is_err());
    }
}
