use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::logging::LogLevel;

#[derive(Parser, Debug)]
#[command(name = "classifier")]
#[command(about = "Classify Khmer news articles and manage prediction history")]
pub struct Cli {
    /// Backend base URL including the API prefix (e.g. http://localhost:8000/api/v1)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[arg(
        long,
        value_enum,
        default_value_t = LogLevel::Warn,
        global = true,
        env = "CLASSIFIER_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// Write logs to a file instead of stderr
    #[arg(long, global = true, env = "CLASSIFIER_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify an article. Reads stdin when no text is given.
    Predict {
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Like or dislike a stored prediction
    Feedback {
        id: String,
        #[arg(value_enum)]
        verdict: Verdict,
    },

    /// Show one page of prediction history
    History {
        #[arg(
            short,
            long,
            default_value_t = 1,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        page: u32,
    },

    /// Probe backend health once
    Health,

    /// List the categories the model can assign
    Categories,

    /// Line-oriented workbench: edit, classify, give feedback, page history
    Interactive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Verdict {
    Like,
    Dislike,
}

impl Verdict {
    pub fn liked(self) -> bool {
        matches!(self, Verdict::Like)
    }
}
