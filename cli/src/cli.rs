use ask_core::{AnswerKind, AskConfig};
use clap::Parser;
use std::path::PathBuf;

/// Ask the Answer Service a question from the terminal
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The query to send
    #[arg(index = 1)] // Positional argument
    pub query: Option<String>,

    /// Enter interactive mode
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Base URL of the Answer Service
    #[arg(long)]
    pub base_url: Option<String>,

    /// Path of the ask endpoint on the service
    #[arg(long)]
    pub endpoint_path: Option<String>,

    /// Answer payload produced by the service (generic or reservation)
    #[arg(long)]
    pub answer_kind: Option<AnswerKind>,

    /// Give up on a request after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Path to the configuration file
    #[arg(short, long, env = "ASK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print answers as JSON instead of formatted text
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Settings given on the command line, layered over the file config
    pub fn overrides(&self) -> AskConfig {
        AskConfig {
            base_url: self.base_url.clone(),
            endpoint_path: self.endpoint_path.clone(),
            answer_kind: self.answer_kind,
            timeout_secs: self.timeout_secs,
            log_level: self.verbose.then(|| "debug".to_string()),
        }
    }
}
