use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

pub const DEFAULT_ML_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_DATA_DIR: &str = ".livestoq";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

#[derive(Parser, Debug)]
#[command(name = "livestoq", version, about = "Livestock scan assessments")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "LIVESTOQ_ML_API_URL",
        default_value = DEFAULT_ML_API_URL,
        help = "Base URL of the analysis service"
    )]
    pub ml_api_url: String,
    #[arg(
        long,
        global = true,
        env = "LIVESTOQ_DATA_DIR",
        default_value = DEFAULT_DATA_DIR,
        help = "Directory holding saved scans and the session"
    )]
    pub data_dir: PathBuf,
    #[arg(long, global = true, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
    #[arg(long, global = true, env = "LIVESTOQ_LLM_BASE_URL", default_value = DEFAULT_LLM_BASE_URL)]
    pub llm_base_url: String,
    #[arg(long, global = true, env = "LIVESTOQ_LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    pub llm_model: String,
    #[arg(short, long, global = true, action = ArgAction::Count, help = "More logging (-v debug, -vv trace)")]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze captured images with the ML service.
    Analyze(AnalyzeArgs),
    /// Produce a simulated assessment without calling the ML service.
    Mock(CaptureArgs),
    /// Print a saved assessment (the latest when no id is given).
    Show {
        id: Option<String>,
        #[arg(long, help = "Print the stored JSON record")]
        json: bool,
    },
    /// List saved assessments, newest first.
    History,
    /// Ask the livestock assistant a question.
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show the credit balance and available packages.
    Credits,
    /// Buy a credit package (starter, standard, pro).
    Buy { package: String },
}

#[derive(Args, Debug)]
pub struct CaptureArgs {
    #[arg(long, help = "Side view image (required)")]
    pub side: PathBuf,
    #[arg(long, help = "Teeth close-up image")]
    pub teeth: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub capture: CaptureArgs,
    #[arg(long, help = "Breed hint; unknown values fall back to generic")]
    pub breed: Option<String>,
    #[arg(long, conflicts_with = "no_fallback", help = "Use a mock assessment if analysis fails")]
    pub mock_on_failure: bool,
    #[arg(long, help = "Never fall back to a mock assessment")]
    pub no_fallback: bool,
    #[arg(long, env = "LIVESTOQ_TIMEOUT_SECS", help = "Abort the analysis request after N seconds")]
    pub timeout_secs: Option<u64>,
}

/// What to do when live analysis fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    Always,
    Never,
    Ask,
}

impl AnalyzeArgs {
    pub fn fallback_policy(&self) -> FallbackPolicy {
        if self.mock_on_failure {
            FallbackPolicy::Always
        } else if self.no_fallback {
            FallbackPolicy::Never
        } else {
            FallbackPolicy::Ask
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn analyze_flags() {
        let cli = Cli::try_parse_from([
            "livestoq",
            "analyze",
            "--side",
            "cow.jpg",
            "--teeth",
            "teeth.png",
            "--breed",
            "bali",
            "--mock-on-failure",
        ])
        .unwrap();
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.capture.side, PathBuf::from("cow.jpg"));
                assert_eq!(args.capture.teeth, Some(PathBuf::from("teeth.png")));
                assert_eq!(args.breed.as_deref(), Some("bali"));
                assert_eq!(args.fallback_policy(), FallbackPolicy::Always);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn fallback_flags_conflict() {
        let err = Cli::try_parse_from([
            "livestoq",
            "analyze",
            "--side",
            "cow.jpg",
            "--mock-on-failure",
            "--no-fallback",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn side_image_is_required() {
        assert!(Cli::try_parse_from(["livestoq", "mock"]).is_err());
    }

    #[test]
    fn ask_joins_words() {
        let cli = Cli::try_parse_from(["livestoq", "ask", "is", "my", "cow", "healthy?"]).unwrap();
        match cli.command {
            Commands::Ask { question } => assert_eq!(question.join(" "), "is my cow healthy?"),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
