// src/main.rs
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use judge_ide::banner;
use judge_ide::client::{HttpReaper, JudgeClient, WsChannel};
use judge_ide::config::AppConfig;
use judge_ide::controller::RunController;
use judge_ide::errors::{IdeError, Result};
use judge_ide::interpreter::TerminalKind;
use judge_ide::language::{Language, parse_allowed_languages};
use judge_ide::models::RunRequest;
use judge_ide::ui::TerminalSink;

/// How long pending submission deletes may hold up exit.
const CLEANUP_GRACE: Duration = Duration::from_secs(3);

#[derive(Parser, Debug)]
#[command(name = "judge-ide", version, about = "Run and submit code against the online judge")]
struct Cli {
    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a source file against custom input and print the result
    Run {
        /// Source file to run
        source: PathBuf,

        /// Language key or alias; detected from the file extension when omitted
        #[arg(short, long)]
        language: Option<Language>,

        /// File whose contents are fed to the program's stdin
        #[arg(long)]
        stdin: Option<PathBuf>,

        /// Send this judge language code instead of the one derived from the language
        #[arg(long)]
        judge_code: Option<String>,

        /// The problem's allowed languages, e.g. "C++, Python"
        #[arg(long)]
        allowed: Option<String>,
    },

    /// Submit a source file for grading
    Submit {
        /// Problem page path, e.g. /problem/aplusb
        problem: String,

        /// Source file to submit
        source: PathBuf,

        #[arg(short, long)]
        language: Option<Language>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    banner::print_banner();

    // `.env` may carry RUST_LOG, so it is loaded before the logger reads the environment.
    let dotenv = dotenvy::dotenv();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Err(e) = dotenv {
        log::debug!("No .env file loaded: {}", e);
    }

    let cli = Cli::parse();

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<ExitCode> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let client = JudgeClient::new(&config)?;

    match cli.command {
        Command::Run {
            source,
            language,
            stdin,
            judge_code,
            allowed,
        } => {
            let language = resolve_language(language, &source)?;
            if let Some(allowed) = allowed {
                if !parse_allowed_languages(&allowed).contains(&language) {
                    return Err(IdeError::UnsupportedLanguage(format!(
                        "{} (problem allows: {})",
                        language, allowed
                    )));
                }
            }

            let code = std::fs::read_to_string(&source)?;
            let input = match stdin {
                Some(path) => std::fs::read_to_string(path)?,
                None => String::new(),
            };
            let request = RunRequest::new(
                judge_code.unwrap_or_else(|| language.judge_code()),
                code,
                input,
            );

            let reaper = HttpReaper::new(client.clone());
            let mut controller = RunController::new(
                client,
                WsChannel::new(config.ws_endpoint()),
                reaper.clone(),
                TerminalSink,
            )
            .with_result_timeout(config.result_timeout);

            let report = controller.run(request).await;
            reaper.drain(CLEANUP_GRACE).await;

            Ok(if report.kind == TerminalKind::Success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Submit {
            problem,
            source,
            language,
        } => {
            let language = resolve_language(language, &source)?;
            let code = std::fs::read_to_string(&source)?;
            let landed = client.submit_for_grading(&problem, language, &code).await?;
            println!("Submitted: {}", landed);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn resolve_language(explicit: Option<Language>, source: &Path) -> Result<Language> {
    explicit
        .or_else(|| Language::from_path(source))
        .ok_or_else(|| {
            IdeError::UnsupportedLanguage(format!(
                "cannot infer a language for {}, pass --language",
                source.display()
            ))
        })
}
