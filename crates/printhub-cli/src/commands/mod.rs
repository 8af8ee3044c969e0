//! Backend argument parsing and dispatch.

pub mod discover;
pub mod submit;

use std::path::PathBuf;

use clap::Parser;

use printhub_core::config::{AppConfig, CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
use printhub_core::error::AppError;

use crate::output;

use self::submit::{SubmitArgs, parse_copies};

/// PrintHub virtual PDF printer backend
#[derive(Debug, Parser)]
#[command(name = "printhub-backend", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, env = CONFIG_ENV_VAR, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Scheduler job id
    pub job_id: Option<String>,

    /// Submitting user
    pub user: Option<String>,

    /// Job title
    #[arg(allow_hyphen_values = true)]
    pub title: Option<String>,

    /// Number of copies
    #[arg(allow_hyphen_values = true)]
    pub copies: Option<String>,

    /// Job options
    #[arg(allow_hyphen_values = true)]
    pub options: Option<String>,

    /// Payload file (standard input when omitted)
    pub file: Option<PathBuf>,
}

/// What the scheduler asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Zero arguments: report the device.
    Discover,
    /// Capture one job.
    Submit(SubmitArgs),
}

impl Cli {
    /// Classify the positional arguments.
    pub fn invocation(&self) -> Result<Invocation, AppError> {
        match (
            &self.job_id,
            &self.user,
            &self.title,
            &self.copies,
            &self.options,
        ) {
            (None, None, None, None, None) => Ok(Invocation::Discover),
            (Some(job_id), Some(user), Some(title), Some(copies), Some(options)) => {
                Ok(Invocation::Submit(SubmitArgs {
                    job_id: job_id.clone(),
                    user: user.clone(),
                    title: title.clone(),
                    copies: parse_copies(copies),
                    options: options.clone(),
                    file: self.file.clone(),
                }))
            }
            _ => Err(AppError::validation(
                "Usage: printhub-backend job-id user title copies options [file]",
            )),
        }
    }

    /// Execute the invocation and return the process exit code.
    pub async fn execute(&self) -> i32 {
        let args = match self.invocation() {
            Ok(Invocation::Discover) => return discover::execute(),
            Ok(Invocation::Submit(args)) => args,
            Err(e) => {
                output::print_error(&e.message);
                return 1;
            }
        };

        let config = load_config(&self.config);
        submit::execute(args, &config).await
    }
}

/// Helper: load configuration, falling back to defaults so a broken file
/// never costs a job.
pub fn load_config(config_path: &str) -> AppConfig {
    match AppConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&format!("Ignoring configuration {config_path}: {e}"));
            AppConfig::default()
        }
    }
}
