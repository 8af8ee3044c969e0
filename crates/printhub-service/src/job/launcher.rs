//! Detached consumer launch on behalf of another account.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use printhub_core::config::LauncherConfig;
use printhub_core::config::launcher::USER_PLACEHOLDER;
use printhub_core::error::{AppError, ErrorKind};
use printhub_core::result::AppResult;
use printhub_storage::platform;

/// Starts a consumer process for a user.
pub trait ConsumerLauncher: Send + Sync + std::fmt::Debug {
    /// Spawn a detached consumer for `user`. Does not wait for it.
    fn launch(&self, user: &str) -> AppResult<()>;
}

/// Launcher used when waking consumers is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLauncher;

impl ConsumerLauncher for DisabledLauncher {
    fn launch(&self, user: &str) -> AppResult<()> {
        debug!(user, "Consumer launch disabled");
        Ok(())
    }
}

/// Tries each configured command template in order until one spawns.
///
/// The child gets the target user's `HOME`, `USER`, `LOGNAME`, `DISPLAY`
/// and `XAUTHORITY`, null stdio, and its own process group so it outlives
/// the caller.
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    commands: Vec<Vec<String>>,
    display: String,
}

impl CommandLauncher {
    /// Create a launcher from configuration.
    pub fn new(config: &LauncherConfig) -> Self {
        Self {
            commands: config.commands.clone(),
            display: config.display.clone(),
        }
    }

    /// Environment handed to the consumer process.
    pub fn environment(&self, user: &str) -> Vec<(String, String)> {
        let home = platform::lookup_account(user)
            .map(|account| account.home)
            .unwrap_or_else(|| PathBuf::from("/home").join(user));
        let display = std::env::var("DISPLAY")
            .ok()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| self.display.clone());

        vec![
            ("HOME".to_string(), home.to_string_lossy().into_owned()),
            ("USER".to_string(), user.to_string()),
            ("LOGNAME".to_string(), user.to_string()),
            ("DISPLAY".to_string(), display),
            (
                "XAUTHORITY".to_string(),
                home.join(".Xauthority").to_string_lossy().into_owned(),
            ),
        ]
    }

    /// Build the commands to try, in order, with `{user}` substituted.
    pub fn commands(&self, user: &str) -> Vec<Command> {
        let env = self.environment(user);
        self.commands
            .iter()
            .filter_map(|template| {
                let (program, args) = template.split_first()?;
                let mut command = Command::new(program.replace(USER_PLACEHOLDER, user));
                command
                    .args(args.iter().map(|arg| arg.replace(USER_PLACEHOLDER, user)))
                    .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null());
                #[cfg(unix)]
                {
                    use std::os::unix::process::CommandExt;
                    command.process_group(0);
                }
                Some(command)
            })
            .collect()
    }
}

impl ConsumerLauncher for CommandLauncher {
    fn launch(&self, user: &str) -> AppResult<()> {
        let mut last_error = None;
        for mut command in self.commands(user) {
            let program = command.get_program().to_string_lossy().into_owned();
            match command.spawn() {
                Ok(child) => {
                    info!(user, program = %program, pid = child.id(), "Launched consumer");
                    return Ok(());
                }
                Err(e) => {
                    debug!(user, program = %program, error = %e, "Consumer launch attempt failed");
                    last_error = Some(e);
                }
            }
        }

        let message = format!("No launch command could start a consumer for {user}");
        Err(match last_error {
            Some(e) => AppError::with_source(ErrorKind::Process, message, e),
            None => AppError::process(message),
        })
    }
}
