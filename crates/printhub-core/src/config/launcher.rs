//! Consumer launcher configuration.

use serde::{Deserialize, Serialize};

/// Placeholder substituted with the target account name in launch commands.
pub const USER_PLACEHOLDER: &str = "{user}";

/// How the producer wakes a consumer when live delivery fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Whether the producer tries to launch a consumer at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Candidate argv templates, tried in order until one spawns.
    #[serde(default = "default_commands")]
    pub commands: Vec<Vec<String>>,
    /// X display used when the producer's environment has none.
    #[serde(default = "default_display")]
    pub display: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            commands: default_commands(),
            display: default_display(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_commands() -> Vec<Vec<String>> {
    vec![
        vec![
            "su".to_string(),
            "-".to_string(),
            USER_PLACEHOLDER.to_string(),
            "-c".to_string(),
            "printhub-listener".to_string(),
        ],
        vec![
            "sudo".to_string(),
            "-u".to_string(),
            USER_PLACEHOLDER.to_string(),
            "printhub-listener".to_string(),
        ],
    ]
}

fn default_display() -> String {
    ":0".to_string()
}
