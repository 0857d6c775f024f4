//! Configuration for the consumer binary.
//!
//! All configuration is loaded from environment variables. The consumer needs
//! to know where NATS lives, which subject (topic) and queue group (consumer
//! group) to read from, and how to draw the dashboard.

use std::path::PathBuf;

use crate::error::AppError;

/// Default NATS server URL.
pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";

/// Topic used when `BUZZ_TOPIC` is unset.
pub const DEFAULT_TOPIC: &str = "unknown_topic";

/// Consumer group used when `BUZZ_CONSUMER_GROUP_ID` is unset.
pub const DEFAULT_GROUP_ID: &str = "default_group";

/// Log file used in terminal mode when `BUZZ_LOG_FILE` is unset.
pub const DEFAULT_LOG_FILE: &str = "buzzboard.log";

/// Complete consumer configuration loaded from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// NATS server URL (e.g. `nats://localhost:4222`).
    pub nats_url: String,
    /// Subject to consume.
    pub topic: String,
    /// NATS queue group shared by all consumers of the same group.
    pub group_id: String,
    /// How the dashboard is drawn.
    pub render_mode: RenderMode,
    /// Replay JSON lines from this file instead of subscribing to NATS.
    pub replay_file: Option<PathBuf>,
    /// Where logs go while the terminal dashboard owns the screen.
    pub log_file: PathBuf,
}

/// Supported dashboard outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Two live bar panels drawn in the terminal.
    Terminal,
    /// Panels written to the log on every refresh.
    Log,
    /// No dashboard; aggregates are only logged at shutdown.
    None,
}

impl RenderMode {
    /// Parse a render mode name (case-insensitive).
    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value.trim().to_lowercase().as_str() {
            "terminal" | "tui" => Ok(Self::Terminal),
            "log" | "headless" => Ok(Self::Log),
            "none" | "off" => Ok(Self::None),
            other => Err(AppError::Config(format!(
                "unknown render mode: {other} (expected terminal, log, or none)"
            ))),
        }
    }

    /// Lower-case name for log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::Log => "log",
            Self::None => "none",
        }
    }
}

impl ConsumerConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `NATS_URL` -- NATS server connection string (default `nats://localhost:4222`)
    /// - `BUZZ_TOPIC` -- subject to consume (default `unknown_topic`)
    /// - `BUZZ_CONSUMER_GROUP_ID` -- NATS queue group (default `default_group`)
    /// - `BUZZ_RENDER` -- `terminal`, `log`, or `none` (default `terminal`)
    /// - `BUZZ_REPLAY_FILE` -- replay JSON lines from a file instead of NATS
    /// - `BUZZ_LOG_FILE` -- log destination in terminal mode (default `buzzboard.log`)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let nats_url = lookup("NATS_URL").unwrap_or_else(|| DEFAULT_NATS_URL.to_owned());
        let topic = non_empty(
            "BUZZ_TOPIC",
            lookup("BUZZ_TOPIC").unwrap_or_else(|| DEFAULT_TOPIC.to_owned()),
        )?;
        let group_id = non_empty(
            "BUZZ_CONSUMER_GROUP_ID",
            lookup("BUZZ_CONSUMER_GROUP_ID").unwrap_or_else(|| DEFAULT_GROUP_ID.to_owned()),
        )?;

        let render_mode = lookup("BUZZ_RENDER")
            .map_or(Ok(RenderMode::Terminal), |value| RenderMode::parse(&value))?;

        let replay_file = lookup("BUZZ_REPLAY_FILE")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        let log_file = lookup("BUZZ_LOG_FILE")
            .filter(|path| !path.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from);

        Ok(Self {
            nats_url,
            topic,
            group_id,
            render_mode,
            replay_file,
            log_file,
        })
    }
}

/// Reject empty or whitespace-only values.
fn non_empty(name: &str, value: String) -> Result<String, AppError> {
    if value.trim().is_empty() {
        Err(AppError::Config(format!("{name} must not be empty")))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ConsumerConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ConsumerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.nats_url, DEFAULT_NATS_URL);
        assert_eq!(config.topic, "unknown_topic");
        assert_eq!(config.group_id, "default_group");
        assert_eq!(config.render_mode, RenderMode::Terminal);
        assert!(config.replay_file.is_none());
        assert_eq!(config.log_file, PathBuf::from("buzzboard.log"));
    }

    #[test]
    fn reads_all_variables() {
        let config = load(&[
            ("NATS_URL", "nats://broker:4222"),
            ("BUZZ_TOPIC", "buzz_live"),
            ("BUZZ_CONSUMER_GROUP_ID", "dashboards"),
            ("BUZZ_RENDER", "LOG"),
            ("BUZZ_REPLAY_FILE", "data/buzz.jsonl"),
            ("BUZZ_LOG_FILE", "/tmp/buzz.log"),
        ])
        .unwrap();
        assert_eq!(config.nats_url, "nats://broker:4222");
        assert_eq!(config.topic, "buzz_live");
        assert_eq!(config.group_id, "dashboards");
        assert_eq!(config.render_mode, RenderMode::Log);
        assert_eq!(config.replay_file, Some(PathBuf::from("data/buzz.jsonl")));
        assert_eq!(config.log_file, PathBuf::from("/tmp/buzz.log"));
    }

    #[test]
    fn rejects_unknown_render_mode() {
        let err = load(&[("BUZZ_RENDER", "matplotlib")]).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn rejects_empty_topic_and_group() {
        assert!(load(&[("BUZZ_TOPIC", "  ")]).is_err());
        assert!(load(&[("BUZZ_CONSUMER_GROUP_ID", "")]).is_err());
    }

    #[test]
    fn blank_replay_file_means_nats() {
        let config = load(&[("BUZZ_REPLAY_FILE", "")]).unwrap();
        assert!(config.replay_file.is_none());
    }

    #[test]
    fn render_mode_names_round_trip() {
        for mode in [RenderMode::Terminal, RenderMode::Log, RenderMode::None] {
            assert_eq!(RenderMode::parse(mode.as_str()).unwrap(), mode);
        }
    }
}
