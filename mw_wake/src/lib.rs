//! ABOUTME: Wake sinks that keep the display powered on
//! ABOUTME: Provides the WakeSink trait and a shell-command implementation

use async_trait::async_trait;
use mw_core::{Error, Result};
use mw_proc::{run, Invocation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};
use validator::Validate;

/// Something that can wake the display.
///
/// Triggering must be idempotent; callers treat failures as non-fatal.
#[async_trait]
pub trait WakeSink: Send + Sync {
    async fn trigger(&self) -> Result<()>;

    /// Name used in logs
    fn name(&self) -> &str;
}

/// Wake command settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WakeCommandConfig {
    #[validate(length(min = 1))]
    pub program: String,
    pub args: Vec<String>,
    #[validate(range(min = 100, max = 60000))]
    pub timeout_ms: u64,
}

impl Default for WakeCommandConfig {
    fn default() -> Self {
        Self {
            program: "xset".to_string(),
            args: vec!["dpms".to_string(), "force".to_string(), "on".to_string()],
            timeout_ms: 5000,
        }
    }
}

/// Wakes the display by running an external command such as `xset dpms force on`
#[derive(Debug, Clone)]
pub struct CommandWakeSink {
    invocation: Invocation,
    name: String,
}

impl CommandWakeSink {
    pub fn new(config: &WakeCommandConfig) -> Self {
        let invocation = Invocation::new(&config.program)
            .args(&config.args)
            .timeout(Duration::from_millis(config.timeout_ms));
        let name = std::iter::once(config.program.as_str())
            .chain(config.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        Self { invocation, name }
    }
}

#[async_trait]
impl WakeSink for CommandWakeSink {
    #[instrument(skip(self), fields(command = %self.name))]
    async fn trigger(&self) -> Result<()> {
        let result = run(&self.invocation).await?;

        if result.timed_out() {
            return Err(Error::External(format!(
                "Wake command timed out after {}ms",
                self.invocation.timeout.as_millis()
            )));
        }
        if !result.success() {
            return Err(Error::External(format!(
                "Wake command exited with {:?}: {}",
                result.exit_code(),
                result.stderr.trim()
            )));
        }

        info!("Display woken");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(program: &str, args: &[&str]) -> CommandWakeSink {
        CommandWakeSink::new(&WakeCommandConfig {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout_ms: 1000,
        })
    }

    #[test]
    fn test_default_command_is_xset() {
        let config = WakeCommandConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(CommandWakeSink::new(&config).name(), "xset dpms force on");
    }

    #[test]
    fn test_empty_program_rejected() {
        let config = WakeCommandConfig {
            program: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_successful_wake() {
        assert!(sink("true", &[]).trigger().await.is_ok());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_external_error() {
        let err = sink("sh", &["-c", "echo no display >&2; exit 1"])
            .trigger()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::External(_)));
        assert!(err.to_string().contains("no display"));
    }

    #[tokio::test]
    async fn test_missing_program_is_external_error() {
        let err = sink("this_wake_command_does_not_exist_12345", &[])
            .trigger()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::External(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let err = sink("sleep", &["5"]).trigger().await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
