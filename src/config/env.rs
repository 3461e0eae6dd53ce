//! Process environment, resolved once at startup.

use thiserror::Error;

/// Environment variable overriding the configured port.
pub const PORT_VAR: &str = "PORT";

/// Environment variables naming the deployment environment, in lookup order.
pub const ENV_VARS: [&str; 2] = ["APP_ENV", "NODE_ENV"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    #[error("PORT must be a port number, got '{0}'")]
    InvalidPort(String),
}

/// Values the server would otherwise read from process-wide state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEnv {
    /// Explicit port override.
    pub port: Option<u16>,

    /// Test mode suppresses access logging.
    pub test_mode: bool,
}

impl RuntimeEnv {
    /// Read `PORT` and `APP_ENV` / `NODE_ENV` from the process environment.
    pub fn from_env() -> Result<Self, EnvError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EnvError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(PORT_VAR) {
            Some(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<u16>()
                    .map_err(|_| EnvError::InvalidPort(raw.clone()))?,
            ),
            _ => None,
        };

        let test_mode = ENV_VARS
            .iter()
            .find_map(|key| lookup(key))
            .map(|value| value.to_ascii_lowercase().contains("test"))
            .unwrap_or(false);

        Ok(Self { port, test_mode })
    }

    /// Environment for tests: no port override, access logs off.
    pub fn test() -> Self {
        Self {
            port: None,
            test_mode: true,
        }
    }
}
