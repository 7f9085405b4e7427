//! Bridge configuration.
//!
//! Only one knob exists today: whether wrapped calls are pushed to the engine
//! asynchronously or run inline after waiting on their arrays. Hosts usually
//! leave it on async and switch to blocking only to debug a kernel, which is
//! why it can be flipped from the environment:
//!
//! ```text
//! MOBULA_USING_ASYNC_EXEC=0   # blocking
//! MOBULA_USING_ASYNC_EXEC=1   # async (default)
//! ```

/// Environment variable read by [`BridgeConfig::from_env`].
pub const ASYNC_EXEC_ENV: &str = "MOBULA_USING_ASYNC_EXEC";

/// How a wrapped call reaches its kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// Push the call to the engine and return immediately.
    #[default]
    Async,
    /// Wait for the arrays on the calling thread, then run the kernel inline.
    Blocking,
}

impl ExecMode {
    /// Parses the value of [`ASYNC_EXEC_ENV`]. Anything that is not clearly
    /// "off" keeps async execution.
    pub fn from_flag(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "0" | "false" | "off" | "no" => Self::Blocking,
            _ => Self::Async,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeConfig {
    pub exec_mode: ExecMode,
}

impl BridgeConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        let exec_mode = std::env::var(ASYNC_EXEC_ENV)
            .map(|v| ExecMode::from_flag(&v))
            .unwrap_or_default();
        tracing::debug!(?exec_mode, "bridge configuration loaded");
        Self { exec_mode }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_parsing() {
        assert_eq!(ExecMode::from_flag("0"), ExecMode::Blocking);
        assert_eq!(ExecMode::from_flag(" False "), ExecMode::Blocking);
        assert_eq!(ExecMode::from_flag("off"), ExecMode::Blocking);
        assert_eq!(ExecMode::from_flag("1"), ExecMode::Async);
        assert_eq!(ExecMode::from_flag(""), ExecMode::Async);
    }

    #[test]
    fn default_is_async() {
        assert_eq!(BridgeConfig::default().exec_mode, ExecMode::Async);
    }
}
