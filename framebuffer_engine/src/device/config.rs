/// Device configuration

use crate::log::LogSeverity;

/// Which validation messages are forwarded to the engine log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything, including info and verbose messages
    All,
}

/// Device configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable validation/debug layers (needs the backend's validation feature)
    pub enable_validation: bool,
    /// Application name
    pub app_name: String,
    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),
    /// Validation message filter
    pub debug_severity: DebugSeverity,
    /// Minimum engine log severity, applied when the device is created
    pub log_severity: LogSeverity,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Framebuffer Engine Application".to_string(),
            app_version: (1, 0, 0),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            log_severity: if cfg!(debug_assertions) { LogSeverity::Debug } else { LogSeverity::Info },
        }
    }
}
