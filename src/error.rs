//! Error type for window construction and platform plumbing.
//!
//! Only construction and platform failures are errors. An event that nobody
//! claims is a normal dispatch outcome and never shows up here.

use thiserror::Error;

/// Failures surfaced while opening a window or driving the platform.
#[derive(Debug, Error)]
pub enum Error {
    /// The platform refused to create a native window.
    #[error("failed to open platform window: {0}")]
    Platform(String),

    /// No GPU adapter/device/surface could be set up for the window.
    #[error("failed to create GPU context: {0}")]
    Context(String),

    /// A shader module could not be created.
    #[error("failed to create shader `{name}`: {reason}")]
    Shader { name: &'static str, reason: String },

    /// A vertex or index buffer could not be allocated.
    #[error("failed to allocate buffer `{label}`: {reason}")]
    Buffer { label: &'static str, reason: String },

    /// The font manager rejected its configuration.
    #[error("font manager: {0}")]
    Font(String),

    /// The platform event loop could not be created or run.
    #[error("event loop: {0}")]
    EventLoop(String),

    /// A toolkit instance drives a single window.
    #[error("a window is already open for this toolkit")]
    WindowAlreadyOpen,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
