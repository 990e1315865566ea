//! Error types for the ripple engine
//!
//! Configuration and host-capability failures are fatal and surfaced to the
//! caller before any frame is scheduled; there is no degraded mode.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RippleError {
    /// The host is missing a capability the engine needs (adapter, device,
    /// surface format, storage limits). Raised during bring-up only.
    #[error("unsupported host capability: {0}")]
    Unsupported(String),

    /// A requested grid or particle count does not fit one state buffer.
    #[error("requested {requested} cells but at most {max} are addressable")]
    GridTooLarge { requested: u64, max: u64 },

    /// A state buffer that would exceed the storage-binding size the GPU
    /// context requests from the host.
    #[error("state buffer of {bytes} bytes exceeds the {max} byte binding limit")]
    BufferTooLarge { bytes: u64, max: u64 },

    /// A state-buffer shape with a zero dimension or an invalid channel count.
    #[error("invalid buffer shape {width}x{height} with {channels} channels")]
    BadShape {
        width: u32,
        height: u32,
        channels: u32,
    },

    /// A parameter name nobody registered.
    #[error("unknown parameter '{0}'")]
    UnknownParam(String),

    /// A parameter read or publish with the wrong kind.
    #[error("parameter '{name}' is a {actual}, not a {expected}")]
    ParamKind {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A compositor pass plan that reads a resource before anything wrote it.
    #[error("pass '{pass}' reads '{resource}' which no earlier pass writes")]
    PassOrder { pass: String, resource: String },
}

pub type Result<T> = std::result::Result<T, RippleError>;
