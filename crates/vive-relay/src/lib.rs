//! Answer tracker-name datagrams with the tracker's pose as JSON.
//!
//! A client sends the bare device name (surrounding whitespace ignored). If
//! the registry knows the device the reply is a pretty-printed
//! [`TrackerMessage`] followed by `;`. Unknown or empty names get no reply.

mod message;
mod registry;
mod server;

pub use message::TrackerMessage;
pub use registry::{DeviceRegistry, DeviceSample, StaticRegistry};
pub use server::RelayServer;

#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
