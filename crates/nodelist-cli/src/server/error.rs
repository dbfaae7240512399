//! Failures of the HTTP listener.

use std::io;

use thiserror::Error;

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be opened.
    #[error("cannot listen on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The accept loop stopped with an I/O error.
    #[error("server stopped unexpectedly: {0}")]
    Runtime(#[source] io::Error),
}

impl ServerError {
    pub fn bind(address: impl ToString, source: io::Error) -> Self {
        Self::Bind {
            address: address.to_string(),
            source,
        }
    }

    /// Stable identifier for log aggregation.
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Bind { .. } => "bind",
            Self::Runtime(_) => "runtime",
        }
    }

    /// Operator hint for the common bind failures.
    pub fn suggestion(&self) -> Option<&'static str> {
        let Self::Bind { source, .. } = self else {
            return None;
        };

        match source.kind() {
            io::ErrorKind::PermissionDenied => Some("use --port 1024 or above"),
            io::ErrorKind::AddrInUse => {
                Some("another process holds this port, choose another --port")
            }
            io::ErrorKind::AddrNotAvailable => Some("--host is not an address of this machine"),
            _ => None,
        }
    }
}
