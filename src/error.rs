use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A user supplied token, mask, window or setting is malformed.
    #[error("{0}")]
    Validation(String),

    /// The endpoint string and the port override name different TCP ports.
    #[error("TCP port mismatch: endpoint specifies {endpoint} but --port specifies {flag}")]
    PortConflict { endpoint: u16, flag: u16 },

    #[error("unsupported endpoint scheme (expected tcp or rtu): {0}")]
    UnsupportedScheme(String),

    #[error("--port is only valid for TCP endpoints")]
    PortNotAllowed,

    /// The device answered with a Modbus exception.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The transport failed or the device could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("failed to read configuration [{0}]")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
