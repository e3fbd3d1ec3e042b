// error.rs
use std::os::fd::RawFd;
use std::{error::Error, fmt, io};

const ERR_MSG_CONNECTION_CLOSED: &str = "connection closed by peer";
const ERR_MSG_UNEXPECTED_REPLY: &str = "unexpected reply type";
const ERR_MSG_POLL_CREATE: &str = "failed to create readiness poller";

/// Malformed data on the wire.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ProtocolError {
    /// First byte of a frame is not a known RESP type marker.
    UnknownMarker(u8),
    /// A length or integer header could not be parsed.
    InvalidHeader(String),
    /// Bulk payload was not terminated by CRLF.
    MissingTerminator,
    /// Bulk length or array count above the accepted limit.
    LengthOutOfRange(i64),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnknownMarker(b) => write!(f, "unknown reply marker: 0x{b:02x}"),
            ProtocolError::InvalidHeader(h) => write!(f, "invalid header: {h}"),
            ProtocolError::MissingTerminator => write!(f, "bulk string is not terminated"),
            ProtocolError::LengthOutOfRange(n) => write!(f, "length {n} exceeds protocol limit"),
        }
    }
}

impl Error for ProtocolError {}

/// Failure while pulling replies off a readable transport.
///
/// Raised by `Selectable::read_data`; the reactor turns it into `SelectOutcome::Error`.
#[derive(Debug)]
pub enum ReadError {
    Io(io::Error),
    Closed,
    Protocol(ProtocolError),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Io(e) => write!(f, "unable to read reply: {e}"),
            ReadError::Closed => write!(f, "{ERR_MSG_CONNECTION_CLOSED}"),
            ReadError::Protocol(e) => write!(f, "unable to decode reply: {e}"),
        }
    }
}

impl Error for ReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReadError::Io(e) => Some(e),
            ReadError::Protocol(e) => Some(e),
            ReadError::Closed => None,
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> Self {
        ReadError::Io(err)
    }
}

impl From<ProtocolError> for ReadError {
    fn from(err: ProtocolError) -> Self {
        ReadError::Protocol(err)
    }
}

/// Kernel multiplexer failures. These are not recoverable for the reactor instance.
#[derive(Debug)]
pub enum SelectError {
    Create(io::Error),
    Register { fd: RawFd, source: io::Error },
    Deregister { fd: RawFd, source: io::Error },
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectError::Create(e) => write!(f, "{ERR_MSG_POLL_CREATE}: {e}"),
            SelectError::Register { fd, source } => {
                write!(f, "failed to register fd {fd}: {source}")
            }
            SelectError::Deregister { fd, source } => {
                write!(f, "failed to deregister fd {fd}: {source}")
            }
        }
    }
}

impl Error for SelectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SelectError::Create(e) => Some(e),
            SelectError::Register { source, .. } => Some(source),
            SelectError::Deregister { source, .. } => Some(source),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures on the command path of a store connection.
#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Protocol(ProtocolError),
    /// The store answered with an error reply.
    Reply(String),
    UnknownDatabase(String),
    Unexpected(&'static str),
    Closed,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "store i/o error: {e}"),
            StoreError::Protocol(e) => write!(f, "store protocol error: {e}"),
            StoreError::Reply(s) => write!(f, "store replied with error: {s}"),
            StoreError::UnknownDatabase(name) => write!(f, "unknown database: {name}"),
            StoreError::Unexpected(what) => write!(f, "{ERR_MSG_UNEXPECTED_REPLY}: {what}"),
            StoreError::Closed => write!(f, "{ERR_MSG_CONNECTION_CLOSED}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            StoreError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl From<ProtocolError> for StoreError {
    fn from(err: ProtocolError) -> Self {
        StoreError::Protocol(err)
    }
}

impl From<ReadError> for StoreError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Io(e) => StoreError::Io(e),
            ReadError::Closed => StoreError::Closed,
            ReadError::Protocol(e) => StoreError::Protocol(e),
        }
    }
}
