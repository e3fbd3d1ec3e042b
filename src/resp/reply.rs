use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// One decoded RESP2 reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Status(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    /// Nil bulk string (`$-1`) or nil array (`*-1`).
    Nil,
    Array(Vec<Reply>),
}

impl Reply {
    /// Builds a bulk reply from anything byte-like.
    pub fn bulk(value: impl AsRef<[u8]>) -> Self {
        Reply::Bulk(Bytes::copy_from_slice(value.as_ref()))
    }

    /// Builds an array of bulk strings.
    pub fn bulk_array<S: AsRef<[u8]>>(items: &[S]) -> Self {
        Reply::Array(items.iter().map(Reply::bulk).collect())
    }

    /// Textual view of status and bulk replies. Returns `None` for non-UTF-8 bulks.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Reply::Status(s) => Some(s.as_str()),
            Reply::Bulk(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&[Reply]> {
        match self {
            Reply::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Reply::Integer(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Serializes the reply in wire format.
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Reply::Status(s) => {
                buf.put_u8(b'+');
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            Reply::Error(s) => {
                buf.put_u8(b'-');
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            Reply::Integer(v) => {
                buf.put_slice(format!(":{v}\r\n").as_bytes());
            }
            Reply::Bulk(b) => {
                buf.put_slice(format!("${}\r\n", b.len()).as_bytes());
                buf.put_slice(b);
                buf.put_slice(b"\r\n");
            }
            Reply::Nil => buf.put_slice(b"$-1\r\n"),
            Reply::Array(items) => {
                buf.put_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    item.encode(buf);
                }
            }
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Status(s) => write!(f, "{s}"),
            Reply::Error(s) => write!(f, "(error) {s}"),
            Reply::Integer(v) => write!(f, "(integer) {v}"),
            Reply::Bulk(b) => write!(f, "\"{}\"", String::from_utf8_lossy(b)),
            Reply::Nil => write!(f, "(nil)"),
            Reply::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
