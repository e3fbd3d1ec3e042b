use crate::error::ProtocolError;
use crate::resp::Reply;
use bytes::{Buf, Bytes, BytesMut};
use std::collections::VecDeque;

const CRLF: &[u8] = b"\r\n";

/// Largest bulk string accepted from the wire (the server-side default `proto-max-bulk-len`).
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Largest element count accepted in an array header.
pub const MAX_ARRAY_LEN: i64 = 1024 * 1024 * 1024;

/// Smallest encoded element (`:0\r\n` or `+\r\n`) in bytes.
const MIN_ELEMENT_LEN: usize = 3;

/// Incremental RESP2 decoder.
///
/// Bytes pulled off a transport are fed in arbitrary chunks; complete replies are
/// handed out one by one and partial frames stay buffered until the rest arrives.
#[derive(Debug, Default)]
pub struct ReplyReader {
    buf: BytesMut,
}

impl ReplyReader {
    pub fn new() -> Self {
        Self::with_capacity(16 * 1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Appends raw bytes to the decode buffer.
    #[inline]
    pub fn feed(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of bytes not yet consumed by a decoded reply.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Decodes the next complete reply, or returns `None` if the buffer holds only a
    /// partial frame.
    pub fn next_reply(&mut self) -> Result<Option<Reply>, ProtocolError> {
        match parse(&self.buf)? {
            Some((reply, used)) => {
                self.buf.advance(used);
                Ok(Some(reply))
            }
            None => Ok(None),
        }
    }

    /// Appends every complete reply currently buffered to `out`.
    ///
    /// Replies decoded before a malformed frame stay in `out`. Returns how many were
    /// appended.
    pub fn drain_replies(&mut self, out: &mut VecDeque<Reply>) -> Result<usize, ProtocolError> {
        let mut appended = 0;
        while let Some(reply) = self.next_reply()? {
            out.push_back(reply);
            appended += 1;
        }
        Ok(appended)
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

fn parse_int(line: &[u8]) -> Result<i64, ProtocolError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| ProtocolError::InvalidHeader(String::from_utf8_lossy(line).into_owned()))
}

/// Returns the decoded reply and the number of bytes it spans.
fn parse(buf: &[u8]) -> Result<Option<(Reply, usize)>, ProtocolError> {
    let Some(&marker) = buf.first() else {
        return Ok(None);
    };
    let Some(end) = find_crlf(&buf[1..]).map(|p| p + 1) else {
        return Ok(None);
    };
    let line = &buf[1..end];
    let body = end + CRLF.len();

    match marker {
        b'+' => Ok(Some((
            Reply::Status(String::from_utf8_lossy(line).into_owned()),
            body,
        ))),
        b'-' => Ok(Some((
            Reply::Error(String::from_utf8_lossy(line).into_owned()),
            body,
        ))),
        b':' => Ok(Some((Reply::Integer(parse_int(line)?), body))),
        b'$' => {
            let len = parse_int(line)?;
            if len < 0 {
                return Ok(Some((Reply::Nil, body)));
            }
            if len > MAX_BULK_LEN {
                return Err(ProtocolError::LengthOutOfRange(len));
            }
            let len = len as usize;
            if buf.len() < body + len + CRLF.len() {
                return Ok(None);
            }
            if &buf[body + len..body + len + CRLF.len()] != CRLF {
                return Err(ProtocolError::MissingTerminator);
            }
            let data = Bytes::copy_from_slice(&buf[body..body + len]);
            Ok(Some((Reply::Bulk(data), body + len + CRLF.len())))
        }
        b'*' => {
            let count = parse_int(line)?;
            if count < 0 {
                return Ok(Some((Reply::Nil, body)));
            }
            if count > MAX_ARRAY_LEN {
                return Err(ProtocolError::LengthOutOfRange(count));
            }
            let room = (buf.len() - body) / MIN_ELEMENT_LEN;
            let mut items = Vec::with_capacity((count as usize).min(room));
            let mut pos = body;
            for _ in 0..count {
                match parse(&buf[pos..])? {
                    Some((item, used)) => {
                        items.push(item);
                        pos += used;
                    }
                    None => return Ok(None),
                }
            }
            Ok(Some((Reply::Array(items), pos)))
        }
        other => Err(ProtocolError::UnknownMarker(other)),
    }
}
