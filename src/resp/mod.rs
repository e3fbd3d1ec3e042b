//! RESP2 wire codec: command encoding and incremental reply decoding.

mod reader;
mod reply;

pub use reader::{MAX_ARRAY_LEN, MAX_BULK_LEN, ReplyReader};
pub use reply::Reply;

use bytes::{BufMut, BytesMut};

/// Encodes a command as an array of bulk strings.
pub fn encode_command<S: AsRef<[u8]>>(args: &[S], buf: &mut BytesMut) {
    buf.put_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        let arg = arg.as_ref();
        buf.put_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.put_slice(arg);
        buf.put_slice(b"\r\n");
    }
}
