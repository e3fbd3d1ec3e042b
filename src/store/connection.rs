use crate::error::{ReadError, StoreError, StoreResult};
use crate::resp::{Reply, ReplyReader, encode_command};
use crate::store::DbConfig;
use bytes::BytesMut;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;

const READ_CHUNK: usize = 16 * 1024;
const UNIX_PREFIX: &str = "unix:";

/// Byte stream to the store.
#[derive(Debug)]
pub enum Transport {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl Transport {
    /// Opens `host:port` or `unix:/path/to/socket`.
    pub fn open(address: &str) -> io::Result<Self> {
        match address.strip_prefix(UNIX_PREFIX) {
            Some(path) => Ok(Transport::Unix(UnixStream::connect(path)?)),
            None => {
                let stream = TcpStream::connect(address)?;
                stream.set_nodelay(true)?;
                Ok(Transport::Tcp(stream))
            }
        }
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        match self {
            Transport::Tcp(s) => s.set_nonblocking(nonblocking),
            Transport::Unix(s) => s.set_nonblocking(nonblocking),
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Tcp(s) => s.read(buf),
            Transport::Unix(s) => s.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Tcp(s) => s.write(buf),
            Transport::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Tcp(s) => s.flush(),
            Transport::Unix(s) => s.flush(),
        }
    }
}

impl AsRawFd for Transport {
    fn as_raw_fd(&self) -> RawFd {
        match self {
            Transport::Tcp(s) => s.as_raw_fd(),
            Transport::Unix(s) => s.as_raw_fd(),
        }
    }
}

/// Blocking connection to a RESP store with a buffered reply decoder.
///
/// Request/response commands go through [`Connection::command`]. Pub/sub commands are
/// written with [`Connection::send_command`] and their confirmations arrive later on
/// the same stream, next to the notifications.
#[derive(Debug)]
pub struct Connection {
    transport: Transport,
    reader: ReplyReader,
    write_buf: BytesMut,
    chunk: Vec<u8>,
    db_id: u32,
}

impl Connection {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            reader: ReplyReader::new(),
            write_buf: BytesMut::with_capacity(1024),
            chunk: vec![0u8; READ_CHUNK],
            db_id: 0,
        }
    }

    /// Connects to `address` without selecting a database.
    pub fn open(address: &str) -> StoreResult<Self> {
        Ok(Self::new(Transport::open(address)?))
    }

    /// Connects to the database described by `cfg`.
    pub fn connect(cfg: &DbConfig) -> StoreResult<Self> {
        let mut conn = Self::open(&cfg.address)?;
        if cfg.db_id != 0 {
            conn.select_db(cfg.db_id)?;
        }
        Ok(conn)
    }

    #[inline]
    pub fn fd(&self) -> RawFd {
        self.transport.as_raw_fd()
    }

    #[inline]
    pub fn db_id(&self) -> u32 {
        self.db_id
    }

    /// Writes a command without waiting for its reply.
    pub fn send_command<S: AsRef<[u8]>>(&mut self, args: &[S]) -> StoreResult<()> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);
        self.transport.write_all(&self.write_buf)?;
        Ok(())
    }

    /// Writes a command and blocks for its reply. Error replies become `StoreError::Reply`.
    pub fn command<S: AsRef<[u8]>>(&mut self, args: &[S]) -> StoreResult<Reply> {
        self.send_command(args)?;
        match self.read_reply()? {
            Reply::Error(msg) => Err(StoreError::Reply(msg)),
            reply => Ok(reply),
        }
    }

    pub fn select_db(&mut self, db_id: u32) -> StoreResult<()> {
        self.command(&["SELECT".to_string(), db_id.to_string()])?;
        self.db_id = db_id;
        Ok(())
    }

    pub fn set_client_name(&mut self, name: &str) -> StoreResult<()> {
        self.command(&["CLIENT", "SETNAME", name])?;
        Ok(())
    }

    pub fn ping(&mut self) -> StoreResult<()> {
        match self.command(&["PING"])? {
            Reply::Status(s) if s == "PONG" => Ok(()),
            _ => Err(StoreError::Unexpected("PING")),
        }
    }

    /// `SUBSCRIBE`; `channels` may hold several space-separated names.
    pub fn subscribe(&mut self, channels: &str) -> StoreResult<()> {
        self.pubsub_command("SUBSCRIBE", channels)
    }

    /// `PSUBSCRIBE`; `patterns` may hold several space-separated patterns.
    pub fn psubscribe(&mut self, patterns: &str) -> StoreResult<()> {
        self.pubsub_command("PSUBSCRIBE", patterns)
    }

    pub fn unsubscribe(&mut self, channels: &str) -> StoreResult<()> {
        self.pubsub_command("UNSUBSCRIBE", channels)
    }

    pub fn punsubscribe(&mut self, patterns: &str) -> StoreResult<()> {
        self.pubsub_command("PUNSUBSCRIBE", patterns)
    }

    fn pubsub_command(&mut self, verb: &str, targets: &str) -> StoreResult<()> {
        let mut args = Vec::with_capacity(4);
        args.push(verb);
        args.extend(targets.split_whitespace());
        self.send_command(&args)
    }

    /// Blocks until one complete reply is available.
    pub fn read_reply(&mut self) -> Result<Reply, ReadError> {
        loop {
            if let Some(reply) = self.reader.next_reply()? {
                return Ok(reply);
            }
            let n = loop {
                match self.transport.read(&mut self.chunk) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(ReadError::Io(e)),
                }
            };
            if n == 0 {
                return Err(ReadError::Closed);
            }
            self.reader.feed(&self.chunk[..n]);
        }
    }

    /// Pulls every byte the socket holds right now without blocking and appends each
    /// complete reply to `out` in arrival order.
    ///
    /// Replies decoded before a failure are still appended. Returns the number of
    /// replies appended.
    pub fn read_available(&mut self, out: &mut VecDeque<Reply>) -> Result<usize, ReadError> {
        self.transport.set_nonblocking(true)?;
        let mut failure: Option<ReadError> = None;
        loop {
            match self.transport.read(&mut self.chunk) {
                Ok(0) => {
                    failure = Some(ReadError::Closed);
                    break;
                }
                Ok(n) => self.reader.feed(&self.chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    failure = Some(ReadError::Io(e));
                    break;
                }
            }
        }
        let restored = self.transport.set_nonblocking(false);

        let decoded = self.reader.drain_replies(out);

        if let Some(err) = failure {
            return Err(err);
        }
        let appended = decoded?;
        restored?;
        Ok(appended)
    }
}
