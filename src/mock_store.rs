//! Minimal in-process key-value store speaking RESP2, used by tests that need a real
//! socket peer publishing key-space notifications.

use crate::resp::{Reply, ReplyReader};
use crate::utils::StopToken;
use bytes::BytesMut;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const DATABASES: u32 = 16;

#[derive(Debug, Clone)]
enum Value {
    Str(Vec<u8>),
    Hash(BTreeMap<Vec<u8>, Vec<u8>>),
}

struct Client {
    out: TcpStream,
    db: u32,
    channels: HashSet<String>,
    patterns: Vec<(String, Regex)>,
}

impl Client {
    fn send(&mut self, reply: &Reply) {
        let mut buf = BytesMut::new();
        reply.encode(&mut buf);
        if let Err(e) = self.out.write_all(&buf) {
            tracing::debug!("[MockStore] client write failed: {e}");
        }
    }

    fn subscriptions(&self) -> usize {
        self.channels.len() + self.patterns.len()
    }
}

#[derive(Default)]
struct State {
    data: HashMap<u32, HashMap<Vec<u8>, Value>>,
    clients: HashMap<u64, Client>,
}

impl State {
    /// Publishes `op` on `__keyspace@<db>__:<key>` to every matching subscriber.
    fn notify(&mut self, db: u32, key: &[u8], op: &str) {
        let channel = format!("__keyspace@{db}__:{}", String::from_utf8_lossy(key));
        for client in self.clients.values_mut() {
            let matched: Vec<String> = client
                .patterns
                .iter()
                .filter(|(_, re)| re.is_match(&channel))
                .map(|(p, _)| p.clone())
                .collect();
            for pattern in matched {
                client.send(&Reply::bulk_array(&[
                    "pmessage",
                    pattern.as_str(),
                    channel.as_str(),
                    op,
                ]));
            }
            if client.channels.contains(&channel) {
                client.send(&Reply::bulk_array(&["message", channel.as_str(), op]));
            }
        }
    }

    fn db(&mut self, id: u32) -> &mut HashMap<Vec<u8>, Value> {
        self.data.entry(id).or_default()
    }
}

/// Translates a glob (`*`, `?`, `[...]`) into an anchored regex.
pub fn glob_to_regex(glob: &str) -> Regex {
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');
    let mut in_class = false;
    for ch in glob.chars() {
        match ch {
            '*' if !in_class => out.push_str(".*"),
            '?' if !in_class => out.push('.'),
            '[' if !in_class => {
                in_class = true;
                out.push('[');
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            c if in_class => out.push(c),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).unwrap_or_else(|_| Regex::new("^$").unwrap())
}

/// Running store. Dropping it stops accepting and closes every client.
pub struct MockStore {
    addr: String,
    state: Arc<Mutex<State>>,
    stop: StopToken,
    acceptor: Option<JoinHandle<()>>,
}

impl MockStore {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let state = Arc::new(Mutex::new(State::default()));
        let stop = StopToken::new();

        let acceptor = {
            let state = state.clone();
            let stop = stop.clone();
            thread::Builder::new()
                .name("mock-store".into())
                .spawn(move || accept_loop(listener, state, stop))
                .unwrap()
        };

        Self {
            addr,
            state,
            stop,
            acceptor: Some(acceptor),
        }
    }

    pub fn address(&self) -> &str {
        &self.addr
    }

    /// Total channel and pattern subscriptions held by connected clients.
    pub fn subscriptions(&self) -> usize {
        self.state
            .lock()
            .clients
            .values()
            .map(Client::subscriptions)
            .sum()
    }

    /// Waits until exactly `n` subscriptions are registered.
    pub fn wait_for_subscriptions(&self, n: usize, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if self.subscriptions() == n {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    /// Drops every connected client, as a server restart would.
    pub fn disconnect_all(&self) {
        for (_, client) in self.state.lock().clients.drain() {
            let _ = client.out.shutdown(Shutdown::Both);
        }
    }
}

impl Drop for MockStore {
    fn drop(&mut self) {
        self.stop.stop();
        // wake the blocking accept
        let _ = TcpStream::connect(&self.addr);
        self.disconnect_all();
        if let Some(h) = self.acceptor.take() {
            let _ = h.join();
        }
    }
}

fn accept_loop(listener: TcpListener, state: Arc<Mutex<State>>, stop: StopToken) {
    let ids = AtomicU64::new(1);
    for stream in listener.incoming() {
        if stop.is_stopped() {
            break;
        }
        let Ok(stream) = stream else { continue };
        let Ok(out) = stream.try_clone() else {
            continue;
        };
        let _ = stream.set_nodelay(true);
        let id = ids.fetch_add(1, Ordering::Relaxed);
        state.lock().clients.insert(
            id,
            Client {
                out,
                db: 0,
                channels: HashSet::new(),
                patterns: Vec::new(),
            },
        );

        let state = state.clone();
        let _ = thread::Builder::new()
            .name(format!("mock-client-{id}"))
            .spawn(move || serve(id, stream, state));
    }
}

fn serve(id: u64, mut stream: TcpStream, state: Arc<Mutex<State>>) {
    let mut reader = ReplyReader::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        reader.feed(&chunk[..n]);
        loop {
            match reader.next_reply() {
                Ok(Some(cmd)) => execute(id, &cmd, &state),
                Ok(None) => break,
                Err(_) => {
                    state.lock().clients.remove(&id);
                    return;
                }
            }
        }
    }
    state.lock().clients.remove(&id);
}

fn args_of(cmd: &Reply) -> Vec<Vec<u8>> {
    cmd.as_array()
        .unwrap_or_default()
        .iter()
        .filter_map(|r| match r {
            Reply::Bulk(b) => Some(b.to_vec()),
            Reply::Status(s) => Some(s.as_bytes().to_vec()),
            _ => None,
        })
        .collect()
}

fn text(arg: &[u8]) -> String {
    String::from_utf8_lossy(arg).into_owned()
}

fn execute(id: u64, cmd: &Reply, state: &Arc<Mutex<State>>) {
    let args = args_of(cmd);
    let Some((name, rest)) = args.split_first() else {
        return;
    };
    let verb = text(name).to_ascii_uppercase();

    let mut st = state.lock();
    let db = match st.clients.get(&id) {
        Some(c) => c.db,
        None => return,
    };

    let reply = match verb.as_str() {
        "PING" => Reply::Status("PONG".into()),
        "FLUSHALL" => {
            st.data.clear();
            Reply::Status("OK".into())
        }
        "CONFIG" => Reply::Status("OK".into()),
        "CLIENT" => Reply::Status("OK".into()),
        "SELECT" => match rest.first().and_then(|a| text(a).parse::<u32>().ok()) {
            Some(n) if n < DATABASES => {
                if let Some(c) = st.clients.get_mut(&id) {
                    c.db = n;
                }
                Reply::Status("OK".into())
            }
            _ => Reply::Error("ERR DB index is out of range".into()),
        },
        "SET" if rest.len() == 2 => {
            st.db(db)
                .insert(rest[0].clone(), Value::Str(rest[1].clone()));
            st.notify(db, &rest[0], "set");
            Reply::Status("OK".into())
        }
        "HSET" if rest.len() >= 3 && rest.len() % 2 == 1 => {
            let key = rest[0].clone();
            let entry = st
                .db(db)
                .entry(key.clone())
                .or_insert_with(|| Value::Hash(BTreeMap::new()));
            let added = match entry {
                Value::Hash(fields) => Some(
                    rest[1..]
                        .chunks(2)
                        .filter(|fv| fields.insert(fv[0].clone(), fv[1].clone()).is_none())
                        .count(),
                ),
                Value::Str(_) => None,
            };
            match added {
                Some(added) => {
                    st.notify(db, &key, "hset");
                    Reply::Integer(added as i64)
                }
                None => Reply::Error("WRONGTYPE Operation against a key holding the wrong kind of value".into()),
            }
        }
        "DEL" if !rest.is_empty() => {
            let mut removed = 0;
            for key in rest {
                if st.db(db).remove(key).is_some() {
                    removed += 1;
                    st.notify(db, key, "del");
                }
            }
            Reply::Integer(removed)
        }
        "SUBSCRIBE" | "PSUBSCRIBE" | "UNSUBSCRIBE" | "PUNSUBSCRIBE" => {
            if let Some(client) = st.clients.get_mut(&id) {
                let kind = verb.to_ascii_lowercase();
                for target in rest.iter().map(|a| text(a)) {
                    match verb.as_str() {
                        "SUBSCRIBE" => {
                            client.channels.insert(target.clone());
                        }
                        "PSUBSCRIBE" => {
                            if !client.patterns.iter().any(|(p, _)| *p == target) {
                                let re = glob_to_regex(&target);
                                client.patterns.push((target.clone(), re));
                            }
                        }
                        "UNSUBSCRIBE" => {
                            client.channels.remove(&target);
                        }
                        _ => client.patterns.retain(|(p, _)| *p != target),
                    }
                    let count = client.subscriptions() as i64;
                    client.send(&Reply::Array(vec![
                        Reply::bulk(&kind),
                        Reply::bulk(&target),
                        Reply::Integer(count),
                    ]));
                }
            }
            return;
        }
        _ => Reply::Error(format!("ERR unknown command '{verb}'")),
    };

    if let Some(client) = st.clients.get_mut(&id) {
        client.send(&reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_translation() {
        let re = glob_to_regex("__keyspace@0__:PORT:*");
        assert!(re.is_match("__keyspace@0__:PORT:Ethernet0"));
        assert!(!re.is_match("__keyspace@0__:PORT2:Ethernet0"));
        assert!(!re.is_match("__keyspace@1__:PORT:Ethernet0"));

        let re = glob_to_regex("ch?n[ab]");
        assert!(re.is_match("chana"));
        assert!(!re.is_match("chanc"));
    }
}
