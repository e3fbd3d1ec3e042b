use crate::resp::Reply;
use serde::Serialize;
use std::fmt;

/// Channel namespace of key-space notifications.
pub const KEYSPACE_PREFIX: &str = "__keyspace";

const PMESSAGE: &str = "pmessage";
const MESSAGE: &str = "message";

/// A translated notification. An empty `kind` marks a reply that was not a
/// notification (subscribe confirmations, keepalives); such messages never leave
/// the subscriber.
pub trait Notification {
    fn kind(&self) -> &str;

    /// Pattern (or exact channel) the notification was delivered for.
    fn pattern(&self) -> &str;
}

/// Turns a raw pub/sub reply into a typed message.
pub trait ReplyTranslator {
    type Message: Notification;

    fn translate(&self, reply: &Reply) -> Self::Message;
}

/// Key-space event: `kind` is the operation (`hset`, `del`, ...), `key` the affected key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyspaceMessage {
    pub kind: String,
    pub key: String,
    pub pattern: String,
}

impl Notification for KeyspaceMessage {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Display for KeyspaceMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.key, self.pattern)
    }
}

/// Plain pub/sub message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelMessage {
    /// `message` or `pmessage`.
    pub kind: String,
    pub channel: String,
    pub pattern: String,
    pub payload: String,
}

impl Notification for ChannelMessage {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// Fields of a `message` / `pmessage` push.
struct PushFrame<'a> {
    kind: &'a str,
    pattern: Option<&'a str>,
    channel: &'a str,
    payload: &'a str,
}

impl<'a> PushFrame<'a> {
    fn parse(reply: &'a Reply) -> Option<Self> {
        let items = reply.as_array()?;
        let kind = items.first()?.as_str()?;
        match (kind, items.len()) {
            (PMESSAGE, 4) => Some(Self {
                kind: PMESSAGE,
                pattern: Some(items[1].as_str()?),
                channel: items[2].as_str()?,
                payload: items[3].as_str()?,
            }),
            (MESSAGE, 3) => Some(Self {
                kind: MESSAGE,
                pattern: None,
                channel: items[1].as_str()?,
                payload: items[2].as_str()?,
            }),
            _ => None,
        }
    }

    /// The pattern that matched, or the channel itself for exact subscriptions.
    fn subscription(&self) -> &'a str {
        self.pattern.unwrap_or(self.channel)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeyspaceTranslator;

impl ReplyTranslator for KeyspaceTranslator {
    type Message = KeyspaceMessage;

    fn translate(&self, reply: &Reply) -> KeyspaceMessage {
        let Some(frame) = PushFrame::parse(reply) else {
            return KeyspaceMessage::default();
        };
        let Some((_, key)) = frame.channel.split_once("__:") else {
            return KeyspaceMessage::default();
        };
        KeyspaceMessage {
            kind: frame.payload.to_string(),
            key: key.to_string(),
            pattern: frame.subscription().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelTranslator;

impl ReplyTranslator for ChannelTranslator {
    type Message = ChannelMessage;

    fn translate(&self, reply: &Reply) -> ChannelMessage {
        match PushFrame::parse(reply) {
            Some(frame) => ChannelMessage {
                kind: frame.kind.to_string(),
                channel: frame.channel.to_string(),
                pattern: frame.subscription().to_string(),
                payload: frame.payload.to_string(),
            },
            None => ChannelMessage::default(),
        }
    }
}

/// Key-space channel pattern `__keyspace@<db>__:<table>:<glob>`.
pub fn keyspace_pattern(db_id: u32, table: &str, glob: &str) -> String {
    format!("{KEYSPACE_PREFIX}@{db_id}__:{table}:{glob}")
}
