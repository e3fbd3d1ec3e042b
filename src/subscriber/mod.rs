//! Pub/sub event sources that buffer raw replies and hand out validated messages.

mod channels;
mod message;
mod multi;

pub use channels::ChannelSet;
pub use message::{
    ChannelMessage, ChannelTranslator, KEYSPACE_PREFIX, KeyspaceMessage, KeyspaceTranslator,
    Notification, ReplyTranslator, keyspace_pattern,
};
pub use multi::MultiChannelSubscriber;

/// Subscriber for key-space notifications.
pub type PatternSubscriber = MultiChannelSubscriber<KeyspaceTranslator>;

/// Subscriber for plain notification channels.
pub type ChannelSubscriber = MultiChannelSubscriber<ChannelTranslator>;
