use crate::config::SubscriberConfig;
use crate::error::{ReadError, StoreResult};
use crate::select::{Selectable, ServiceClock};
use crate::store::{Connection, DbConfig, DbRegistry};
use crate::subscriber::{ChannelSet, KeyspaceTranslator, ReplyTranslator};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::os::fd::RawFd;
use std::rc::Rc;

/// Selectable that multiplexes any number of channel and pattern subscriptions over
/// one store connection.
///
/// Every reply pulled off the socket during a read cycle is buffered; `pops` drains
/// the buffer through the translator `T`, dropping non-notifications and
/// notifications for patterns that are no longer subscribed.
pub struct MultiChannelSubscriber<T: ReplyTranslator> {
    conn: Connection,
    channels: ChannelSet,
    translator: T,
    priority: i32,
    name: String,
    clock: ServiceClock,
}

impl<T: ReplyTranslator> MultiChannelSubscriber<T> {
    pub fn new(conn: Connection, priority: i32, name: impl Into<String>, translator: T) -> Self {
        Self {
            conn,
            channels: ChannelSet::new(),
            translator,
            priority,
            name: name.into(),
            clock: ServiceClock::default(),
        }
    }

    /// Opens a dedicated connection to `db` and tags it with `name`.
    pub fn connect(db: &DbConfig, priority: i32, name: impl Into<String>) -> StoreResult<Self>
    where
        T: Default,
    {
        let name = name.into();
        let mut conn = Connection::connect(db)?;
        if !name.is_empty() {
            conn.set_client_name(&name)?;
        }
        tracing::debug!(
            "[{}] connected to {} (db {}) at {}",
            name,
            db.name,
            db.db_id,
            db.address
        );
        Ok(Self::new(conn, priority, name, T::default()))
    }

    /// Wraps the subscriber for registration with a reactor.
    pub fn into_shared(self) -> Rc<RefCell<Self>>
    where
        T: 'static,
    {
        Rc::new(RefCell::new(self))
    }

    pub fn subscribe(&mut self, channel: &str) -> StoreResult<()> {
        self.conn.subscribe(channel)?;
        self.channels.insert(channel);
        Ok(())
    }

    pub fn psubscribe(&mut self, pattern: &str) -> StoreResult<()> {
        self.conn.psubscribe(pattern)?;
        self.channels.insert(pattern);
        Ok(())
    }

    pub fn unsubscribe(&mut self, channel: &str) -> StoreResult<()> {
        self.conn.unsubscribe(channel)?;
        self.channels.remove(channel);
        Ok(())
    }

    pub fn punsubscribe(&mut self, pattern: &str) -> StoreResult<()> {
        self.conn.punsubscribe(pattern)?;
        self.channels.remove(pattern);
        Ok(())
    }

    /// Subscribes to all `channels` with a single command.
    pub fn subscribe_bulk<S: AsRef<str>>(&mut self, channels: &[S]) -> StoreResult<()> {
        self.conn.subscribe(&ChannelSet::join(channels))?;
        self.channels.insert_all(channels);
        Ok(())
    }

    pub fn psubscribe_bulk<S: AsRef<str>>(&mut self, patterns: &[S]) -> StoreResult<()> {
        self.conn.psubscribe(&ChannelSet::join(patterns))?;
        self.channels.insert_all(patterns);
        Ok(())
    }

    pub fn unsubscribe_bulk<S: AsRef<str>>(&mut self, channels: &[S]) -> StoreResult<()> {
        self.conn.unsubscribe(&ChannelSet::join(channels))?;
        self.channels.remove_all(channels);
        Ok(())
    }

    pub fn punsubscribe_bulk<S: AsRef<str>>(&mut self, patterns: &[S]) -> StoreResult<()> {
        self.conn.punsubscribe(&ChannelSet::join(patterns))?;
        self.channels.remove_all(patterns);
        Ok(())
    }

    /// Drains every buffered reply into validated messages, in arrival order.
    pub fn pops(&mut self) -> VecDeque<T::Message> {
        self.channels.drain(&self.translator)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.channels.patterns()
    }

    #[inline]
    pub fn is_subscribed(&self, pattern: &str) -> bool {
        self.channels.contains(pattern)
    }

    /// Replies read but not yet popped.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.channels.buffered()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl MultiChannelSubscriber<KeyspaceTranslator> {
    /// Builds a key-space subscriber from config: one connection to the configured
    /// database, one bulk pattern subscription covering every configured table.
    pub fn from_config(registry: &DbRegistry, cfg: &SubscriberConfig) -> StoreResult<Self> {
        let db = registry.get(&cfg.db)?;
        let mut sub = Self::connect(db, cfg.priority, cfg.name.clone())?;

        let mut patterns: Vec<String> = cfg
            .tables
            .iter()
            .map(|table| db.keyspace_pattern(table))
            .collect();
        patterns.extend(cfg.patterns.iter().cloned());

        if !patterns.is_empty() {
            sub.psubscribe_bulk(&patterns)?;
        }
        tracing::info!("[{}] subscribed to {} patterns", sub.name, patterns.len());
        Ok(sub)
    }
}

impl<T: ReplyTranslator> Selectable for MultiChannelSubscriber<T> {
    fn fd(&self) -> RawFd {
        self.conn.fd()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn max_events(&self) -> u64 {
        self.channels.len() as u64
    }

    fn has_data(&self) -> bool {
        self.channels.has_data()
    }

    fn has_cached_data(&self) -> bool {
        self.channels.has_cached_data()
    }

    fn read_data(&mut self) -> Result<u64, ReadError> {
        let appended = self.conn.read_available(self.channels.buffer_mut())?;
        tracing::trace!("[{}] buffered {} replies", self.name, appended);
        Ok(appended as u64)
    }

    fn last_used_time(&self) -> u64 {
        self.clock.last_used()
    }

    fn update_last_used_time(&mut self, tick: u64) {
        self.clock.touch(tick);
    }
}
