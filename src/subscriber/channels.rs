use crate::resp::Reply;
use crate::subscriber::{Notification, ReplyTranslator};
use std::collections::{BTreeSet, VecDeque};

/// Active subscriptions plus the FIFO of replies read but not yet popped.
///
/// The buffer only grows during a read cycle and only shrinks through [`ChannelSet::drain`].
#[derive(Debug, Default)]
pub struct ChannelSet {
    patterns: BTreeSet<String>,
    buffer: VecDeque<Reply>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Space-joined list, order preserved, as sent in one bulk command.
    pub fn join<S: AsRef<str>>(patterns: &[S]) -> String {
        patterns
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn insert(&mut self, pattern: &str) {
        self.patterns.insert(pattern.to_string());
    }

    pub fn remove(&mut self, pattern: &str) {
        self.patterns.remove(pattern);
    }

    pub fn insert_all<S: AsRef<str>>(&mut self, patterns: &[S]) {
        self.patterns
            .extend(patterns.iter().map(|p| p.as_ref().to_string()));
    }

    pub fn remove_all<S: AsRef<str>>(&mut self, patterns: &[S]) {
        for p in patterns {
            self.patterns.remove(p.as_ref());
        }
    }

    #[inline]
    pub fn contains(&self, pattern: &str) -> bool {
        self.patterns.contains(pattern)
    }

    /// Number of active patterns.
    #[inline]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    #[inline]
    pub fn buffer_mut(&mut self) -> &mut VecDeque<Reply> {
        &mut self.buffer
    }

    #[inline]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn has_data(&self) -> bool {
        !self.buffer.is_empty()
    }

    #[inline]
    pub fn has_cached_data(&self) -> bool {
        self.buffer.len() > 1
    }

    /// Empties the buffer into translated messages, in arrival order.
    ///
    /// Replies that are not notifications are skipped. Notifications for patterns no
    /// longer active are logged and dropped.
    pub fn drain<T: ReplyTranslator>(&mut self, translator: &T) -> VecDeque<T::Message> {
        let mut out = VecDeque::with_capacity(self.buffer.len());
        while let Some(reply) = self.buffer.pop_front() {
            let msg = translator.translate(&reply);
            if msg.kind().is_empty() {
                continue;
            }
            if !self.patterns.contains(msg.pattern()) {
                tracing::error!(
                    "[Subscriber] notification for unsubscribed pattern {}, dropped",
                    msg.pattern()
                );
                continue;
            }
            out.push_back(msg);
        }
        out
    }
}
