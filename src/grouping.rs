//! Partitioning of fetched messages into content groups (albums and singles)

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::types::{GroupKey, Message, MessageId};
use crate::utils::sanitize_name;

/// Placeholder shown for groups without any text
const NO_DESCRIPTION: &str = "<No Description>";

/// One downloadable unit: an album, or a single message
///
/// Messages are kept sorted by ascending id; every derived field relies on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentGroup {
    messages: Vec<Message>,
}

impl ContentGroup {
    /// Build a group, ordering messages by id
    ///
    /// Returns `None` for an empty message list.
    pub fn new(mut messages: Vec<Message>) -> Option<Self> {
        if messages.is_empty() {
            return None;
        }
        messages.sort_by_key(|m| m.id);
        Some(Self { messages })
    }

    /// Messages in ascending id order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Earliest message (by id)
    pub fn first(&self) -> &Message {
        // Construction guarantees at least one message
        &self.messages[0]
    }

    /// Timestamp of the earliest message
    pub fn anchor_date(&self) -> DateTime<Utc> {
        self.first().timestamp
    }

    /// First non-empty text in id order, or empty
    pub fn description(&self) -> &str {
        self.messages
            .iter()
            .find_map(Message::text)
            .unwrap_or_default()
    }

    /// Sanitized folder name, falling back to `<YYYY-MM-DD>_Msg<id>`
    pub fn folder_name(&self) -> String {
        let sanitized = sanitize_name(self.description());
        if sanitized.is_empty() {
            fallback_folder_name(self.first())
        } else {
            sanitized
        }
    }

    /// Number of messages carrying media
    pub fn media_count(&self) -> usize {
        self.messages.iter().filter(|m| m.has_media()).count()
    }

    /// One-line description for listings
    pub fn preview(&self, max_chars: usize) -> String {
        let description = self.description();
        if description.is_empty() {
            return NO_DESCRIPTION.to_string();
        }
        description
            .chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
            .take(max_chars)
            .collect()
    }

    /// Whether this group holds the given message
    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.binary_search_by_key(&id, |m| m.id).is_ok()
    }
}

/// Folder name used when a group has no usable description
pub(crate) fn fallback_folder_name(message: &Message) -> String {
    format!("{}_Msg{}", message.timestamp.format("%Y-%m-%d"), message.id)
}

/// Partition messages into content groups ordered by anchor date
///
/// Messages sharing a group key form one album; every other message is its own
/// group. Albums come first in the order their key was first seen, followed by
/// singles in input order; a stable sort by anchor date then preserves that
/// discovery order between equal dates.
pub fn build_groups(messages: impl IntoIterator<Item = Message>) -> Vec<ContentGroup> {
    let mut album_order: Vec<GroupKey> = Vec::new();
    let mut albums: HashMap<GroupKey, Vec<Message>> = HashMap::new();
    let mut singles: Vec<Message> = Vec::new();

    for message in messages {
        match message.group_id.clone() {
            Some(key) => {
                let bucket = albums.entry(key.clone()).or_insert_with(|| {
                    album_order.push(key);
                    Vec::new()
                });
                bucket.push(message);
            }
            None => singles.push(message),
        }
    }

    let mut groups: Vec<ContentGroup> = album_order
        .into_iter()
        .filter_map(|key| albums.remove(&key))
        .chain(singles.into_iter().map(|m| vec![m]))
        .filter_map(ContentGroup::new)
        .collect();

    // Vec::sort_by_key is stable
    groups.sort_by_key(ContentGroup::anchor_date);

    tracing::debug!(groups = groups.len(), "Built content groups");
    groups
}
