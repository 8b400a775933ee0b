use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::SessionId;

/// Recognized notification topics.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Topic {
    /// Any successful add/remove/update/clear on a cart.
    CartChanged,
    /// Product data was added, edited or deleted.
    CatalogChanged,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::CartChanged => "cartChanged",
            Topic::CatalogChanged => "catalogChanged",
        }
    }
}

impl core::fmt::Display for Topic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state-change signal delivered through the bus.
///
/// Notifications carry no payload beyond their origin: subscribers re-read the
/// state they care about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    topic: Topic,
    /// Session that caused the change, when known.
    origin: Option<SessionId>,
    occurred_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(topic: Topic) -> Self {
        Self {
            topic,
            origin: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn from_session(topic: Topic, origin: SessionId) -> Self {
        Self {
            origin: Some(origin),
            ..Self::new(topic)
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn origin(&self) -> Option<SessionId> {
        self.origin
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// True when the change came from a session other than `session`.
    ///
    /// Notifications without an origin count as foreign.
    pub fn is_foreign_to(&self, session: SessionId) -> bool {
        self.origin != Some(session)
    }
}
