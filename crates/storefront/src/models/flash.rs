//! One-shot notifications carried across a redirect.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session::keys;

/// Flash severity, used as the CSS modifier in templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "flash--success",
            Self::Error => "flash--error",
            Self::Info => "flash--info",
        }
    }
}

/// A notification shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub title: String,
    pub message: String,
}

impl Flash {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        self.kind.css_class()
    }

    /// Store this flash for the next page. A session failure only loses the
    /// notification, so it is logged and otherwise ignored.
    pub async fn set(self, session: &Session) {
        if let Err(e) = session.insert(keys::FLASH, self).await {
            tracing::warn!(error = %e, "Failed to store flash message");
        }
    }

    /// Remove and return the pending flash, if any.
    pub async fn take(session: &Session) -> Option<Self> {
        session.remove::<Self>(keys::FLASH).await.ok().flatten()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_flash_is_shown_once() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        Flash::error("Access denied", "Admins only").set(&session).await;

        let flash = Flash::take(&session).await.unwrap();
        assert_eq!(flash.kind, FlashKind::Error);
        assert_eq!(flash.css_class(), "flash--error");
        assert!(Flash::take(&session).await.is_none());
    }
}
