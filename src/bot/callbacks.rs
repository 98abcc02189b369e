//! Typed callback payloads for inline keyboard buttons.
//!
//! Every button encodes a [`CallbackAction`]; the transport boundary
//! decodes it exactly once and handlers only ever see the enum. Payloads
//! stay well under Telegram's 64-byte callback-data limit.

use crate::provider::MediaKind;

/// Decoded inline-button event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Navigate the owner's session to `page`
    Page { page: usize, owner: i64 },
    /// Tear down the owner's session
    Cancel { owner: i64 },
    /// Download the result at global `index` as `kind`
    Download {
        kind: MediaKind,
        index: usize,
        owner: i64,
    },
    /// The page indicator button; acknowledged and ignored
    Noop,
}

impl CallbackAction {
    /// Serialize for `callback_data`. Inverse of [`Self::parse`].
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Page { page, owner } => format!("page:{page}:{owner}"),
            Self::Cancel { owner } => format!("cancel:{owner}"),
            Self::Download { kind, index, owner } => {
                format!("dl:{}:{index}:{owner}", kind.as_str())
            }
            Self::Noop => "noop".to_string(),
        }
    }

    /// Decode a `callback_data` string. `None` for anything malformed,
    /// which callers treat as a stale or foreign button press.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        let mut parts = data.split(':');
        let action = match parts.next()? {
            "page" => Self::Page {
                page: parts.next()?.parse().ok()?,
                owner: parts.next()?.parse().ok()?,
            },
            "cancel" => Self::Cancel {
                owner: parts.next()?.parse().ok()?,
            },
            "dl" => Self::Download {
                kind: MediaKind::parse(parts.next()?)?,
                index: parts.next()?.parse().ok()?,
                owner: parts.next()?.parse().ok()?,
            },
            "noop" => Self::Noop,
            _ => return None,
        };
        // Trailing garbage means this was never one of ours
        if parts.next().is_some() {
            return None;
        }
        Some(action)
    }

    /// The user who started the search this button belongs to, when the
    /// action carries one.
    #[must_use]
    pub const fn owner(&self) -> Option<i64> {
        match self {
            Self::Page { owner, .. } | Self::Cancel { owner } | Self::Download { owner, .. } => {
                Some(*owner)
            }
            Self::Noop => None,
        }
    }

    /// Ownership rule: only the user who initiated the search may act on
    /// its buttons. `Noop` is owner-free and always permitted.
    #[must_use]
    pub fn permits(&self, acting_user: i64) -> bool {
        self.owner().is_none_or(|owner| owner == acting_user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_parse_roundtrip() {
        let actions = [
            CallbackAction::Page { page: 2, owner: 123_456 },
            CallbackAction::Cancel { owner: 9 },
            CallbackAction::Download {
                kind: MediaKind::Video,
                index: 11,
                owner: 42,
            },
            CallbackAction::Noop,
        ];
        for action in actions {
            let encoded = action.encode();
            assert!(encoded.len() <= 64, "callback data fits Telegram limit");
            assert_eq!(CallbackAction::parse(&encoded), Some(action));
        }
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        for data in [
            "",
            "page",
            "page:x:1",
            "page:1",
            "dl:podcast:0:1",
            "dl:audio:0",
            "cancel:1:extra",
            "selfdestruct:1",
        ] {
            assert_eq!(CallbackAction::parse(data), None, "{data:?}");
        }
    }

    #[test]
    fn ownership_rule() {
        let action = CallbackAction::Page { page: 0, owner: 10 };
        assert!(action.permits(10));
        assert!(!action.permits(11));
        assert!(CallbackAction::Noop.permits(11));
    }
}
