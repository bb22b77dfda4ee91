//! Resolved entity model
//!
//! What the transport's identity resolution returns, and the normalized
//! reference the engine hands to it.

use std::fmt;

/// Canonical addressable peer id on the platform
pub type PeerId = i64;

/// Entity kind as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    /// Small multi-member chat
    Group,
    /// Large group (megagroup)
    Supergroup,
    /// Broadcast channel
    Channel,
}

/// A resolved platform entity
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub peer_id: PeerId,
    pub kind: EntityKind,
    pub title: Option<String>,
    pub handle: Option<String>,
}

impl Entity {
    /// Multi-member destination the engine may fan content out to
    pub fn is_group_like(&self) -> bool {
        matches!(self.kind, EntityKind::Group | EntityKind::Supergroup)
    }
}

/// Normalized target reference handed to the transport for resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetRef {
    /// Numeric peer id
    Id(PeerId),
    /// Handle or invite link, passed through verbatim
    Handle(String),
}

impl TargetRef {
    /// Normalize a stored identifier: digit strings (optionally with a
    /// leading '-') become numeric ids, everything else is a handle.
    pub fn normalize(identifier: &str) -> TargetRef {
        let trimmed = identifier.trim();
        let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = trimmed.parse::<i64>() {
                return TargetRef::Id(id);
            }
        }
        TargetRef::Handle(trimmed.to_string())
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Id(id) => write!(f, "{id}"),
            TargetRef::Handle(h) => f.write_str(h),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_numeric() {
        assert_eq!(TargetRef::normalize("12345"), TargetRef::Id(12345));
        assert_eq!(
            TargetRef::normalize("-1001234567"),
            TargetRef::Id(-1001234567)
        );
    }

    #[test]
    fn test_normalize_handle() {
        assert_eq!(
            TargetRef::normalize("@mygroup"),
            TargetRef::Handle("@mygroup".into())
        );
        assert_eq!(
            TargetRef::normalize("https://t.me/+abcdef"),
            TargetRef::Handle("https://t.me/+abcdef".into())
        );
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        assert_eq!(TargetRef::normalize(" 42 "), TargetRef::Id(42));
    }

    #[test]
    fn test_group_like_filter() {
        let group = Entity {
            peer_id: 1,
            kind: EntityKind::Group,
            title: None,
            handle: None,
        };
        let channel = Entity {
            kind: EntityKind::Channel,
            ..group.clone()
        };
        let user = Entity {
            kind: EntityKind::User,
            ..group.clone()
        };
        assert!(group.is_group_like());
        assert!(!channel.is_group_like());
        assert!(!user.is_group_like());
    }
}
