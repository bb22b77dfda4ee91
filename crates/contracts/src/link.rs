//! Message-link parsing

use crate::error::LinkError;

/// A parsed message link: the source chat reference and the message id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLink {
    /// Chat handle or internal id as it appears in the link path
    pub source_chat: String,
    pub message_id: i64,
}

/// Parse a message link of the shape `.../<chat>/<message_id>`.
///
/// Only the last two path segments matter; scheme and host are ignored.
/// Links under a `/c/` prefix carry the internal chat id in the
/// second-to-last segment, which is what we want anyway.
pub fn parse_message_link(link: &str) -> Result<MessageLink, LinkError> {
    let trimmed = link.trim().trim_end_matches('/');
    let mut parts = trimmed.rsplit('/');

    let last = parts.next().filter(|s| !s.is_empty());
    let second_last = parts.next().filter(|s| !s.is_empty());

    let (Some(id_part), Some(chat_part)) = (last, second_last) else {
        return Err(LinkError::Malformed { link: link.into() });
    };

    let message_id = id_part
        .parse::<i64>()
        .map_err(|_| LinkError::InvalidMessageId { link: link.into() })?;

    Ok(MessageLink {
        source_chat: chat_part.to_string(),
        message_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_public_link() {
        let parsed = parse_message_link("https://t.me/somechannel/42").unwrap();
        assert_eq!(parsed.source_chat, "somechannel");
        assert_eq!(parsed.message_id, 42);
    }

    #[test]
    fn test_parse_internal_link() {
        let parsed = parse_message_link("https://t.me/c/1234567/99").unwrap();
        assert_eq!(parsed.source_chat, "1234567");
        assert_eq!(parsed.message_id, 99);
    }

    #[test]
    fn test_parse_trailing_slash() {
        let parsed = parse_message_link("https://t.me/somechannel/42/").unwrap();
        assert_eq!(parsed.message_id, 42);
    }

    #[test]
    fn test_parse_rejects_non_numeric_id() {
        assert_eq!(
            parse_message_link("https://t.me/somechannel/about"),
            Err(LinkError::InvalidMessageId {
                link: "https://t.me/somechannel/about".into()
            })
        );
    }

    #[test]
    fn test_parse_rejects_too_short() {
        assert!(matches!(
            parse_message_link("42"),
            Err(LinkError::Malformed { .. })
        ));
    }
}
