//! Watermark selection and outgoing-copy preparation
//!
//! Which watermark (if any) a copy carries depends on the license tier:
//! VIP and admin principals control their own, basic principals get the
//! text their key was assigned. Appending a watermark invalidates stored
//! rich-text entity offsets, so formatting falls back to markdown when
//! the combined text warrants it.

use contracts::{
    ContentItem, Formatting, LicenseTier, PrincipalState, DEFAULT_WATERMARK_TEXT,
};

/// Watermark text for one outgoing copy, if any applies
pub fn select_watermark(state: &PrincipalState, admin: bool) -> Option<String> {
    let watermark = &state.watermark;
    if admin {
        return watermark.enabled.then(|| own_text(state));
    }
    match state.license.tier {
        Some(LicenseTier::Vip) | Some(LicenseTier::Admin) => {
            watermark.enabled.then(|| own_text(state))
        }
        Some(LicenseTier::Basic) => watermark.assigned_basic_text.clone(),
        None => None,
    }
}

fn own_text(state: &PrincipalState) -> String {
    if state.watermark.text.is_empty() {
        DEFAULT_WATERMARK_TEXT.to_string()
    } else {
        state.watermark.text.clone()
    }
}

/// Final text and formatting for a copy of `item`
///
/// Entities survive only when no watermark is appended (their offsets
/// stay valid). A watermarked or entity-less text goes out as markdown
/// when it contains markup, plain otherwise.
pub fn prepare_copy(item: &ContentItem, watermark: Option<&str>) -> (String, Option<Formatting>) {
    match watermark {
        Some(mark) => {
            let text = if item.text.is_empty() {
                mark.to_string()
            } else {
                format!("{}\n\n{}", item.text, mark)
            };
            let formatting = looks_like_markdown(&text).then_some(Formatting::Markdown);
            (text, formatting)
        }
        None => {
            let formatting = if !item.entities.is_empty() {
                Some(Formatting::Entities(item.entities.clone()))
            } else if looks_like_markdown(&item.text) {
                Some(Formatting::Markdown)
            } else {
                None
            };
            (item.text.clone(), formatting)
        }
    }
}

/// Markup characters, or an inline `[label](http...)` link
fn looks_like_markdown(text: &str) -> bool {
    if text.contains('*') || text.contains('_') || text.contains('`') || text.contains('~') {
        return true;
    }
    has_inline_link(text)
}

fn has_inline_link(text: &str) -> bool {
    let Some(open) = text.find('[') else {
        return false;
    };
    let Some(bridge) = text[open..].find("](") else {
        return false;
    };
    text[open + bridge + 2..].starts_with("http")
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{TextEntity, TextEntityKind};

    fn state_with_tier(tier: LicenseTier) -> PrincipalState {
        let mut state = PrincipalState::default();
        state.license.tier = Some(tier);
        state.license.valid = true;
        state
    }

    fn item(text: &str) -> ContentItem {
        ContentItem {
            id: "c1".into(),
            text: text.into(),
            entities: Vec::new(),
            media: None,
            created_at: 0,
        }
    }

    #[test]
    fn test_vip_uses_own_text_when_enabled() {
        let mut state = state_with_tier(LicenseTier::Vip);
        state.watermark.enabled = true;
        state.watermark.text = "via my channel".into();
        assert_eq!(
            select_watermark(&state, false).as_deref(),
            Some("via my channel")
        );

        state.watermark.enabled = false;
        assert_eq!(select_watermark(&state, false), None);
    }

    #[test]
    fn test_basic_gets_assigned_text_regardless_of_toggle() {
        let mut state = state_with_tier(LicenseTier::Basic);
        state.watermark.assigned_basic_text = Some("sponsored".into());
        state.watermark.enabled = false;
        assert_eq!(select_watermark(&state, false).as_deref(), Some("sponsored"));

        state.watermark.assigned_basic_text = None;
        assert_eq!(select_watermark(&state, false), None);
    }

    #[test]
    fn test_admin_controls_own_watermark() {
        let mut state = PrincipalState::default();
        state.watermark.enabled = true;
        state.watermark.text = String::new();
        assert_eq!(
            select_watermark(&state, true).as_deref(),
            Some(DEFAULT_WATERMARK_TEXT)
        );
    }

    #[test]
    fn test_no_license_no_watermark() {
        let mut state = PrincipalState::default();
        state.watermark.enabled = true;
        assert_eq!(select_watermark(&state, false), None);
    }

    #[test]
    fn test_watermark_appends_with_blank_line() {
        let (text, formatting) = prepare_copy(&item("hello"), Some("mark"));
        assert_eq!(text, "hello\n\nmark");
        assert_eq!(formatting, None);
    }

    #[test]
    fn test_watermark_becomes_caption_for_empty_text() {
        let (text, _) = prepare_copy(&item(""), Some("mark"));
        assert_eq!(text, "mark");
    }

    #[test]
    fn test_entities_preserved_only_without_watermark() {
        let mut content = item("hello");
        content.entities.push(TextEntity {
            kind: TextEntityKind::Spoiler,
            offset: 0,
            length: 5,
        });

        let (_, formatting) = prepare_copy(&content, None);
        assert!(matches!(formatting, Some(Formatting::Entities(ref e)) if e.len() == 1));

        let (_, formatting) = prepare_copy(&content, Some("mark"));
        assert!(!matches!(formatting, Some(Formatting::Entities(_))));
    }

    #[test]
    fn test_markdown_fallback_on_markup_chars() {
        let (_, formatting) = prepare_copy(&item("hello"), Some("*bold mark*"));
        assert_eq!(formatting, Some(Formatting::Markdown));
    }

    #[test]
    fn test_inline_link_shape_sends_as_markdown() {
        let (_, formatting) = prepare_copy(&item("see [here](https://example.com)"), None);
        assert_eq!(formatting, Some(Formatting::Markdown));

        let (_, formatting) = prepare_copy(&item("see [note] (not a link)"), None);
        assert_eq!(formatting, None);
    }
}
