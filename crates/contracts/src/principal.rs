//! Principal data model
//!
//! The persisted per-account record: license, dispatch modes, targets,
//! forward specs, stored content and watermark configuration. The schema
//! is reconciled on every load/save: missing fields come back as defaults,
//! unknown fields are dropped.

use serde::{Deserialize, Serialize};

/// Stable numeric account identifier
pub type PrincipalId = i64;

/// Watermark text applied when neither the principal nor an admin set one
pub const DEFAULT_WATERMARK_TEXT: &str = "Sent via Relaycast";

/// Activation state of one dispatch mode
///
/// Replaces the boolean-flag + separate-expiry-field pair with a single
/// well-formed value: an active mode either has a deadline or runs until
/// explicitly disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModeState {
    #[default]
    Inactive,
    ActiveUntil { expires_at: u64 },
    ActiveForever,
}

impl ModeState {
    /// Active right now (an elapsed deadline counts as inactive even
    /// before the worker clears it)
    pub fn is_active(&self, now: u64) -> bool {
        match self {
            ModeState::Inactive => false,
            ModeState::ActiveUntil { expires_at } => *expires_at > now,
            ModeState::ActiveForever => true,
        }
    }

    /// Had a deadline and the deadline has elapsed
    pub fn expired(&self, now: u64) -> bool {
        matches!(self, ModeState::ActiveUntil { expires_at } if now >= *expires_at)
    }

    /// Deadline, if one was set
    pub fn expires_at(&self) -> Option<u64> {
        match self {
            ModeState::ActiveUntil { expires_at } => Some(*expires_at),
            _ => None,
        }
    }
}

/// Access license tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseTier {
    Basic,
    Vip,
    Admin,
}

/// Claimed-license state for one principal
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseState {
    pub tier: Option<LicenseTier>,
    pub key: Option<String>,
    pub expires_at: Option<u64>,
    pub valid: bool,
}

impl LicenseState {
    /// License currently usable. Administrators are exempt from expiry;
    /// everyone else needs an unexpired deadline.
    pub fn valid_at(&self, now: u64, admin: bool) -> bool {
        self.valid && (admin || self.expires_at.is_some_and(|e| e > now))
    }

    /// Tier is VIP
    pub fn is_vip(&self) -> bool {
        self.tier == Some(LicenseTier::Vip)
    }
}

/// Watermark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    /// Principal-controlled toggle (honored for VIP and admin tiers)
    pub enabled: bool,
    /// Principal's own watermark text (VIP/admin)
    pub text: String,
    /// Admin-assigned text bound to a basic-tier key
    pub assigned_basic_text: Option<String>,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            text: DEFAULT_WATERMARK_TEXT.to_string(),
            assigned_basic_text: None,
        }
    }
}

/// A saved forward reference: one message link, or a pair delivered with
/// a delay in between. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ForwardSpec {
    Single {
        id: String,
        link: String,
    },
    Dual {
        id: String,
        first_link: String,
        second_link: String,
        inter_link_delay_secs: u64,
    },
}

impl ForwardSpec {
    pub fn id(&self) -> &str {
        match self {
            ForwardSpec::Single { id, .. } => id,
            ForwardSpec::Dual { id, .. } => id,
        }
    }
}

/// Rich-text annotation kinds carried alongside stored content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextEntityKind {
    Blockquote,
    Spoiler,
    TextUrl { url: String },
    CustomEmoji { document_id: i64 },
}

/// One rich-text annotation over a span of the content text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEntity {
    pub kind: TextEntityKind,
    pub offset: u32,
    pub length: u32,
}

/// Media attachment kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Document,
    Video,
}

/// Opaque reference to platform-hosted media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub file_id: i64,
    pub kind: MediaKind,
}

/// A saved text/media payload the engine redelivers in copy mode.
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub entities: Vec<TextEntity>,
    #[serde(default)]
    pub media: Option<MediaRef>,
    #[serde(default)]
    pub created_at: u64,
}

/// Formatting instruction for an outgoing message
#[derive(Debug, Clone, PartialEq)]
pub enum Formatting {
    /// Preserve original rich-text annotations
    Entities(Vec<TextEntity>),
    /// Parse markdown markup in the text
    Markdown,
}

/// Full persisted state of one principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrincipalState {
    /// Transport session established and authenticated
    pub registered: bool,
    /// Opaque session credential for the per-principal transport
    pub session: Option<String>,
    /// Seconds between dispatch cycles
    pub pacing_secs: u64,
    /// Destination identifiers as entered (handle, numeric id or invite link)
    pub targets: Vec<String>,
    pub forward_specs: Vec<ForwardSpec>,
    pub content_items: Vec<ContentItem>,
    pub forwarding: ModeState,
    pub copying: ModeState,
    pub license: LicenseState,
    pub watermark: WatermarkConfig,
}

impl Default for PrincipalState {
    fn default() -> Self {
        Self {
            registered: false,
            session: None,
            pacing_secs: 120,
            targets: Vec::new(),
            forward_specs: Vec::new(),
            content_items: Vec::new(),
            forwarding: ModeState::Inactive,
            copying: ModeState::Inactive,
            license: LicenseState::default(),
            watermark: WatermarkConfig::default(),
        }
    }
}

impl PrincipalState {
    /// State after a session teardown: everything back to defaults except
    /// (optionally) the license and its assigned watermark, which survive
    /// unless the teardown was caused by license expiry or revocation.
    pub fn reset_session(&self, preserve_license: bool) -> PrincipalState {
        let mut fresh = PrincipalState::default();
        if preserve_license {
            fresh.license = self.license.clone();
            fresh.watermark.assigned_basic_text = self.watermark.assigned_basic_text.clone();
        }
        fresh
    }

    /// Any dispatch mode currently active
    pub fn any_mode_active(&self, now: u64) -> bool {
        self.forwarding.is_active(now) || self.copying.is_active(now)
    }
}
