//! Photo download consent derivation.
//!
//! Several boolean-ish intake flags collapse into one consent value with a
//! fixed precedence. The derivation is pure and runs identically over both
//! storage backends; it lives in the children repository's write path, not
//! in the storage layer.

use crate::record::Record;

/// Intake flag: photo downloads denied outright.
pub const FLAG_DOWNLOAD_DENIED: &str = "consent__photo_download_denied";
/// Intake flag: unpixelated downloads allowed.
pub const FLAG_DOWNLOAD_UNPIXELATED: &str = "consent__photo_download_unpixelated";
/// Intake flag: pixelated downloads allowed.
pub const FLAG_DOWNLOAD_PIXELATED: &str = "consent__photo_download_pixelated";

/// Stored consent column on the children tab.
pub const DOWNLOAD_CONSENT_COLUMN: &str = "download_consent";

/// Photo download consent for a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadConsent {
    Pixelated,
    Unpixelated,
    Denied,
}

impl DownloadConsent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadConsent::Pixelated => "pixelated",
            DownloadConsent::Unpixelated => "unpixelated",
            DownloadConsent::Denied => "denied",
        }
    }
}

/// Whether a form value counts as "checked".
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "ja" | "on" | "x"
    )
}

/// Normalize a stored consent value, defaulting to pixelated when
/// absent or unrecognized.
pub fn normalize_download_consent(value: &str) -> DownloadConsent {
    match value.trim().to_lowercase().as_str() {
        "unpixelated" => DownloadConsent::Unpixelated,
        "denied" => DownloadConsent::Denied,
        _ => DownloadConsent::Pixelated,
    }
}

/// Derive the consent value from intake flags, with fixed precedence:
/// denied beats unpixelated beats pixelated. When no flag is set, the
/// already-stored `download_consent` value wins, normalized.
pub fn derive_download_consent(record: &Record) -> DownloadConsent {
    if record.get_bool(FLAG_DOWNLOAD_DENIED) {
        DownloadConsent::Denied
    } else if record.get_bool(FLAG_DOWNLOAD_UNPIXELATED) {
        DownloadConsent::Unpixelated
    } else if record.get_bool(FLAG_DOWNLOAD_PIXELATED) {
        DownloadConsent::Pixelated
    } else {
        normalize_download_consent(record.get_or_empty(DOWNLOAD_CONSENT_COLUMN))
    }
}
