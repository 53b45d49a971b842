//! Tab schemas: the fixed column contracts owned by the repositories.
//!
//! The required-column sets are a contract of this layer, not of the
//! storage medium. Headers in the backing store only ever grow: the
//! reconciler appends missing required columns at the right edge and
//! never removes or reorders existing ones.

use crate::consent::{self, DOWNLOAD_CONSENT_COLUMN};
use crate::record::Record;

/// The six logical tables of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tab {
    Children,
    Parents,
    PickupAuthorizations,
    Medications,
    PhotoMeta,
    Consents,
}

impl Tab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Children => "children",
            Tab::Parents => "parents",
            Tab::PickupAuthorizations => "pickup_authorizations",
            Tab::Medications => "medications",
            Tab::PhotoMeta => "photo_meta",
            Tab::Consents => "consents",
        }
    }

    pub fn from_name(name: &str) -> Option<Tab> {
        Tab::all().into_iter().find(|tab| tab.as_str() == name)
    }

    pub fn all() -> [Tab; 6] {
        [
            Tab::Children,
            Tab::Parents,
            Tab::PickupAuthorizations,
            Tab::Medications,
            Tab::PhotoMeta,
            Tab::Consents,
        ]
    }

    pub fn spec(&self) -> &'static TableSpec {
        match self {
            Tab::Children => &CHILDREN,
            Tab::Parents => &PARENTS,
            Tab::PickupAuthorizations => &PICKUP_AUTHORIZATIONS,
            Tab::Medications => &MEDICATIONS,
            Tab::PhotoMeta => &PHOTO_META,
            Tab::Consents => &CONSENTS,
        }
    }
}

impl std::fmt::Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a repository orders its listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Keep storage order.
    Unsorted,
    /// Ascending by a column's string value.
    ByColumn(&'static str),
    /// Descending by a column's string value (ISO timestamps sort
    /// correctly as strings).
    ByColumnDesc(&'static str),
}

/// The per-tab schema contract driving one entity repository.
pub struct TableSpec {
    pub tab: Tab,
    /// The single identifying column of the tab.
    pub id_column: &'static str,
    /// Minimal header written when the tab has no rows at all.
    pub bootstrap_header: &'static [&'static str],
    /// Columns the reconciler guarantees to exist, in append order.
    pub required_columns: &'static [&'static str],
    pub sort: SortOrder,
    /// Entity-specific defaulting/derivation applied before every write.
    pub normalize: Option<fn(&mut Record)>,
    /// Entity-specific post-processing applied to every listed record.
    pub post_read: Option<fn(&mut Record)>,
}

pub static CHILDREN: TableSpec = TableSpec {
    tab: Tab::Children,
    id_column: "child_id",
    bootstrap_header: &["child_id", "name", "parent_email", "folder_id", "photo_folder_id"],
    required_columns: &[
        "child_id",
        "name",
        "parent_email",
        "folder_id",
        "photo_folder_id",
        "download_consent",
        "birthdate",
        "start_date",
        "group",
        "status",
    ],
    sort: SortOrder::ByColumn("name"),
    normalize: Some(normalize_child),
    post_read: Some(normalize_child_read),
};

pub static PARENTS: TableSpec = TableSpec {
    tab: Tab::Parents,
    id_column: "parent_id",
    bootstrap_header: &["parent_id", "email", "name", "phone"],
    required_columns: &[
        "parent_id",
        "email",
        "name",
        "phone",
        "preferred_language",
        "notifications_opt_in",
    ],
    sort: SortOrder::ByColumn("name"),
    normalize: None,
    post_read: None,
};

pub static PICKUP_AUTHORIZATIONS: TableSpec = TableSpec {
    tab: Tab::PickupAuthorizations,
    id_column: "pickup_id",
    bootstrap_header: &[
        "pickup_id",
        "child_id",
        "name",
        "relationship",
        "phone",
        "valid_from",
        "valid_to",
        "active",
        "created_at",
        "created_by",
    ],
    required_columns: &[
        "pickup_id",
        "child_id",
        "name",
        "relationship",
        "phone",
        "valid_from",
        "valid_to",
        "active",
        "created_at",
        "created_by",
    ],
    sort: SortOrder::ByColumn("name"),
    normalize: Some(stamp_created_at),
    post_read: None,
};

pub static MEDICATIONS: TableSpec = TableSpec {
    tab: Tab::Medications,
    id_column: "med_id",
    bootstrap_header: &[
        "med_id",
        "child_id",
        "date_time",
        "med_name",
        "dose",
        "given_by",
        "notes",
        "consent_doc_file_id",
        "created_at",
        "created_by",
    ],
    required_columns: &[
        "med_id",
        "child_id",
        "date_time",
        "med_name",
        "dose",
        "given_by",
        "notes",
        "consent_doc_file_id",
        "created_at",
        "created_by",
    ],
    sort: SortOrder::ByColumnDesc("date_time"),
    normalize: Some(stamp_created_at),
    post_read: None,
};

pub static PHOTO_META: TableSpec = TableSpec {
    tab: Tab::PhotoMeta,
    id_column: "file_id",
    bootstrap_header: &[
        "file_id",
        "child_id",
        "album",
        "status",
        "uploaded_at",
        "uploaded_by",
        "retention_until",
    ],
    required_columns: &[
        "file_id",
        "child_id",
        "album",
        "status",
        "uploaded_at",
        "uploaded_by",
        "retention_until",
    ],
    sort: SortOrder::Unsorted,
    normalize: None,
    post_read: None,
};

pub static CONSENTS: TableSpec = TableSpec {
    tab: Tab::Consents,
    id_column: "consent_id",
    bootstrap_header: &[
        "consent_id",
        "child_id",
        "privacy_notice_ack",
        "excursions",
        "emergency_treatment",
        "whatsapp_group",
        "photo_download",
    ],
    required_columns: &[
        "consent_id",
        "child_id",
        "privacy_notice_ack",
        "excursions",
        "emergency_treatment",
        "whatsapp_group",
        "photo_download",
    ],
    sort: SortOrder::Unsorted,
    normalize: None,
    post_read: None,
};

/// Children write path: collapse intake flags into `download_consent`
/// and default an empty status to "active".
fn normalize_child(record: &mut Record) {
    let consent = consent::derive_download_consent(record);
    record.set(DOWNLOAD_CONSENT_COLUMN, consent.as_str());

    let status = record.get_or_empty("status").trim().to_lowercase();
    if status.is_empty() {
        record.set("status", "active");
    } else {
        record.set("status", status);
    }
}

/// Children read path: stored consent values are normalized so callers
/// never see anything outside the three known values.
fn normalize_child_read(record: &mut Record) {
    let consent = consent::normalize_download_consent(record.get_or_empty(DOWNLOAD_CONSENT_COLUMN));
    record.set(DOWNLOAD_CONSENT_COLUMN, consent.as_str());
}

/// Audit stamp for tabs that carry `created_at`.
fn stamp_created_at(record: &mut Record) {
    if record.get_or_empty("created_at").is_empty() {
        record.set("created_at", chrono::Utc::now().to_rfc3339());
    }
}
