//! Static mapping tables between legacy fields and remote custom fields.

use serde::Deserialize;
use std::fmt;

/// A legacy field that may be mirrored into a remote custom field.
///
/// The configuration maps each variant to the *display name* of a remote
/// field; the resolver turns that name into a field id at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappedField {
    Status,
    Resolution,
    Project,
    Weeks,
    Cc,
    Xpath,
    Locale,
    Phase,
    Reporter,
    Owner,
    Review,
    Time,
}

impl MappedField {
    /// Every mapping key, in the order fields are evaluated.
    pub const ALL: [MappedField; 12] = [
        Self::Status,
        Self::Resolution,
        Self::Project,
        Self::Weeks,
        Self::Cc,
        Self::Xpath,
        Self::Locale,
        Self::Phase,
        Self::Reporter,
        Self::Owner,
        Self::Review,
        Self::Time,
    ];

    /// Mappings that every run needs, configured or not.
    pub const REQUIRED: [MappedField; 2] = [Self::Status, Self::Resolution];

    /// Returns the configuration key for this mapping.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Resolution => "resolution",
            Self::Project => "project",
            Self::Weeks => "weeks",
            Self::Cc => "cc",
            Self::Xpath => "xpath",
            Self::Locale => "locale",
            Self::Phase => "phase",
            Self::Reporter => "reporter",
            Self::Owner => "owner",
            Self::Review => "review",
            Self::Time => "time",
        }
    }
}

impl fmt::Display for MappedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
