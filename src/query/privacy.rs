//! The canonical privacy projection predicate.
//!
//! Every privacy-aware reader (query executor, timecard aggregator) builds
//! its SQL condition through [`AccessMode::sql_condition`] so the levels
//! admitted by each mode can never drift between code paths.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::store::types::PrivacyLevel;

/// How much privacy-scoped data a projection may include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    /// Full access, the single-user default.
    #[default]
    All,
    /// External-facing projections: public and internal rows.
    InternalAndPublic,
    /// Public rows only.
    PublicOnly,
}

impl AccessMode {
    /// Whether a row at the given privacy level is admitted.
    pub fn admits(&self, level: PrivacyLevel) -> bool {
        match self {
            Self::All => true,
            Self::InternalAndPublic => level != PrivacyLevel::Private,
            Self::PublicOnly => level == PrivacyLevel::Public,
        }
    }

    /// SQL condition over a privacy-level column, or `None` when the mode
    /// imposes no restriction.
    pub fn sql_condition(&self, column: &str) -> Option<String> {
        match self {
            Self::All => None,
            Self::InternalAndPublic => Some(format!("{column} IN ('public','internal')")),
            Self::PublicOnly => Some(format!("{column} = 'public'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_matches_sql_condition() {
        assert!(AccessMode::All.admits(PrivacyLevel::Private));
        assert!(AccessMode::All.sql_condition("p").is_none());

        assert!(AccessMode::InternalAndPublic.admits(PrivacyLevel::Internal));
        assert!(!AccessMode::InternalAndPublic.admits(PrivacyLevel::Private));

        assert!(AccessMode::PublicOnly.admits(PrivacyLevel::Public));
        assert!(!AccessMode::PublicOnly.admits(PrivacyLevel::Internal));
        assert_eq!(
            AccessMode::PublicOnly.sql_condition("b.privacy_level").as_deref(),
            Some("b.privacy_level = 'public'")
        );
    }
}
