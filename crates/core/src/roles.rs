//! Actor role tags.
//!
//! The role decides which optional fields of an entity are relevant: a
//! recycler partner's listing carries accepted materials, an NGO's care
//! home carries its mission and resident count.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_GENERAL: &str = "general";
pub const ROLE_RECYCLER_PARTNER: &str = "recycler-partner";
pub const ROLE_NGO_PARTNER: &str = "ngo-partner";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActorRole {
    #[default]
    General,
    RecyclerPartner,
    NgoPartner,
}

impl ActorRole {
    /// Parse from the stored role name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            ROLE_GENERAL => Ok(Self::General),
            ROLE_RECYCLER_PARTNER => Ok(Self::RecyclerPartner),
            ROLE_NGO_PARTNER => Ok(Self::NgoPartner),
            other => Err(CoreError::Validation(format!(
                "Unknown role '{other}'. Must be one of: {ROLE_GENERAL}, {ROLE_RECYCLER_PARTNER}, {ROLE_NGO_PARTNER}"
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::General => ROLE_GENERAL,
            Self::RecyclerPartner => ROLE_RECYCLER_PARTNER,
            Self::NgoPartner => ROLE_NGO_PARTNER,
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::General => "Community Member",
            Self::RecyclerPartner => "Recycler Partner",
            Self::NgoPartner => "NGO Partner",
        }
    }

    /// Partners register on behalf of an organisation.
    pub fn is_partner(self) -> bool {
        !matches!(self, Self::General)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for role in [
            ActorRole::General,
            ActorRole::RecyclerPartner,
            ActorRole::NgoPartner,
        ] {
            assert_eq!(ActorRole::from_name(role.name()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = ActorRole::from_name("admin").unwrap_err();
        assert!(err.to_string().contains("admin"));
    }

    #[test]
    fn serde_uses_kebab_case_names() {
        let json = serde_json::to_string(&ActorRole::NgoPartner).unwrap();
        assert_eq!(json, "\"ngo-partner\"");
    }

    #[test]
    fn only_general_is_not_a_partner() {
        assert!(!ActorRole::General.is_partner());
        assert!(ActorRole::RecyclerPartner.is_partner());
        assert!(ActorRole::NgoPartner.is_partner());
    }
}
