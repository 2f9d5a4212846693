use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Standing of a user within a profile. Variants are declared lowest first so
/// the derived ordering is the tier ordering; the engine only ever compares
/// tiers with `>=`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "membership_tier", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipTier {
    Member,
    Contributor,
    Maintainer,
    Owner,
}

impl FromStr for MembershipTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(MembershipTier::Member),
            "contributor" => Ok(MembershipTier::Contributor),
            "maintainer" => Ok(MembershipTier::Maintainer),
            "owner" => Ok(MembershipTier::Owner),
            other => Err(format!("unknown membership tier: {other}")),
        }
    }
}

impl std::fmt::Display for MembershipTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MembershipTier::Member => "member",
            MembershipTier::Contributor => "contributor",
            MembershipTier::Maintainer => "maintainer",
            MembershipTier::Owner => "owner",
        };
        f.write_str(name)
    }
}
