//! Profile domain model.
//!
//! The profile is the domain record describing a member, staff or admin
//! user, keyed by the session subject id. It is created lazily on first
//! login and mutated only through the explicit save operation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::session::IdentityClaims;

/// Privilege level of a profile. Closed set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Member,
    Staff,
    Admin,
}

impl Role {
    /// Staff and admins may operate the admin shell after choosing to.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Staff | Role::Admin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Member
    }
}

/// Which privilege level an elevated user chose to operate under for this
/// run. Ephemeral: recorded between role selection and logout, never
/// persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Member,
    Admin,
}

/// Domain record for a club member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Stable identifier. Must equal the session subject id once resolved.
    pub id: Uuid,
    pub display_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Structured social links, keyed by platform name.
    #[serde(default)]
    pub social_links: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub onboarding_complete: bool,

    // Business module fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default)]
    pub referral_count: i32,
    #[serde(default)]
    pub ranking_points: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation payload for a profile that does not exist yet.
///
/// Built from the identity claims available at sign-in; everything the
/// claims cannot provide starts at the member defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub display_name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub onboarding_complete: bool,
}

impl NewProfile {
    /// Seeds a creation payload from a subject id and its identity claims.
    ///
    /// New profiles always start as basic members with onboarding
    /// incomplete; elevated roles are granted externally.
    pub fn from_claims(user_id: Uuid, claims: &IdentityClaims) -> Self {
        Self {
            id: user_id,
            display_name: claims.display_name(),
            role: Role::Member,
            organization: claims.organization.clone(),
            avatar_url: claims.avatar_url.clone(),
            onboarding_complete: false,
        }
    }
}
