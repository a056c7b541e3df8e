//! Profile records: role, approval status and academic fields of one identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::identity::IdentityId;

/// Portal role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "student" => Some(Self::Student),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Approval state of a profile. Only meaningful for students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Academic and contact fields. Populated incrementally; any may be absent.
///
/// Carries no status. Status is assigned by the controller or an approving
/// admin, never by the profile owner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileFields {
    /// Hall-ticket number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ht_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    /// Reference to an uploaded photo in object storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
}

impl ProfileFields {
    /// Overlay every field set in `other` onto `self`.
    pub fn merge(&mut self, other: ProfileFields) {
        fn take(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.ht_no, other.ht_no);
        take(&mut self.student_name, other.student_name);
        take(&mut self.year, other.year);
        take(&mut self.phone, other.phone);
        take(&mut self.address, other.address);
        take(&mut self.emergency_contact, other.emergency_contact);
        take(&mut self.photo_ref, other.photo_ref);
    }

    pub fn is_empty(&self) -> bool {
        *self == ProfileFields::default()
    }

    /// Trim values and drop blank ones.
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Self {
            ht_no: clean(self.ht_no),
            student_name: clean(self.student_name),
            year: clean(self.year),
            phone: clean(self.phone),
            address: clean(self.address),
            emergency_contact: clean(self.emergency_contact),
            photo_ref: clean(self.photo_ref),
        }
    }
}

/// Stored profile. One per identity; `id` is the identity id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: IdentityId,
    pub role: Role,
    pub status: ApprovalStatus,
    #[serde(flatten)]
    pub fields: ProfileFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Hall-ticket number, name and year are all present.
    pub fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.fields.ht_no)
            && present(&self.fields.student_name)
            && present(&self.fields.year)
    }

    /// Admins always; students only once approved.
    pub fn has_dashboard_access(&self) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Student => self.status == ApprovalStatus::Approved,
        }
    }
}

/// Payload for creating a profile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewProfile {
    pub role: Role,
    pub status: ApprovalStatus,
    pub fields: ProfileFields,
}

impl NewProfile {
    /// Approved administrator profile with no academic fields.
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            status: ApprovalStatus::Approved,
            fields: ProfileFields::default(),
        }
    }

    /// Student profile awaiting approval.
    pub fn pending_student(fields: ProfileFields) -> Self {
        Self {
            role: Role::Student,
            status: ApprovalStatus::Pending,
            fields,
        }
    }
}

/// Partial update: only the set parts are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfileUpdate {
    pub status: Option<ApprovalStatus>,
    pub fields: ProfileFields,
}

impl ProfileUpdate {
    /// Apply to a stored profile, bumping `updated_at`.
    pub fn apply(self, profile: &mut Profile, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            profile.status = status;
        }
        profile.fields.merge(self.fields);
        profile.updated_at = now;
    }
}
