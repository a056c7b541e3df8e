//! Domain models for the department portal.

pub mod identity;
pub mod profile;

// Re-export commonly used types
pub use identity::{Identity, IdentityId, StoredAccount, normalize_email};
pub use profile::{ApprovalStatus, NewProfile, Profile, ProfileFields, ProfileUpdate, Role};
