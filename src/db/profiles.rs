//! Database operations for profiles.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};

use crate::entity::profile::{self, ActiveModel, Column, Entity};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    ApprovalStatus, IdentityId, NewProfile, Profile, ProfileFields, ProfileUpdate, Role,
};

/// Find a profile by identity id.
pub async fn find_by_id(db: &DatabaseConnection, id: &IdentityId) -> StoreResult<Option<Profile>> {
    Entity::find_by_id(id.as_str().to_owned())
        .one(db)
        .await?
        .map(model_to_profile)
        .transpose()
}

/// Insert a new profile row.
pub async fn insert(
    db: &DatabaseConnection,
    id: &IdentityId,
    profile: NewProfile,
) -> StoreResult<Profile> {
    if Entity::find_by_id(id.as_str().to_owned())
        .one(db)
        .await?
        .is_some()
    {
        return Err(StoreError::AlreadyExists(format!("Profile {id}")));
    }

    let now = Utc::now();
    let fields = profile.fields;
    let model = ActiveModel {
        id: Set(id.as_str().to_owned()),
        role: Set(profile.role.as_str().to_string()),
        status: Set(profile.status.as_str().to_string()),
        ht_no: Set(fields.ht_no),
        student_name: Set(fields.student_name),
        year: Set(fields.year),
        phone: Set(fields.phone),
        address: Set(fields.address),
        emergency_contact: Set(fields.emergency_contact),
        photo_ref: Set(fields.photo_ref),
        created_at: Set(now),
        updated_at: Set(now),
    };

    // A concurrent writer can still win between the check and the insert
    if let Err(err) = Entity::insert(model).exec(db).await {
        return match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                Err(StoreError::AlreadyExists(format!("Profile {id}")))
            }
            _ => Err(err.into()),
        };
    }

    find_by_id(db, id).await?.ok_or_else(|| {
        StoreError::Database("Failed to fetch newly inserted profile".to_string())
    })
}

/// Apply a partial update.
pub async fn update(
    db: &DatabaseConnection,
    id: &IdentityId,
    update: ProfileUpdate,
) -> StoreResult<Profile> {
    let existing = Entity::find_by_id(id.as_str().to_owned())
        .one(db)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("Profile {id}")))?;

    let mut active: ActiveModel = existing.into();
    if let Some(status) = update.status {
        active.status = Set(status.as_str().to_string());
    }

    let fields = update.fields;
    if fields.ht_no.is_some() {
        active.ht_no = Set(fields.ht_no);
    }
    if fields.student_name.is_some() {
        active.student_name = Set(fields.student_name);
    }
    if fields.year.is_some() {
        active.year = Set(fields.year);
    }
    if fields.phone.is_some() {
        active.phone = Set(fields.phone);
    }
    if fields.address.is_some() {
        active.address = Set(fields.address);
    }
    if fields.emergency_contact.is_some() {
        active.emergency_contact = Set(fields.emergency_contact);
    }
    if fields.photo_ref.is_some() {
        active.photo_ref = Set(fields.photo_ref);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(db).await?;
    model_to_profile(updated)
}

/// List profiles with the given status, oldest first.
pub async fn list_by_status(
    db: &DatabaseConnection,
    status: ApprovalStatus,
) -> StoreResult<Vec<Profile>> {
    Entity::find()
        .filter(Column::Status.eq(status.as_str()))
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(model_to_profile)
        .collect()
}

fn model_to_profile(m: profile::Model) -> StoreResult<Profile> {
    let role = Role::parse(&m.role)
        .ok_or_else(|| StoreError::Database(format!("Profile {} has unknown role '{}'", m.id, m.role)))?;
    let status = ApprovalStatus::parse(&m.status).ok_or_else(|| {
        StoreError::Database(format!("Profile {} has unknown status '{}'", m.id, m.status))
    })?;

    Ok(Profile {
        id: IdentityId::new(m.id),
        role,
        status,
        fields: ProfileFields {
            ht_no: m.ht_no,
            student_name: m.student_name,
            year: m.year,
            phone: m.phone,
            address: m.address,
            emergency_contact: m.emergency_contact,
            photo_ref: m.photo_ref,
        },
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}
