//! Database operations for accounts.

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set, SqlErr,
};

use crate::entity::account::{self, ActiveModel, Column, Entity};
use crate::error::{StoreError, StoreResult};
use crate::models::{Identity, IdentityId, StoredAccount};

/// Find an account by normalised email.
pub async fn find_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> StoreResult<Option<StoredAccount>> {
    Ok(Entity::find()
        .filter(Column::Email.eq(email))
        .one(db)
        .await?
        .map(model_to_account))
}

/// Insert a new account row.
pub async fn insert(db: &DatabaseConnection, account: StoredAccount) -> StoreResult<()> {
    let email = account.identity.email.clone();
    let model = ActiveModel {
        id: Set(account.identity.id.as_str().to_owned()),
        email: Set(account.identity.email),
        salt: Set(account.salt),
        password_hash: Set(account.password_hash),
        created_at: Set(account.created_at),
    };

    match Entity::insert(model).exec(db).await {
        Ok(_) => Ok(()),
        Err(err) => match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                Err(StoreError::AlreadyExists(format!("Account {email}")))
            }
            _ => Err(err.into()),
        },
    }
}

/// Count registered accounts.
pub async fn count(db: &DatabaseConnection) -> StoreResult<u64> {
    Ok(Entity::find().count(db).await?)
}

fn model_to_account(m: account::Model) -> StoredAccount {
    StoredAccount {
        identity: Identity::new(IdentityId::new(m.id), m.email),
        salt: m.salt,
        password_hash: m.password_hash,
        created_at: m.created_at,
    }
}
