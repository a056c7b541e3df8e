//! SeaORM entity definitions.

pub mod account;
pub mod profile;
