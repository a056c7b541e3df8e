//! Create profiles table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Profiles::Id)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Profiles::Role)
                            .string_len(20)
                            .not_null()
                            .default("student"),
                    )
                    .col(
                        ColumnDef::new(Profiles::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Profiles::HtNo).string_len(32))
                    .col(ColumnDef::new(Profiles::StudentName).string_len(255))
                    .col(ColumnDef::new(Profiles::Year).string_len(16))
                    .col(ColumnDef::new(Profiles::Phone).string_len(32))
                    .col(ColumnDef::new(Profiles::Address).text())
                    .col(ColumnDef::new(Profiles::EmergencyContact).string_len(255))
                    .col(ColumnDef::new(Profiles::PhotoRef).string_len(500))
                    .col(
                        ColumnDef::new(Profiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Profiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Approval queue lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_profiles_status_created")
                    .table(Profiles::Table)
                    .col(Profiles::Status)
                    .col(Profiles::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    Role,
    Status,
    HtNo,
    StudentName,
    Year,
    Phone,
    Address,
    EmergencyContact,
    PhotoRef,
    CreatedAt,
    UpdatedAt,
}
