//! Create subject table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subject::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Subject::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Subject::Title).string_len(512).not_null())
                    .col(ColumnDef::new(Subject::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(Subject::Number).string_len(32))
                    .col(ColumnDef::new(Subject::Status).string_len(128))
                    .col(ColumnDef::new(Subject::Introduced).date())
                    .col(
                        ColumnDef::new(Subject::ForCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Subject::AgainstCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Subject::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: kind (for listing proposals vs polls)
        manager
            .create_index(
                Index::create()
                    .name("idx_subject_kind")
                    .table(Subject::Table)
                    .col(Subject::Kind)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Subject::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Subject {
    Table,
    Id,
    Title,
    Kind,
    Number,
    Status,
    Introduced,
    ForCount,
    AgainstCount,
    CreatedAt,
}
