//! Create ballot table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ballot::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ballot::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ballot::SubjectId).string_len(32).not_null())
                    .col(ColumnDef::new(Ballot::VoterId).string_len(32).not_null())
                    .col(ColumnDef::new(Ballot::Choice).boolean().not_null())
                    .col(ColumnDef::new(Ballot::Origin).string_len(64))
                    .col(ColumnDef::new(Ballot::OriginLabel).string_len(64))
                    .col(
                        ColumnDef::new(Ballot::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Ballot::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ballot_subject")
                            .from(Ballot::Table, Ballot::SubjectId)
                            .to(Subject::Table, Subject::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ballot_voter")
                            .from(Ballot::Table, Ballot::VoterId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one live ballot per (subject, voter)
        manager
            .create_index(
                Index::create()
                    .name("idx_ballot_subject_voter")
                    .table(Ballot::Table)
                    .col(Ballot::SubjectId)
                    .col(Ballot::VoterId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: one live ballot per (subject, origin).
        // Origin is NULL for proposals; Postgres treats NULLs as distinct,
        // so the constraint only bites for poll ballots.
        manager
            .create_index(
                Index::create()
                    .name("idx_ballot_subject_origin")
                    .table(Ballot::Table)
                    .col(Ballot::SubjectId)
                    .col(Ballot::Origin)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ballot::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Ballot {
    Table,
    Id,
    SubjectId,
    VoterId,
    Choice,
    Origin,
    OriginLabel,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Subject {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
