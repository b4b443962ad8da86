//! Subject entity: a votable proposal or poll.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Subject kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "camelCase")]
pub enum SubjectKind {
    /// Bill-like proposal; one ballot per voter.
    #[sea_orm(string_value = "proposal")]
    Proposal,
    /// Public poll; one ballot per voter and per network origin.
    #[sea_orm(string_value = "poll")]
    Poll,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subject")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    pub kind: SubjectKind,

    /// Bill number (e.g. "C-330"), proposals only
    #[sea_orm(nullable)]
    pub number: Option<String>,

    /// Legislative status label
    #[sea_orm(nullable)]
    pub status: Option<String>,

    /// Date the proposal was introduced
    #[sea_orm(nullable)]
    pub introduced: Option<Date>,

    /// Count of live ballots whose choice is "for".
    /// Must always equal the matching ballot rows; mutated only inside
    /// the ballot cast transaction.
    #[sea_orm(default_value = 0)]
    pub for_count: i32,

    /// Count of live ballots whose choice is "against".
    #[sea_orm(default_value = 0)]
    pub against_count: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ballot::Entity")]
    Ballot,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
}

impl Related<super::ballot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ballot.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
