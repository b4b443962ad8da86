//! Ballot entity: one voter's (or one origin's) choice on one subject.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ballot")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub subject_id: String,

    #[sea_orm(indexed)]
    pub voter_id: String,

    /// true = for, false = against
    pub choice: bool,

    /// Network origin, recorded for polls only.
    /// Unique per subject (NULLs excluded) to blunt ballot stuffing.
    #[sea_orm(nullable)]
    pub origin: Option<String>,

    /// Coarse location label derived from the origin
    #[sea_orm(nullable)]
    pub origin_label: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    /// Set when a later vote flips the stored choice
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id",
        on_delete = "Cascade"
    )]
    Subject,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::VoterId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Voter,
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Voter.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
