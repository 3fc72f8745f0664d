//! `SeaORM` entity for the `edit_history` table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "edit_history")]
/// Database row model for one history entry.
///
/// `seq` orders entries written within the same timestamp tick.
pub struct Model {
    #[sea_orm(primary_key)]
    pub seq: i64,
    #[sea_orm(unique)]
    pub id: String,
    pub instance_id: String,
    pub actor: String,
    pub created_at: String,
    pub previous_config: Option<String>,
    pub new_config: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
