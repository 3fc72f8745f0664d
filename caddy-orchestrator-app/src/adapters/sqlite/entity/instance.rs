//! `SeaORM` entity for the `instances` table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "instances")]
/// Database row model for a managed instance.
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub admin_url: String,
    pub status: String,
    pub latency_ms: Option<i64>,
    pub last_error: Option<String>,
    pub last_checked_at: Option<String>,
    pub sync_pending: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
