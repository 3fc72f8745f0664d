use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "routes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub instance_id: String,
    pub domain: String,
    pub path: Option<String>,
    pub strip_prefix: Option<String>,
    pub handler_type: String,
    /// Handler payload as JSON text
    pub handler_config: String,
    /// Header rules as JSON text
    pub headers: Option<String>,
    pub enabled: i32,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
