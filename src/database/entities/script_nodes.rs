use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One script node. The node itself lives in `payload` without its position,
/// which is kept in its own columns so bulk position updates stay cheap.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "script_nodes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub node_type: String,
    pub sort_order: i32,
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: serde_json::Value,
    pub position_x: Option<f64>,
    pub position_y: Option<f64>,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
