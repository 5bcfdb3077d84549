//! Payment entity
//!
//! One immutable row per settled session; a unique index on `session_id`
//! makes the at-most-once invariant a storage guarantee rather than an
//! application promise.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub session_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub user_name: String,

    pub amount: f64,

    #[sea_orm(column_type = "Text")]
    pub method: String,

    pub paid_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
