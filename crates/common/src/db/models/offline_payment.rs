//! Offline payment entity
//!
//! Unpaid → Paid, terminal and idempotent: redeeming a paid code returns the
//! prior result without inserting a second Payment. The redemption code is an
//! unguessable, globally unique token.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "offline_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub session_id: Uuid,

    /// Provisional 0 while the session is still open; redemption re-derives
    /// the true amount when zero.
    pub amount: f64,

    #[sea_orm(column_type = "Text", unique)]
    pub code: String,

    pub is_paid: bool,

    pub created_at: DateTimeWithTimeZone,

    pub paid_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
