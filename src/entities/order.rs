use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fulfillment lifecycle of an order, in strict forward order.
///
/// The ladder is totally ordered: an order may only re-confirm its current
/// rung or advance to the next one. Payment confirmation is tracked by
/// [`PaymentStatus`] and never mutates this field.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    #[sea_orm(string_value = "PLACED")]
    Placed,
    #[sea_orm(string_value = "PROCESSING")]
    Processing,
    #[sea_orm(string_value = "PACKED")]
    Packed,
    #[sea_orm(string_value = "SHIPPED")]
    Shipped,
    #[sea_orm(string_value = "OUT_FOR_DELIVERY")]
    OutForDelivery,
    #[sea_orm(string_value = "DELIVERED")]
    Delivered,
}

impl ShipmentStatus {
    /// All statuses in ladder order.
    pub const LADDER: [ShipmentStatus; 6] = [
        ShipmentStatus::Placed,
        ShipmentStatus::Processing,
        ShipmentStatus::Packed,
        ShipmentStatus::Shipped,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
    ];

    /// Zero-based rung of this status on the ladder.
    pub const fn position(self) -> usize {
        match self {
            ShipmentStatus::Placed => 0,
            ShipmentStatus::Processing => 1,
            ShipmentStatus::Packed => 2,
            ShipmentStatus::Shipped => 3,
            ShipmentStatus::OutForDelivery => 4,
            ShipmentStatus::Delivered => 5,
        }
    }

    /// The one legal next status, if any.
    pub fn next(self) -> Option<ShipmentStatus> {
        Self::LADDER.get(self.position() + 1).copied()
    }
}

/// Payment lifecycle: PENDING until the gateway confirms, then PAID. Never
/// moves back.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PAID")]
    Paid,
}

/// The `orders` table. One row per purchase commitment; never deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning username; immutable after creation.
    pub username: String,

    /// Sum of unit price x quantity over the cart lines at placement time.
    pub subtotal: Decimal,

    /// Amount the customer pays. Currently equal to subtotal; adjustments
    /// (tax, delivery, discounts) would land between the two.
    pub total_amount: Decimal,

    pub total_quantity: i32,

    pub payment_method: String,

    pub status: ShipmentStatus,

    pub payment_status: PaymentStatus,

    pub order_date: DateTime<Utc>,

    /// Referenced shipping address; orders hold the reference, not a copy.
    pub address_id: Uuid,

    /// Correlation id returned by the payment gateway; null until payment
    /// initiation succeeds.
    pub gateway_order_id: Option<String>,

    /// Set when a post-persist placement step fails, so a reconciliation
    /// process can find the order instead of it being a silent half-state.
    pub needs_reconciliation: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,

    /// Optimistic concurrency counter; every mutation bumps it.
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::address::Entity",
        from = "Column::AddressId",
        to = "super::address::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Address,
    #[sea_orm(has_many = "super::order_status_history::Entity")]
    StatusHistory,
}

impl Related<super::address::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Address.def()
    }
}

impl Related<super::order_status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ladder_is_totally_ordered() {
        for window in ShipmentStatus::LADDER.windows(2) {
            assert!(window[0].position() < window[1].position());
        }
        assert_eq!(ShipmentStatus::Placed.next(), Some(ShipmentStatus::Processing));
        assert_eq!(ShipmentStatus::Delivered.next(), None);
    }

    #[test]
    fn status_parses_wire_names() {
        assert_eq!(
            ShipmentStatus::from_str("OUT_FOR_DELIVERY").ok(),
            Some(ShipmentStatus::OutForDelivery)
        );
        assert_eq!(
            ShipmentStatus::from_str("packed").ok(),
            Some(ShipmentStatus::Packed)
        );
        assert!(ShipmentStatus::from_str("CANCELLED").is_err());
        assert_eq!(ShipmentStatus::OutForDelivery.to_string(), "OUT_FOR_DELIVERY");
    }
}
