use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::Identity;
use crate::entities::order::{self, Entity as OrderEntity, Model as OrderModel, ShipmentStatus};
use crate::entities::order_status_history::{
    self, Entity as HistoryEntity, Model as HistoryModel,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Checks a requested ladder transition against the current status.
///
/// Re-confirming the current status is allowed (and still audited by the
/// caller); advancing exactly one rung is allowed; anything else is a
/// backward move or a skipped step. The rule is a pure function so it can
/// be tested apart from any persistence.
pub fn validate_transition(
    current: ShipmentStatus,
    target: ShipmentStatus,
) -> Result<(), ServiceError> {
    if target == current {
        return Ok(());
    }
    if target.position() < current.position() {
        return Err(ServiceError::BackwardTransition {
            from: current,
            to: target,
        });
    }
    if target.position() == current.position() + 1 {
        return Ok(());
    }
    Err(ServiceError::SkippedStep {
        from: current,
        next: current.next().unwrap_or(current),
    })
}

/// Applies forward-only shipment transitions to orders and appends the
/// immutable audit trail.
#[derive(Clone)]
pub struct ShipmentStatusService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ShipmentStatusService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Moves an order to `target`, recording who did it and when.
    ///
    /// The status write is guarded by the order's version counter; a
    /// concurrent transition loses the race and gets a conflict instead of
    /// silently interleaving with the history trail.
    #[instrument(skip(self, actor), fields(order_id = %order_id, target = %target, actor = %actor.username))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        target: &str,
        actor: &Identity,
    ) -> Result<OrderModel, ServiceError> {
        let new_status = ShipmentStatus::from_str(target)
            .map_err(|_| ServiceError::InvalidStatus(target.to_string()))?;

        let txn = self.db.begin().await?;

        let current = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(order_id.to_string()))?;

        validate_transition(current.status, new_status)?;

        let now = Utc::now();
        let updated = OrderEntity::update_many()
            .set(order::ActiveModel {
                status: Set(new_status),
                updated_at: Set(Some(now)),
                version: Set(current.version + 1),
                ..Default::default()
            })
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Version.eq(current.version))
            .exec(&txn)
            .await?;

        if updated.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "order {order_id} was modified concurrently"
            )));
        }

        let history = order_status_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            status: Set(new_status),
            changed_at: Set(now),
            changed_by: Set(actor.username.clone()),
        };
        history.insert(&txn).await?;

        txn.commit().await?;

        info!(
            old_status = %current.status,
            new_status = %new_status,
            "shipment status updated"
        );
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status: current.status,
                new_status,
            })
            .await;

        OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(order_id.to_string()))
    }

    /// The order's audit trail, oldest first.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn status_history(&self, order_id: Uuid) -> Result<Vec<HistoryModel>, ServiceError> {
        let exists = OrderEntity::find_by_id(order_id).one(&*self.db).await?;
        if exists.is_none() {
            return Err(ServiceError::OrderNotFound(order_id.to_string()));
        }

        HistoryEntity::find()
            .filter(order_status_history::Column::OrderId.eq(order_id))
            .order_by_asc(order_status_history::Column::ChangedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::ShipmentStatus::*;

    #[test]
    fn single_step_forward_is_allowed() {
        for window in ShipmentStatus::LADDER.windows(2) {
            assert!(validate_transition(window[0], window[1]).is_ok());
        }
    }

    #[test]
    fn reconfirming_current_status_is_allowed() {
        for status in ShipmentStatus::LADDER {
            assert!(validate_transition(status, status).is_ok());
        }
    }

    #[test]
    fn skipping_a_step_names_the_legal_next_state() {
        let err = validate_transition(Placed, Packed).unwrap_err();
        match err {
            ServiceError::SkippedStep { from, next } => {
                assert_eq!(from, Placed);
                assert_eq!(next, Processing);
            }
            other => panic!("expected SkippedStep, got {other:?}"),
        }
    }

    #[test]
    fn backward_moves_are_rejected() {
        let err = validate_transition(Shipped, Processing).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::BackwardTransition {
                from: Shipped,
                to: Processing
            }
        ));
        assert!(validate_transition(Delivered, Placed).is_err());
    }

    #[test]
    fn delivered_only_reconfirms_itself() {
        assert!(validate_transition(Delivered, Delivered).is_ok());
        for earlier in &ShipmentStatus::LADDER[..5] {
            assert!(validate_transition(Delivered, *earlier).is_err());
        }
    }
}
