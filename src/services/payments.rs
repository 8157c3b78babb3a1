use std::sync::Arc;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use sha2::Sha256;
use tracing::{info, instrument};

use crate::entities::order::{self, Entity as OrderEntity, Model as OrderModel, PaymentStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

type HmacSha256 = Hmac<Sha256>;

/// Computes the gateway callback signature: HMAC-SHA256 over
/// `"<gateway order id>|<payment id>"`, hex-encoded.
pub fn compute_signature(
    secret: &str,
    gateway_order_id: &str,
    payment_id: &str,
) -> Result<String, ServiceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ServiceError::InternalError(format!("invalid signing key: {e}")))?;
    mac.update(format!("{gateway_order_id}|{payment_id}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a supplied signature against the recomputed digest. A mismatch
/// is a `false` outcome, never an error; only key setup can fail.
pub fn verify_signature_with_secret(
    secret: &str,
    gateway_order_id: &str,
    payment_id: &str,
    signature: &str,
) -> Result<bool, ServiceError> {
    let expected = compute_signature(secret, gateway_order_id, payment_id)?;
    Ok(constant_time_eq(&expected, signature))
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

/// Guards the payment-confirmation path: idempotency on mark-paid and
/// gateway callback signature verification.
///
/// Confirmation is orthogonal to the shipment ladder: it flips
/// `payment_status` to PAID and leaves `status` to the ladder machine.
#[derive(Clone)]
pub struct PaymentConfirmationService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    gateway_secret: String,
}

impl PaymentConfirmationService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        gateway_secret: impl Into<String>,
    ) -> Self {
        Self {
            db,
            event_sender,
            gateway_secret: gateway_secret.into(),
        }
    }

    /// Marks the order correlated with `gateway_order_id` as paid.
    ///
    /// A second call for the same order fails with `AlreadyPaid` rather
    /// than succeeding silently; retrying callers treat that as non-fatal.
    #[instrument(skip(self), fields(gateway_order_id = %gateway_order_id))]
    pub async fn mark_paid(&self, gateway_order_id: &str) -> Result<OrderModel, ServiceError> {
        let order = OrderEntity::find()
            .filter(order::Column::GatewayOrderId.eq(gateway_order_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::OrderNotFound(format!(
                    "no order with gateway order id {gateway_order_id}"
                ))
            })?;

        if order.payment_status == PaymentStatus::Paid {
            return Err(ServiceError::AlreadyPaid(gateway_order_id.to_string()));
        }

        let updated = OrderEntity::update_many()
            .set(order::ActiveModel {
                payment_status: Set(PaymentStatus::Paid),
                updated_at: Set(Some(Utc::now())),
                version: Set(order.version + 1),
                ..Default::default()
            })
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::Version.eq(order.version))
            .filter(order::Column::PaymentStatus.eq(PaymentStatus::Pending))
            .exec(&*self.db)
            .await?;

        if updated.rows_affected == 0 {
            return Err(ServiceError::Conflict(format!(
                "order {} was modified concurrently",
                order.id
            )));
        }

        info!(order_id = %order.id, "order marked as paid");
        self.event_sender.send_or_log(Event::OrderPaid(order.id)).await;

        OrderEntity::find_by_id(order.id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(order.id.to_string()))
    }

    /// Verifies a gateway callback signature against the shared secret.
    pub fn verify_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool, ServiceError> {
        verify_signature_with_secret(&self.gateway_secret, gateway_order_id, payment_id, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_gateway_secret";
    // Independently computed HMAC-SHA256("ORD1|PAY1") under SECRET.
    const KNOWN_DIGEST: &str = "6cdbc38e0c24a5b86d02081969fd0a958c9367ef3c0191fb229805833ad1cd50";

    #[test]
    fn digest_is_deterministic() {
        let sig = compute_signature(SECRET, "ORD1", "PAY1").expect("compute signature");
        assert_eq!(sig, KNOWN_DIGEST);
    }

    #[test]
    fn matching_signature_verifies() {
        assert_eq!(
            verify_signature_with_secret(SECRET, "ORD1", "PAY1", KNOWN_DIGEST).ok(),
            Some(true)
        );
    }

    #[test]
    fn any_alteration_fails_verification() {
        let mut tampered = KNOWN_DIGEST.to_string();
        tampered.replace_range(0..1, if &KNOWN_DIGEST[0..1] == "0" { "1" } else { "0" });
        assert_eq!(
            verify_signature_with_secret(SECRET, "ORD1", "PAY1", &tampered).ok(),
            Some(false)
        );

        // Different payload under the same secret.
        assert_eq!(
            verify_signature_with_secret(SECRET, "ORD1", "PAY2", KNOWN_DIGEST).ok(),
            Some(false)
        );

        // Truncated signature.
        assert_eq!(
            verify_signature_with_secret(SECRET, "ORD1", "PAY1", &KNOWN_DIGEST[..63]).ok(),
            Some(false)
        );
    }
}
