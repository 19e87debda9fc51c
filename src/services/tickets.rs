//! Ticket issuance: pure append of immutable ticket rows, each carrying a
//! signed QR payload. Never touches inventory or the ledger.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::ticket::{self, Entity as TicketEntity};
use crate::entities::ticket_type::TicketKind;
use crate::errors::ServiceError;

type HmacSha256 = Hmac<Sha256>;

/// What a scanner learns from a QR payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrClaims {
    pub buyer_id: Uuid,
    pub event_id: Uuid,
    pub transaction_id: String,
    pub unit_index: i32,
    pub issued_at: DateTime<Utc>,
    /// Random material so two payloads never collide byte-for-byte.
    pub nonce: String,
}

/// Mints and verifies the opaque scannable tokens embedded in tickets.
/// Format: `base64url(claims JSON) . hex(HMAC-SHA256(body))`.
#[derive(Clone)]
pub struct QrSigner {
    key: Vec<u8>,
}

impl QrSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    pub fn mint(&self, claims: &QrClaims) -> Result<String, ServiceError> {
        let json = serde_json::to_vec(claims)
            .map_err(|e| ServiceError::InternalError(format!("qr payload encoding: {}", e)))?;
        let body = URL_SAFE_NO_PAD.encode(json);
        let tag = self.tag(body.as_bytes())?;
        Ok(format!("{}.{}", body, tag))
    }

    pub fn decode(&self, payload: &str) -> Result<QrClaims, ServiceError> {
        let (body, tag) = payload
            .split_once('.')
            .ok_or_else(|| ServiceError::ValidationError("malformed qr payload".to_string()))?;

        let expected = self.tag(body.as_bytes())?;
        if !constant_time_eq(&expected, tag) {
            return Err(ServiceError::ValidationError(
                "qr payload signature mismatch".to_string(),
            ));
        }

        let json = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| ServiceError::ValidationError("malformed qr payload".to_string()))?;
        serde_json::from_slice(&json)
            .map_err(|_| ServiceError::ValidationError("malformed qr payload".to_string()))
    }

    fn tag(&self, body: &[u8]) -> Result<String, ServiceError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| ServiceError::InternalError(format!("qr signing key: {}", e)))?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
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

/// Input for issuing one ticket unit.
#[derive(Debug, Clone)]
pub struct IssueTicket {
    pub buyer_id: Uuid,
    pub event_id: Uuid,
    pub transaction_id: String,
    pub unit_index: i32,
    pub kind: TicketKind,
    pub unit_price: Decimal,
    pub holder_name: Option<String>,
    pub holder_email: Option<String>,
}

#[derive(Clone)]
pub struct TicketService {
    db: Arc<DatabaseConnection>,
    signer: QrSigner,
}

impl TicketService {
    pub fn new(db: Arc<DatabaseConnection>, qr_secret: &str) -> Self {
        Self {
            db,
            signer: QrSigner::new(qr_secret),
        }
    }

    /// Persists one immutable ticket row with a freshly minted QR payload.
    #[instrument(skip(self, input), fields(transaction_id = %input.transaction_id, unit_index = input.unit_index))]
    pub async fn issue(&self, input: IssueTicket) -> Result<ticket::Model, ServiceError> {
        let issued_at = Utc::now();
        let claims = QrClaims {
            buyer_id: input.buyer_id,
            event_id: input.event_id,
            transaction_id: input.transaction_id.clone(),
            unit_index: input.unit_index,
            issued_at,
            nonce: hex::encode(rand::random::<[u8; 8]>()),
        };
        let qr_payload = self.signer.mint(&claims)?;

        let row = ticket::ActiveModel {
            id: Set(Uuid::new_v4()),
            buyer_id: Set(input.buyer_id),
            event_id: Set(input.event_id),
            transaction_id: Set(input.transaction_id),
            unit_index: Set(input.unit_index),
            ticket_kind: Set(input.kind.as_str().to_string()),
            unit_price: Set(input.unit_price),
            holder_name: Set(input.holder_name),
            holder_email: Set(input.holder_email),
            qr_payload: Set(qr_payload),
            issued_at: Set(issued_at),
        };

        let model = row.insert(&*self.db).await?;

        info!(ticket_id = %model.id, "Ticket persisted");

        Ok(model)
    }

    /// All tickets of one transaction in unit order — the idempotency read
    /// the coordinator consults before committing anything.
    #[instrument(skip(self))]
    pub async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Vec<ticket::Model>, ServiceError> {
        let rows = TicketEntity::find()
            .filter(ticket::Column::TransactionId.eq(transaction_id))
            .order_by_asc(ticket::Column::UnitIndex)
            .all(&*self.db)
            .await?;

        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn list_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<ticket::Model>, ServiceError> {
        let rows = TicketEntity::find()
            .filter(ticket::Column::BuyerId.eq(buyer_id))
            .order_by_desc(ticket::Column::IssuedAt)
            .all(&*self.db)
            .await?;

        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, ticket_id: Uuid) -> Result<Option<ticket::Model>, ServiceError> {
        let row = TicketEntity::find_by_id(ticket_id).one(&*self.db).await?;
        Ok(row)
    }

    /// Scanner-side verification of a stored payload.
    pub fn verify_payload(&self, payload: &str) -> Result<QrClaims, ServiceError> {
        self.signer.decode(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit_test_qr_signing_secret";

    fn claims(unit_index: i32) -> QrClaims {
        QrClaims {
            buyer_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            transaction_id: "txn-abc".to_string(),
            unit_index,
            issued_at: Utc::now(),
            nonce: "00ff".to_string(),
        }
    }

    #[test]
    fn payload_round_trips() {
        let signer = QrSigner::new(SECRET);
        let original = claims(2);
        let payload = signer.mint(&original).unwrap();

        let decoded = signer.decode(&payload).unwrap();
        assert_eq!(decoded.buyer_id, original.buyer_id);
        assert_eq!(decoded.transaction_id, original.transaction_id);
        assert_eq!(decoded.unit_index, 2);
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let signer = QrSigner::new(SECRET);
        let payload = signer.mint(&claims(0)).unwrap();

        // Flip a character in the body.
        let mut chars: Vec<char> = payload.chars().collect();
        chars[3] = if chars[3] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();

        assert!(signer.decode(&tampered).is_err());
    }

    #[test]
    fn payload_signed_with_other_key_fails() {
        let signer = QrSigner::new(SECRET);
        let other = QrSigner::new("a_completely_different_secret");
        let payload = other.mint(&claims(0)).unwrap();

        assert!(signer.decode(&payload).is_err());
    }

    #[test]
    fn units_of_one_transaction_get_distinct_payloads() {
        let signer = QrSigner::new(SECRET);
        let a = signer.mint(&claims(0)).unwrap();
        let b = signer.mint(&claims(1)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn garbage_is_rejected_not_panicked_on() {
        let signer = QrSigner::new(SECRET);
        assert!(signer.decode("no-dot-here").is_err());
        assert!(signer.decode("body.deadbeef").is_err());
        assert!(signer.decode("").is_err());
    }
}
