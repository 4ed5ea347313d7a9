use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::booking::{BookingKey, BookingStatus};
use super::payment::PaymentId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReconciliationStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl AsRef<str> for ReconciliationStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for ReconciliationStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            _ => Self::Pending,
        })
    }
}

/// Durable marker for a booking status update that did not land after its
/// ledger entry was written.
#[derive(Debug, Clone)]
pub struct PendingReconciliation {
    pub id: Uuid,
    pub transaction_id: String,
    pub booking_key: BookingKey,
    pub target_status: BookingStatus,
    pub status: ReconciliationStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl PendingReconciliation {
    pub fn new(
        transaction_id: impl Into<String>,
        booking_key: BookingKey,
        target_status: BookingStatus,
        last_error: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id: transaction_id.into(),
            booking_key,
            target_status,
            status: ReconciliationStatus::Pending,
            attempts: 0,
            last_error,
            created_at: Utc::now(),
            processed_at: None,
        }
    }
}

/// Why a reconciliation call wrote nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotPayableReason {
    /// Gateway session is open, expired, or canceled
    SessionNotComplete,
    /// No booking matches the session metadata
    BookingNotFound,
    /// Session carries no payment-intent id
    MissingTransactionId,
    /// Session carries no settled amount
    MissingSettledAmount,
    /// Session metadata names neither a booking nor a service
    MissingServiceReference,
}

/// Result of reconciling one checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// A new ledger entry was written by this call.
    Recorded {
        transaction_id: String,
        order_id: PaymentId,
    },
    /// The ledger already held this transaction; nothing was written.
    AlreadyRecorded {
        transaction_id: String,
        order_id: PaymentId,
    },
    NotPayable {
        reason: NotPayableReason,
        detail: Option<String>,
    },
}

impl ReconciliationOutcome {
    pub fn not_payable(reason: NotPayableReason) -> Self {
        Self::NotPayable {
            reason,
            detail: None,
        }
    }

    pub fn order_id(&self) -> Option<PaymentId> {
        match self {
            Self::Recorded { order_id, .. } | Self::AlreadyRecorded { order_id, .. } => {
                Some(*order_id)
            }
            Self::NotPayable { .. } => None,
        }
    }
}
