//! Repository port traits.
//!
//! These are the primary ports in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory) implement them.

use uuid::Uuid;

use crate::domain::{
    ApiToken, Booking, BookingKey, BookingStatus, PaymentRecord,
    PendingReconciliation, ReconciliationStatus,
};
use crate::error::RepoError;

/// Persisted booking snapshots.
#[async_trait::async_trait]
pub trait BookingStore: Send + Sync + 'static {
    /// Stores a new booking.
    async fn create_booking(&self, booking: Booking) -> Result<Booking, RepoError>;

    /// Finds the booking matching a key.
    ///
    /// A service-id key can match several bookings: the oldest one still
    /// `requested` wins, otherwise the most recent one.
    async fn find_booking(&self, key: &BookingKey) -> Result<Option<Booking>, RepoError>;

    /// Sets `service.status` on the booking(s) matching the key.
    /// Callers resolve to `BookingKey::Id` to touch exactly one booking.
    ///
    /// Returns `false` when nothing matched. Setting the same status twice
    /// is harmless.
    async fn update_status(&self, key: &BookingKey, status: BookingStatus)
    -> Result<bool, RepoError>;
}

/// Append-only ledger of settled payments.
#[async_trait::async_trait]
pub trait PaymentLedger: Send + Sync + 'static {
    /// Finds a ledger entry by the gateway's transaction id.
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, RepoError>;

    /// Appends a ledger entry.
    ///
    /// MUST be rejected with `RepoError::Conflict` if an entry with the same
    /// `transaction_id` already exists. Implementations enforce this with a
    /// unique constraint, not a prior read.
    async fn insert_payment(&self, record: PaymentRecord) -> Result<PaymentRecord, RepoError>;
}

/// Durable queue of booking status updates still owed to the ledger.
#[async_trait::async_trait]
pub trait ReconciliationQueue: Send + Sync + 'static {
    async fn enqueue_reconciliation(&self, marker: PendingReconciliation)
    -> Result<(), RepoError>;

    /// Oldest pending markers first.
    async fn pending_reconciliations(
        &self,
        limit: i64,
    ) -> Result<Vec<PendingReconciliation>, RepoError>;

    /// Records the outcome of one sweep attempt (increments `attempts`).
    async fn mark_reconciliation(
        &self,
        id: Uuid,
        status: ReconciliationStatus,
        last_error: Option<String>,
    ) -> Result<(), RepoError>;
}

/// Hashed API tokens.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync + 'static {
    /// Returns the active token with this hash, if any.
    async fn verify_token_hash(&self, token_hash: &str) -> Result<Option<ApiToken>, RepoError>;

    /// Issues a token only when no active token exists, returning it
    /// together with the raw value. `None` when a token already exists.
    ///
    /// The existence check and the insert happen atomically.
    async fn create_first_token(
        &self,
        name: &str,
    ) -> Result<Option<(ApiToken, String)>, RepoError>;
}

/// Everything the application service needs from storage.
pub trait Repository: BookingStore + PaymentLedger + ReconciliationQueue + TokenStore {}

impl<T> Repository for T where T: BookingStore + PaymentLedger + ReconciliationQueue + TokenStore {}
