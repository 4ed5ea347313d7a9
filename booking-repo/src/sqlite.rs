//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use uuid::Uuid;

use booking_types::{
    ApiToken, Booking, BookingKey, BookingStatus, BookingStore, PaymentLedger,
    PaymentRecord, PendingReconciliation, ReconciliationQueue, ReconciliationStatus, RepoError,
    TokenStore,
};

use crate::types::{
    BOOKING_COLUMNS, DbApiToken, DbBooking, DbPayment, DbPendingReconciliation, PAYMENT_COLUMNS,
    RECONCILIATION_COLUMNS, map_write_error,
};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &SqlitePool, sql: &str, name: &str) -> anyhow::Result<()> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_bookings.sql"),
        "0001",
    )
    .await?;
    execute_migration(
        pool,
        include_str!("../migrations/0002_create_payments.sql"),
        "0002",
    )
    .await?;
    execute_migration(
        pool,
        include_str!("../migrations/0003_create_pending_reconciliations.sql"),
        "0003",
    )
    .await?;
    execute_migration(
        pool,
        include_str!("../migrations/0004_create_api_tokens.sql"),
        "0004",
    )
    .await?;
    Ok(())
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to `:memory:` opens its own database.
        let pool = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await?
        } else {
            SqlitePool::connect_with(options).await?
        };

        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bookings
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl BookingStore for SqliteRepo {
    async fn create_booking(&self, booking: Booking) -> Result<Booking, RepoError> {
        let sql = format!(
            "INSERT INTO bookings (id, {BOOKING_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        sqlx::query(&sql)
            .bind(booking.id.to_string())
            .bind(&booking.user.uid)
            .bind(&booking.user.name)
            .bind(&booking.user.email)
            .bind(&booking.service.id)
            .bind(&booking.service.name)
            .bind(&booking.service.description)
            .bind(booking.service.price.to_string())
            .bind(&booking.service.image)
            .bind(&booking.service.category)
            .bind(&booking.service.provider.name)
            .bind(&booking.service.provider.email)
            .bind(booking.status().as_str())
            .bind(&booking.location)
            .bind(booking.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        Ok(booking)
    }

    async fn find_booking(&self, key: &BookingKey) -> Result<Option<Booking>, RepoError> {
        let row: Option<DbBooking> = match key {
            BookingKey::Id(id) => {
                let sql = format!("SELECT id, {BOOKING_COLUMNS} FROM bookings WHERE id = ?");
                sqlx::query_as(&sql)
                    .bind(id.to_string())
                    .fetch_optional(&self.pool)
                    .await
            }
            BookingKey::Payer { service_id, email } => {
                let sql = format!(
                    "SELECT id, {BOOKING_COLUMNS} FROM bookings \
                     WHERE service_id = ? AND LOWER(user_email) = LOWER(?) \
                     ORDER BY CASE WHEN service_status = 'requested' THEN 0 ELSE 1 END, \
                              CASE WHEN service_status = 'requested' THEN created_at END ASC, \
                              created_at DESC \
                     LIMIT 1"
                );
                sqlx::query_as(&sql)
                    .bind(service_id)
                    .bind(email)
                    .fetch_optional(&self.pool)
                    .await
            }
            BookingKey::ServiceId(service_id) => {
                let sql = format!(
                    "SELECT id, {BOOKING_COLUMNS} FROM bookings WHERE service_id = ? \
                     ORDER BY CASE WHEN service_status = 'requested' THEN 0 ELSE 1 END, \
                              CASE WHEN service_status = 'requested' THEN created_at END ASC, \
                              created_at DESC \
                     LIMIT 1"
                );
                sqlx::query_as(&sql)
                    .bind(service_id)
                    .fetch_optional(&self.pool)
                    .await
            }
        }
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbBooking::into_domain).transpose()
    }

    async fn update_status(
        &self,
        key: &BookingKey,
        status: BookingStatus,
    ) -> Result<bool, RepoError> {
        let result = match key {
            BookingKey::Id(id) => {
                sqlx::query("UPDATE bookings SET service_status = ? WHERE id = ?")
                    .bind(status.as_str())
                    .bind(id.to_string())
                    .execute(&self.pool)
                    .await
            }
            BookingKey::Payer { service_id, email } => {
                sqlx::query(
                    "UPDATE bookings SET service_status = ? \
                     WHERE service_id = ? AND LOWER(user_email) = LOWER(?)",
                )
                .bind(status.as_str())
                .bind(service_id)
                .bind(email)
                .execute(&self.pool)
                .await
            }
            BookingKey::ServiceId(service_id) => {
                sqlx::query("UPDATE bookings SET service_status = ? WHERE service_id = ?")
                    .bind(status.as_str())
                    .bind(service_id)
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payment ledger
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl PaymentLedger for SqliteRepo {
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, RepoError> {
        let sql = format!(
            "SELECT id, booking_id, {PAYMENT_COLUMNS} FROM payments WHERE transaction_id = ?"
        );
        let row: Option<DbPayment> = sqlx::query_as(&sql)
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbPayment::into_domain).transpose()
    }

    async fn insert_payment(&self, record: PaymentRecord) -> Result<PaymentRecord, RepoError> {
        let sql = format!(
            "INSERT INTO payments (id, booking_id, {PAYMENT_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        sqlx::query(&sql)
            .bind(record.id.to_string())
            .bind(record.booking_id.map(|id| id.to_string()))
            .bind(&record.transaction_id)
            .bind(&record.service_id)
            .bind(&record.payer.name)
            .bind(&record.payer.email)
            .bind(&record.provider.name)
            .bind(&record.provider.email)
            .bind(&record.service_name)
            .bind(&record.category)
            .bind(record.unit_price.to_string())
            .bind(&record.image)
            .bind(record.quantity as i32)
            .bind(record.amount.amount())
            .bind(record.amount.currency().to_string())
            .bind(record.price.to_string())
            .bind(&record.location)
            .bind(record.status.as_str())
            .bind(record.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        Ok(record)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reconciliation queue
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl ReconciliationQueue for SqliteRepo {
    async fn enqueue_reconciliation(
        &self,
        marker: PendingReconciliation,
    ) -> Result<(), RepoError> {
        let sql = format!(
            "INSERT INTO pending_reconciliations (id, {RECONCILIATION_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );
        sqlx::query(&sql)
            .bind(marker.id.to_string())
            .bind(&marker.transaction_id)
            .bind(marker.booking_key.kind())
            .bind(marker.booking_key.value())
            .bind(marker.target_status.as_str())
            .bind(marker.status.as_ref())
            .bind(marker.attempts)
            .bind(&marker.last_error)
            .bind(marker.created_at)
            .bind(marker.processed_at)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        Ok(())
    }

    async fn pending_reconciliations(
        &self,
        limit: i64,
    ) -> Result<Vec<PendingReconciliation>, RepoError> {
        let sql = format!(
            "SELECT id, {RECONCILIATION_COLUMNS} FROM pending_reconciliations \
             WHERE status = 'PENDING' ORDER BY created_at ASC LIMIT ?"
        );
        let rows: Vec<DbPendingReconciliation> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter()
            .map(DbPendingReconciliation::into_domain)
            .collect()
    }

    async fn mark_reconciliation(
        &self,
        id: Uuid,
        status: ReconciliationStatus,
        last_error: Option<String>,
    ) -> Result<(), RepoError> {
        let result = sqlx::query(
            r#"
            UPDATE pending_reconciliations
            SET status = ?, processed_at = ?, last_error = ?, attempts = attempts + 1
            WHERE id = ?
            "#,
        )
        .bind(status.as_ref())
        .bind(Utc::now())
        .bind(last_error)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API tokens
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl TokenStore for SqliteRepo {
    async fn verify_token_hash(&self, token_hash: &str) -> Result<Option<ApiToken>, RepoError> {
        let row: Option<DbApiToken> = sqlx::query_as(
            r#"
            SELECT id, name, token_hash, is_active, created_at, last_used_at
            FROM api_tokens
            WHERE token_hash = ? AND is_active = 1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let now = Utc::now();
        sqlx::query("UPDATE api_tokens SET last_used_at = ? WHERE id = ?")
            .bind(now)
            .bind(&row.id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        let mut token = row.into_domain()?;
        token.last_used_at = Some(now);
        Ok(Some(token))
    }

    async fn create_first_token(
        &self,
        name: &str,
    ) -> Result<Option<(ApiToken, String)>, RepoError> {
        let raw = crate::security::generate_token();
        let token = ApiToken::new(name.to_string(), crate::security::hash_token(&raw));

        // Single statement so concurrent callers cannot both pass the check.
        let result = sqlx::query(
            r#"
            INSERT INTO api_tokens (id, name, token_hash, is_active, created_at)
            SELECT ?, ?, ?, 1, ?
            WHERE NOT EXISTS (SELECT 1 FROM api_tokens WHERE is_active = 1)
            "#,
        )
        .bind(token.id.to_string())
        .bind(&token.name)
        .bind(&token.token_hash)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some((token, raw)))
    }
}
