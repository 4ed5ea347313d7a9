//! PostgreSQL repository adapter.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
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
// PostgreSQL Repository
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL repository.
pub struct PostgresRepo {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
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

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_bookings_pg.sql"),
        "0001",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0002_create_payments_pg.sql"),
        "0002",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0003_create_pending_reconciliations_pg.sql"),
        "0003",
    )
    .await?;

    execute_migration(
        pool,
        include_str!("../migrations/0004_create_api_tokens_pg.sql"),
        "0004",
    )
    .await?;

    Ok(())
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bookings
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl BookingStore for PostgresRepo {
    async fn create_booking(&self, booking: Booking) -> Result<Booking, RepoError> {
        let sql = format!(
            "INSERT INTO bookings (id, {BOOKING_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        );
        sqlx::query(&sql)
            .bind(*booking.id.as_uuid())
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
                let sql = format!(
                    "SELECT id::text AS id, {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
                );
                sqlx::query_as(&sql)
                    .bind(*id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
            }
            BookingKey::Payer { service_id, email } => {
                let sql = format!(
                    "SELECT id::text AS id, {BOOKING_COLUMNS} FROM bookings \
                     WHERE service_id = $1 AND LOWER(user_email) = LOWER($2) \
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
                    "SELECT id::text AS id, {BOOKING_COLUMNS} FROM bookings WHERE service_id = $1 \
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
                sqlx::query("UPDATE bookings SET service_status = $1 WHERE id = $2")
                    .bind(status.as_str())
                    .bind(*id.as_uuid())
                    .execute(&self.pool)
                    .await
            }
            BookingKey::Payer { service_id, email } => {
                sqlx::query(
                    "UPDATE bookings SET service_status = $1 \
                     WHERE service_id = $2 AND LOWER(user_email) = LOWER($3)",
                )
                .bind(status.as_str())
                .bind(service_id)
                .bind(email)
                .execute(&self.pool)
                .await
            }
            BookingKey::ServiceId(service_id) => {
                sqlx::query("UPDATE bookings SET service_status = $1 WHERE service_id = $2")
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
impl PaymentLedger for PostgresRepo {
    async fn find_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<PaymentRecord>, RepoError> {
        let sql = format!(
            "SELECT id::text AS id, booking_id::text AS booking_id, {PAYMENT_COLUMNS} \
             FROM payments WHERE transaction_id = $1"
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
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                     $17, $18, $19)"
        );
        sqlx::query(&sql)
            .bind(*record.id.as_uuid())
            .bind(record.booking_id.map(|id| id.into_uuid()))
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
impl ReconciliationQueue for PostgresRepo {
    async fn enqueue_reconciliation(
        &self,
        marker: PendingReconciliation,
    ) -> Result<(), RepoError> {
        let sql = format!(
            "INSERT INTO pending_reconciliations (id, {RECONCILIATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );
        sqlx::query(&sql)
            .bind(marker.id)
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
            "SELECT id::text AS id, {RECONCILIATION_COLUMNS} FROM pending_reconciliations \
             WHERE status = 'PENDING' ORDER BY created_at ASC LIMIT $1"
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
            SET status = $1, processed_at = $2, last_error = $3, attempts = attempts + 1
            WHERE id = $4
            "#,
        )
        .bind(status.as_ref())
        .bind(Utc::now())
        .bind(last_error)
        .bind(id)
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
impl TokenStore for PostgresRepo {
    async fn verify_token_hash(&self, token_hash: &str) -> Result<Option<ApiToken>, RepoError> {
        let row: Option<DbApiToken> = sqlx::query_as(
            r#"
            UPDATE api_tokens
            SET last_used_at = NOW()
            WHERE token_hash = $1 AND is_active = TRUE
            RETURNING id::text AS id, name, token_hash, is_active, created_at, last_used_at
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbApiToken::into_domain).transpose()
    }

    async fn create_first_token(
        &self,
        name: &str,
    ) -> Result<Option<(ApiToken, String)>, RepoError> {
        let raw = crate::security::generate_token();
        let token = ApiToken::new(name.to_string(), crate::security::hash_token(&raw));

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        // Serializes bootstrap attempts; plain reads of the table are unaffected.
        sqlx::query("LOCK TABLE api_tokens IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO api_tokens (id, name, token_hash, is_active, created_at)
            SELECT $1, $2, $3, TRUE, $4
            WHERE NOT EXISTS (SELECT 1 FROM api_tokens WHERE is_active = TRUE)
            "#,
        )
        .bind(*token.id.as_uuid())
        .bind(&token.name)
        .bind(&token.token_hash)
        .bind(token.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit()
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some((token, raw)))
    }
}
