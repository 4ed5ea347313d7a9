//! Checkout Application Service
//!
//! Orchestrates checkout initiation and payment reconciliation through the
//! store ports and the payment gateway port.
//! Contains NO infrastructure logic - pure business orchestration.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, error, info, instrument, warn};

use booking_types::{
    AppError, Booking, BookingKey, BookingStatus, CheckoutMode, CheckoutRequest,
    CheckoutSessionResponse, CreateBookingRequest, CreateTokenRequest, Currency, LineItem,
    META_BOOKING_ID, META_CUSTOMER, META_LOCATION, META_SERVICE_ID, Money, NewCheckoutSession,
    NotPayableReason, Party, PaymentGateway, PaymentRecord, PendingReconciliation,
    ReconciliationOutcome, RepoError, Repository, ServiceSnapshot, TokenResponse,
};

/// Shown on the checkout page when the service has no description.
pub const DEFAULT_DESCRIPTION: &str = "No description available...!";

/// Storefront-facing checkout settings.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Public storefront origin used for the redirect URLs
    pub site_domain: String,
    pub currency: Currency,
    /// Region recorded when the customer gives none
    pub default_location: String,
}

impl CheckoutSettings {
    pub fn new(site_domain: impl Into<String>) -> Self {
        let site_domain: String = site_domain.into();
        Self {
            site_domain: site_domain.trim_end_matches('/').to_string(),
            currency: Currency::BDT,
            default_location: "Dhaka".to_string(),
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_default_location(mut self, location: impl Into<String>) -> Self {
        self.default_location = location.into();
        self
    }

    /// The gateway substitutes `{CHECKOUT_SESSION_ID}` on redirect.
    pub fn success_url(&self) -> String {
        format!(
            "{}/payment-success?session_id={{CHECKOUT_SESSION_ID}}",
            self.site_domain
        )
    }

    pub fn cancel_url(&self) -> String {
        format!("{}/dashboard/bookings", self.site_domain)
    }
}

/// Application service for bookings, checkout and reconciliation.
///
/// Generic over `R: Repository` and `G: PaymentGateway` - both adapters are
/// injected at construction. The repository sits behind an `Arc` so the
/// reconciliation sweeper can share it.
pub struct CheckoutService<R: Repository, G: PaymentGateway> {
    repo: Arc<R>,
    gateway: G,
    settings: CheckoutSettings,
}

impl<R: Repository, G: PaymentGateway> CheckoutService<R, G> {
    /// Creates a new checkout service with the given adapters.
    pub fn new(repo: R, gateway: G, settings: CheckoutSettings) -> Self {
        Self::with_shared_repo(Arc::new(repo), gateway, settings)
    }

    pub fn with_shared_repo(repo: Arc<R>, gateway: G, settings: CheckoutSettings) -> Self {
        Self {
            repo,
            gateway,
            settings,
        }
    }

    /// Returns a reference to the underlying repository.
    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Returns a handle to the repository for background workers.
    pub fn shared_repo(&self) -> Arc<R> {
        self.repo.clone()
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn settings(&self) -> &CheckoutSettings {
        &self.settings
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Bookings
    // ─────────────────────────────────────────────────────────────────────────────

    /// Stores a booking snapshot in the `requested` state.
    #[instrument(skip(self, req), fields(service_id = %req.service.id))]
    pub async fn create_booking(&self, req: CreateBookingRequest) -> Result<Booking, AppError> {
        let service = ServiceSnapshot {
            id: req.service.id,
            name: req.service.name,
            description: req.service.description,
            price: req.service.price,
            image: req.service.image,
            category: req.service.category,
            provider: req.service.provider,
            status: BookingStatus::Requested,
        };
        let booking = Booking::new(req.user, service, req.location)?;

        let booking = self.repo.create_booking(booking).await?;
        info!(booking_id = %booking.id, "Booking created");
        Ok(booking)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Checkout
    // ─────────────────────────────────────────────────────────────────────────────

    /// Opens a hosted checkout session and returns its redirect URL.
    ///
    /// Nothing is written to any store; the booking context travels as
    /// session metadata.
    #[instrument(skip(self, req), fields(service_id = %req.service.id))]
    pub async fn create_checkout_session(
        &self,
        req: CheckoutRequest,
    ) -> Result<CheckoutSessionResponse, AppError> {
        let session = self.build_checkout_session(&req)?;
        let created = self.gateway.create_checkout_session(session).await?;

        info!(session_id = %created.id, "Checkout session created");
        Ok(CheckoutSessionResponse { url: created.url })
    }

    /// Translates a checkout request into the gateway's session shape.
    pub fn build_checkout_session(
        &self,
        req: &CheckoutRequest,
    ) -> Result<NewCheckoutSession, AppError> {
        if req.service.id.trim().is_empty() {
            return Err(AppError::BadRequest("Service id cannot be empty".into()));
        }
        if req.service.name.trim().is_empty() {
            return Err(AppError::BadRequest("Service name cannot be empty".into()));
        }
        if req.user.email.trim().is_empty() {
            return Err(AppError::BadRequest("Customer email cannot be empty".into()));
        }
        if req.total_price <= Decimal::ZERO {
            return Err(AppError::BadRequest("Total price must be positive".into()));
        }

        let unit_amount = Money::from_major_truncated(req.total_price, self.settings.currency)?;
        if unit_amount.amount() == 0 {
            return Err(AppError::BadRequest(
                "Total price is below the smallest currency unit".into(),
            ));
        }

        let description = req
            .service
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

        let location = req
            .location
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.settings.default_location.clone());

        let mut metadata = BTreeMap::new();
        metadata.insert(META_SERVICE_ID.to_string(), req.service.id.clone());
        if let Some(booking_id) = req.booking_id {
            metadata.insert(META_BOOKING_ID.to_string(), booking_id.to_string());
        }
        metadata.insert(META_CUSTOMER.to_string(), req.user.name.clone());
        metadata.insert(META_LOCATION.to_string(), location);

        Ok(NewCheckoutSession {
            line_items: vec![LineItem {
                name: req.service.name.clone(),
                description,
                images: req.service.image.iter().cloned().collect(),
                unit_amount,
                quantity: 1,
            }],
            customer_email: req.user.email.clone(),
            mode: CheckoutMode::Payment,
            metadata,
            success_url: self.settings.success_url(),
            cancel_url: self.settings.cancel_url(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────────────────────

    /// Reconciles a checkout session into the ledger.
    ///
    /// At most one ledger entry is written per transaction id. The booking
    /// status update only happens after that entry is accepted; if it fails
    /// the update is queued for the sweeper and the outcome is still
    /// `Recorded`.
    #[instrument(skip(self))]
    pub async fn complete_payment(
        &self,
        session_id: &str,
    ) -> Result<ReconciliationOutcome, AppError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(AppError::BadRequest("Session id cannot be empty".into()));
        }

        let session = self.gateway.retrieve_session(session_id).await?;

        if !session.is_complete() {
            info!(status = %session.status, "Checkout session not complete");
            return Ok(ReconciliationOutcome::NotPayable {
                reason: NotPayableReason::SessionNotComplete,
                detail: Some(session.status.to_string()),
            });
        }

        let Some(key) = session.booking_key() else {
            warn!("Checkout session names neither a booking nor a service");
            return Ok(ReconciliationOutcome::not_payable(
                NotPayableReason::MissingServiceReference,
            ));
        };

        let Some(transaction_id) = session
            .payment_intent
            .clone()
            .filter(|pi| !pi.trim().is_empty())
        else {
            warn!(%key, "Completed checkout session has no payment intent");
            return Ok(ReconciliationOutcome::not_payable(
                NotPayableReason::MissingTransactionId,
            ));
        };

        let Some(amount_total) = session.amount_total.filter(|a| *a >= 0) else {
            warn!(%key, %transaction_id, "Completed checkout session has no settled amount");
            return Ok(ReconciliationOutcome::not_payable(
                NotPayableReason::MissingSettledAmount,
            ));
        };

        if let Some(existing) = self.repo.find_by_transaction_id(&transaction_id).await? {
            debug!(%transaction_id, "Transaction already on the ledger");
            return Ok(ReconciliationOutcome::AlreadyRecorded {
                transaction_id,
                order_id: existing.id,
            });
        }

        let Some(booking) = self.repo.find_booking(&key).await? else {
            warn!(%key, %transaction_id, "No booking matches checkout session");
            return Ok(ReconciliationOutcome::NotPayable {
                reason: NotPayableReason::BookingNotFound,
                detail: Some(key.to_string()),
            });
        };

        let currency = session
            .currency
            .as_deref()
            .and_then(|c| c.parse::<Currency>().ok())
            .unwrap_or(self.settings.currency);
        let amount = Money::new(amount_total, currency)?;

        let payer = Party {
            name: session
                .metadata_value(META_CUSTOMER)
                .map(str::to_string)
                .unwrap_or_else(|| booking.user.name.clone()),
            email: session
                .customer_email
                .clone()
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| booking.user.email.clone()),
        };
        let location = session.metadata_value(META_LOCATION).map(str::to_string);

        let record = PaymentRecord::settle(
            &booking,
            transaction_id.clone(),
            amount,
            payer,
            location,
        );

        let record = match self.repo.insert_payment(record).await {
            Ok(record) => record,
            Err(RepoError::Conflict(_)) => {
                // Lost the race to a concurrent reconciliation of the same payment.
                let existing = self
                    .repo
                    .find_by_transaction_id(&transaction_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal(format!(
                            "Ledger rejected {} as duplicate but has no entry for it",
                            transaction_id
                        ))
                    })?;
                debug!(%transaction_id, "Concurrent reconciliation recorded the payment first");
                return Ok(ReconciliationOutcome::AlreadyRecorded {
                    transaction_id,
                    order_id: existing.id,
                });
            }
            Err(e) => return Err(e.into()),
        };

        info!(%transaction_id, order_id = %record.id, "Payment recorded");

        if !booking.status().can_transition_to(BookingStatus::Paid) {
            debug!(booking_id = %booking.id, status = %booking.status(), "Booking already paid");
        } else {
            self.mark_booking_paid(&booking, &transaction_id).await;
        }

        Ok(ReconciliationOutcome::Recorded {
            transaction_id,
            order_id: record.id,
        })
    }

    /// Applies the booking transition, queueing it when the store refuses.
    async fn mark_booking_paid(&self, booking: &Booking, transaction_id: &str) {
        let key = BookingKey::Id(booking.id);
        let failure = match self.repo.update_status(&key, BookingStatus::Paid).await {
            Ok(true) => {
                info!(%key, "Booking marked paid");
                return;
            }
            Ok(false) => {
                warn!(%key, transaction_id, "Booking vanished before status update");
                format!("no booking matches {}", key)
            }
            Err(e) => {
                error!(
                    %key,
                    transaction_id, "Booking status update failed after ledger write: {}", e
                );
                e.to_string()
            }
        };

        let marker = PendingReconciliation::new(
            transaction_id,
            key.clone(),
            BookingStatus::Paid,
            Some(failure),
        );
        if let Err(e) = self.repo.enqueue_reconciliation(marker).await {
            error!(%key, transaction_id, "Failed to queue booking status update: {}", e);
        }
    }

    /// Gets a ledger entry by its gateway transaction id.
    #[instrument(skip(self))]
    pub async fn get_payment_by_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<PaymentRecord, AppError> {
        self.repo
            .find_by_transaction_id(transaction_id)
            .await
            .map_err(Into::into)
            .and_then(|opt| {
                opt.ok_or_else(|| AppError::NotFound(format!("Payment {}", transaction_id)))
            })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // API tokens
    // ─────────────────────────────────────────────────────────────────────────────

    /// Issues the first API token. Refused once any token exists.
    #[instrument(skip(self, req), fields(token_name = %req.name))]
    pub async fn bootstrap_token(&self, req: CreateTokenRequest) -> Result<TokenResponse, AppError> {
        if req.name.trim().is_empty() {
            return Err(AppError::BadRequest("Token name cannot be empty".into()));
        }

        let Some((_token, raw)) = self.repo.create_first_token(&req.name).await? else {
            return Err(AppError::BadRequest(
                "Bootstrap not allowed: API tokens already exist".into(),
            ));
        };

        Ok(TokenResponse {
            api_token: raw,
            message: "First API token created. Save it securely - it won't be shown again!"
                .into(),
        })
    }
}
