//! Domain models for the booking payment service.

pub mod booking;
pub mod checkout;
pub mod money;
pub mod payment;
pub mod reconciliation;
pub mod token;

pub use booking::{Booking, BookingId, BookingKey, BookingStatus, BookingUser, Party, ServiceSnapshot};
pub use checkout::{
    CheckoutMode, CreatedCheckoutSession, GatewaySession, LineItem, META_BOOKING_ID,
    META_CUSTOMER, META_LOCATION, META_SERVICE_ID, NewCheckoutSession, SessionStatus,
};
pub use money::{Currency, Money};
pub use payment::{PaymentId, PaymentRecord, PaymentStatus};
pub use reconciliation::{
    NotPayableReason, PendingReconciliation, ReconciliationOutcome, ReconciliationStatus,
};
pub use token::{ApiToken, ApiTokenId};
