//! Collaborator service traits and in-memory implementations for the
//! booking workflow steps.

pub mod bookings;
pub mod notifications;
pub mod payments;

pub use bookings::{BookingService, BookingStatus, InMemoryBookingService};
pub use notifications::{BookingNotification, InMemoryNotificationService, NotificationService};
pub use payments::{InMemoryPaymentService, PaymentReceipt, PaymentService};
