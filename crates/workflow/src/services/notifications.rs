//! Notification service trait and in-memory implementation.
//!
//! The real channel is a publish-only topic fanning out to downstream
//! subscribers (e.g. a loyalty service crediting points on success); the
//! in-memory implementation keeps the published log for assertions.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::CustomerId;
use serde::{Deserialize, Serialize};

use crate::error::StepFailure;

/// A customer-facing booking notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BookingNotification {
    /// The booking confirmed.
    Success {
        customer_id: CustomerId,
        booking_reference: String,
    },
    /// The booking failed and was unwound.
    Failure {
        customer_id: CustomerId,
        reason: String,
    },
}

impl BookingNotification {
    /// Returns true for success notifications.
    pub fn is_success(&self) -> bool {
        matches!(self, BookingNotification::Success { .. })
    }
}

/// Trait for publishing booking notifications.
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Publishes a notification to the topic and returns its ID.
    async fn publish(&self, notification: BookingNotification) -> Result<String, StepFailure>;
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    published: Vec<(String, BookingNotification)>,
    next_id: u32,
    faults: VecDeque<StepFailure>,
}

/// In-memory notification service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationService {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationService {
    /// Creates a new in-memory notification service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the next `times` publish calls to fail.
    pub fn fail_publish_times(&self, failure: StepFailure, times: usize) {
        let mut state = self.state.write().unwrap();
        for _ in 0..times {
            state.faults.push_back(failure.clone());
        }
    }

    /// Returns all published notifications.
    pub fn published(&self) -> Vec<(String, BookingNotification)> {
        self.state.read().unwrap().published.clone()
    }

    /// Returns the number of published notifications.
    pub fn published_count(&self) -> usize {
        self.state.read().unwrap().published.len()
    }

    /// Returns the number of published success notifications.
    pub fn success_count(&self) -> usize {
        self.state
            .read()
            .unwrap()
            .published
            .iter()
            .filter(|(_, n)| n.is_success())
            .count()
    }

    /// Returns the number of published failure notifications.
    pub fn failure_count(&self) -> usize {
        self.published_count() - self.success_count()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn publish(&self, notification: BookingNotification) -> Result<String, StepFailure> {
        let mut state = self.state.write().unwrap();

        if let Some(failure) = state.faults.pop_front() {
            return Err(failure);
        }

        state.next_id += 1;
        let notification_id = format!("NOTIFY-{:04}", state.next_id);
        state
            .published
            .push((notification_id.clone(), notification));
        Ok(notification_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    #[tokio::test]
    async fn publish_success_and_failure() {
        let service = InMemoryNotificationService::new();
        let customer_id = CustomerId::new();

        let id = service
            .publish(BookingNotification::Success {
                customer_id,
                booking_reference: "BK-000001".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(id, "NOTIFY-0001");

        service
            .publish(BookingNotification::Failure {
                customer_id,
                reason: "no seats".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(service.published_count(), 2);
        assert_eq!(service.success_count(), 1);
        assert_eq!(service.failure_count(), 1);
    }

    #[tokio::test]
    async fn scripted_publish_failure() {
        let service = InMemoryNotificationService::new();
        service.fail_publish_times(
            StepFailure::new(ErrorClass::BookingNotification, "topic down"),
            1,
        );

        let err = service
            .publish(BookingNotification::Failure {
                customer_id: CustomerId::new(),
                reason: "x".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.class, ErrorClass::BookingNotification);
        assert_eq!(service.published_count(), 0);
    }
}
