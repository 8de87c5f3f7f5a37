//! Payment service trait and in-memory implementation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{CustomerId, Money};
use serde::{Deserialize, Serialize};

use crate::error::StepFailure;

/// Receipt for a collected payment; consumed by the refund compensation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// The charge ID assigned by the payment service.
    pub receipt_id: String,
    /// The amount that was charged.
    pub amount: Money,
}

/// Trait for payment collection and refund.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Charges the customer via the given payment token.
    async fn collect(
        &self,
        customer_id: CustomerId,
        payment_token: &str,
        amount: Money,
    ) -> Result<PaymentReceipt, StepFailure>;

    /// Refunds a previously collected payment.
    async fn refund(&self, receipt: &PaymentReceipt) -> Result<(), StepFailure>;
}

#[derive(Debug)]
struct PaymentRecord {
    #[allow(dead_code)]
    customer_id: CustomerId,
    #[allow(dead_code)]
    amount: Money,
    refunded: bool,
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    payments: HashMap<String, PaymentRecord>,
    next_id: u32,
    collect_faults: VecDeque<StepFailure>,
    refund_faults: VecDeque<StepFailure>,
    collect_calls: u64,
    refund_calls: u64,
}

/// In-memory payment service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    /// Creates a new in-memory payment service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the next `times` collect calls to fail.
    pub fn fail_collect_times(&self, failure: StepFailure, times: usize) {
        let mut state = self.state.write().unwrap();
        for _ in 0..times {
            state.collect_faults.push_back(failure.clone());
        }
    }

    /// Scripts the next `times` refund calls to fail.
    pub fn fail_refund_times(&self, failure: StepFailure, times: usize) {
        let mut state = self.state.write().unwrap();
        for _ in 0..times {
            state.refund_faults.push_back(failure.clone());
        }
    }

    /// Returns the number of captured (non-refunded) payments.
    pub fn captured_count(&self) -> usize {
        self.state
            .read()
            .unwrap()
            .payments
            .values()
            .filter(|p| !p.refunded)
            .count()
    }

    /// Returns true if the payment was refunded.
    pub fn is_refunded(&self, receipt_id: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .payments
            .get(receipt_id)
            .is_some_and(|p| p.refunded)
    }

    /// Total collect calls made, including failed ones.
    pub fn collect_call_count(&self) -> u64 {
        self.state.read().unwrap().collect_calls
    }

    /// Total refund calls made, including failed ones.
    pub fn refund_call_count(&self) -> u64 {
        self.state.read().unwrap().refund_calls
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn collect(
        &self,
        customer_id: CustomerId,
        _payment_token: &str,
        amount: Money,
    ) -> Result<PaymentReceipt, StepFailure> {
        let mut state = self.state.write().unwrap();
        state.collect_calls += 1;

        if let Some(failure) = state.collect_faults.pop_front() {
            return Err(failure);
        }

        state.next_id += 1;
        let receipt_id = format!("PAY-{:04}", state.next_id);
        state.payments.insert(
            receipt_id.clone(),
            PaymentRecord {
                customer_id,
                amount,
                refunded: false,
            },
        );

        Ok(PaymentReceipt { receipt_id, amount })
    }

    async fn refund(&self, receipt: &PaymentReceipt) -> Result<(), StepFailure> {
        let mut state = self.state.write().unwrap();
        state.refund_calls += 1;

        if let Some(failure) = state.refund_faults.pop_front() {
            return Err(failure);
        }

        if let Some(payment) = state.payments.get_mut(&receipt.receipt_id) {
            payment.refunded = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    #[tokio::test]
    async fn collect_and_refund() {
        let service = InMemoryPaymentService::new();
        let customer_id = CustomerId::new();
        let amount = Money::from_cents(25000);

        let receipt = service
            .collect(customer_id, "tok_visa", amount)
            .await
            .unwrap();
        assert!(receipt.receipt_id.starts_with("PAY-"));
        assert_eq!(receipt.amount, amount);
        assert_eq!(service.captured_count(), 1);

        service.refund(&receipt).await.unwrap();
        assert_eq!(service.captured_count(), 0);
        assert!(service.is_refunded(&receipt.receipt_id));
    }

    #[tokio::test]
    async fn scripted_collect_failures_then_success() {
        let service = InMemoryPaymentService::new();
        service.fail_collect_times(
            StepFailure::new(ErrorClass::PaymentProcessing, "declined"),
            2,
        );

        let customer_id = CustomerId::new();
        let amount = Money::from_cents(100);

        for _ in 0..2 {
            let err = service
                .collect(customer_id, "tok", amount)
                .await
                .unwrap_err();
            assert_eq!(err.class, ErrorClass::PaymentProcessing);
        }
        service.collect(customer_id, "tok", amount).await.unwrap();
        assert_eq!(service.collect_call_count(), 3);
        assert_eq!(service.captured_count(), 1);
    }

    #[tokio::test]
    async fn refund_of_unknown_receipt_is_a_no_op() {
        let service = InMemoryPaymentService::new();
        let receipt = PaymentReceipt {
            receipt_id: "PAY-9999".to_string(),
            amount: Money::from_cents(1),
        };
        service.refund(&receipt).await.unwrap();
        assert_eq!(service.refund_call_count(), 1);
    }
}
