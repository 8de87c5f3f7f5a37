//! Booking record service trait and in-memory implementation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{BookingId, CustomerId, FlightId};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorClass, StepFailure};

/// Lifecycle status of a booking record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    /// Record created, awaiting payment and confirmation.
    Reserved,
    /// Finalized; has a booking reference.
    Confirmed,
    /// Cancelled by compensation.
    Cancelled,
}

/// Trait for booking record operations.
///
/// The table is a symbolic reference resolved by the implementation, like
/// the seat store's.
#[async_trait]
pub trait BookingService: Send + Sync {
    /// Creates a booking record in Reserved status.
    async fn reserve(
        &self,
        table: &str,
        flight_id: &FlightId,
        customer_id: CustomerId,
    ) -> Result<BookingId, StepFailure>;

    /// Finalizes a reserved booking and returns its booking reference.
    async fn confirm(&self, table: &str, booking_id: BookingId) -> Result<String, StepFailure>;

    /// Cancels a booking. Cancelling an already-cancelled or unknown
    /// booking is a no-op; compensation must be safe to repeat.
    async fn cancel(&self, table: &str, booking_id: BookingId) -> Result<(), StepFailure>;
}

#[derive(Debug)]
struct BookingRecord {
    #[allow(dead_code)]
    flight_id: FlightId,
    #[allow(dead_code)]
    customer_id: CustomerId,
    status: BookingStatus,
    reference: Option<String>,
}

#[derive(Debug, Default)]
struct InMemoryBookingState {
    tables: HashMap<String, HashMap<BookingId, BookingRecord>>,
    next_reference: u32,
    reserve_faults: VecDeque<StepFailure>,
    confirm_faults: VecDeque<StepFailure>,
    cancel_faults: VecDeque<StepFailure>,
    reserve_calls: u64,
    confirm_calls: u64,
    cancel_calls: u64,
}

/// In-memory booking service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookingService {
    state: Arc<RwLock<InMemoryBookingState>>,
}

impl InMemoryBookingService {
    /// Creates a new in-memory booking service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the next `times` reserve calls to fail.
    pub fn fail_reserve_times(&self, failure: StepFailure, times: usize) {
        let mut state = self.state.write().unwrap();
        for _ in 0..times {
            state.reserve_faults.push_back(failure.clone());
        }
    }

    /// Scripts the next `times` confirm calls to fail.
    pub fn fail_confirm_times(&self, failure: StepFailure, times: usize) {
        let mut state = self.state.write().unwrap();
        for _ in 0..times {
            state.confirm_faults.push_back(failure.clone());
        }
    }

    /// Scripts the next `times` cancel calls to fail.
    pub fn fail_cancel_times(&self, failure: StepFailure, times: usize) {
        let mut state = self.state.write().unwrap();
        for _ in 0..times {
            state.cancel_faults.push_back(failure.clone());
        }
    }

    /// Returns the number of non-cancelled bookings in a table.
    pub fn active_count(&self, table: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .tables
            .get(table)
            .map(|t| {
                t.values()
                    .filter(|r| r.status != BookingStatus::Cancelled)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Returns the status of a booking, if it exists.
    pub fn status_of(&self, table: &str, booking_id: BookingId) -> Option<BookingStatus> {
        self.state
            .read()
            .unwrap()
            .tables
            .get(table)
            .and_then(|t| t.get(&booking_id))
            .map(|r| r.status)
    }

    /// Total reserve calls made, including failed ones.
    pub fn reserve_call_count(&self) -> u64 {
        self.state.read().unwrap().reserve_calls
    }

    /// Total confirm calls made, including failed ones.
    pub fn confirm_call_count(&self) -> u64 {
        self.state.read().unwrap().confirm_calls
    }

    /// Total cancel calls made, including failed ones.
    pub fn cancel_call_count(&self) -> u64 {
        self.state.read().unwrap().cancel_calls
    }
}

#[async_trait]
impl BookingService for InMemoryBookingService {
    async fn reserve(
        &self,
        table: &str,
        flight_id: &FlightId,
        customer_id: CustomerId,
    ) -> Result<BookingId, StepFailure> {
        let mut state = self.state.write().unwrap();
        state.reserve_calls += 1;

        if let Some(failure) = state.reserve_faults.pop_front() {
            return Err(failure);
        }

        let booking_id = BookingId::new();
        state.tables.entry(table.to_string()).or_default().insert(
            booking_id,
            BookingRecord {
                flight_id: flight_id.clone(),
                customer_id,
                status: BookingStatus::Reserved,
                reference: None,
            },
        );
        Ok(booking_id)
    }

    async fn confirm(&self, table: &str, booking_id: BookingId) -> Result<String, StepFailure> {
        let mut state = self.state.write().unwrap();
        state.confirm_calls += 1;

        if let Some(failure) = state.confirm_faults.pop_front() {
            return Err(failure);
        }

        state.next_reference += 1;
        let next_reference = state.next_reference;

        let record = state
            .tables
            .get_mut(table)
            .and_then(|t| t.get_mut(&booking_id))
            .ok_or_else(|| {
                StepFailure::new(
                    ErrorClass::BookingConfirmation,
                    format!("unknown booking {booking_id}"),
                )
            })?;

        match record.status {
            BookingStatus::Cancelled => Err(StepFailure::new(
                ErrorClass::BookingConfirmation,
                format!("booking {booking_id} is cancelled"),
            )),
            BookingStatus::Confirmed => Ok(record
                .reference
                .clone()
                .unwrap_or_else(|| format!("BK-{next_reference:06}"))),
            BookingStatus::Reserved => {
                let reference = format!("BK-{next_reference:06}");
                record.status = BookingStatus::Confirmed;
                record.reference = Some(reference.clone());
                Ok(reference)
            }
        }
    }

    async fn cancel(&self, table: &str, booking_id: BookingId) -> Result<(), StepFailure> {
        let mut state = self.state.write().unwrap();
        state.cancel_calls += 1;

        if let Some(failure) = state.cancel_faults.pop_front() {
            return Err(failure);
        }

        if let Some(record) = state
            .tables
            .get_mut(table)
            .and_then(|t| t.get_mut(&booking_id))
        {
            record.status = BookingStatus::Cancelled;
        }
        Ok(())
    }
}
