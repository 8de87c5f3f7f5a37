//! In-memory seat store implementation for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use common::FlightId;
use tokio::sync::RwLock;

use crate::error::{SeatStoreError, TransientKind};
use crate::store::{SeatPrecondition, SeatStore};
use crate::Result;

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, HashMap<FlightId, i64>>,
    /// Scripted transient failures consumed, one per adjust call, before any
    /// adjustment is applied.
    faults: VecDeque<TransientKind>,
    adjust_calls: u64,
}

/// In-memory seat store.
///
/// The precondition check and the adjustment happen under one write lock,
/// giving the same atomicity as the database implementation. Transient
/// failures can be scripted with [`fail_times`](Self::fail_times) to exercise
/// caller retry policies.
#[derive(Clone, Default)]
pub struct InMemorySeatStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemorySeatStore {
    /// Creates a new empty in-memory seat store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the next `times` adjust calls to fail with the given
    /// transient kind before succeeding again.
    pub async fn fail_times(&self, kind: TransientKind, times: usize) {
        let mut inner = self.inner.write().await;
        for _ in 0..times {
            inner.faults.push_back(kind);
        }
    }

    /// Returns the total number of adjust calls made, including failed ones.
    pub async fn adjust_call_count(&self) -> u64 {
        self.inner.read().await.adjust_calls
    }
}

#[async_trait]
impl SeatStore for InMemorySeatStore {
    async fn adjust_seats(
        &self,
        table: &str,
        flight_id: &FlightId,
        delta: i64,
        precondition: Option<SeatPrecondition>,
    ) -> Result<i64> {
        let mut inner = self.inner.write().await;
        inner.adjust_calls += 1;
        metrics::counter!("seat_adjustments_total").increment(1);

        if let Some(kind) = inner.faults.pop_front() {
            return Err(SeatStoreError::Transient { kind });
        }

        let seats = inner
            .tables
            .get_mut(table)
            .and_then(|t| t.get_mut(flight_id))
            .ok_or_else(|| SeatStoreError::FlightNotFound {
                flight_id: flight_id.clone(),
            })?;

        match precondition {
            Some(SeatPrecondition::SeatsAvailable) if *seats <= 0 => {
                Err(SeatStoreError::ConditionalCheckFailed {
                    flight_id: flight_id.clone(),
                })
            }
            _ => {
                *seats += delta;
                Ok(*seats)
            }
        }
    }

    async fn seat_allocation(&self, table: &str, flight_id: &FlightId) -> Result<i64> {
        let inner = self.inner.read().await;
        inner
            .tables
            .get(table)
            .and_then(|t| t.get(flight_id))
            .copied()
            .ok_or_else(|| SeatStoreError::FlightNotFound {
                flight_id: flight_id.clone(),
            })
    }

    async fn put_flight(&self, table: &str, flight_id: &FlightId, seats: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(flight_id.clone(), seats);
        Ok(())
    }
}
