//! PostgreSQL-backed seat store implementation.

use async_trait::async_trait;
use common::FlightId;
use sqlx::PgPool;

use crate::error::SeatStoreError;
use crate::store::{SeatPrecondition, SeatStore};
use crate::Result;

/// PostgreSQL seat store.
///
/// The conditional adjustment is a single `UPDATE ... WHERE` statement, so
/// the precondition check and the write are atomic at the row level; racing
/// reservations for the same flight serialize on the row without any
/// application-side locking.
#[derive(Clone)]
pub struct PostgresSeatStore {
    pool: PgPool,
}

impl PostgresSeatStore {
    /// Creates a new PostgreSQL seat store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Validates a symbolic table reference before it is interpolated into
    /// SQL. Table names cannot be bound as parameters.
    fn checked_table(table: &str) -> Result<&str> {
        let valid = !table.is_empty()
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(table)
        } else {
            Err(SeatStoreError::InvalidTable(table.to_string()))
        }
    }
}

#[async_trait]
impl SeatStore for PostgresSeatStore {
    #[tracing::instrument(skip(self), fields(table = table, flight_id = %flight_id))]
    async fn adjust_seats(
        &self,
        table: &str,
        flight_id: &FlightId,
        delta: i64,
        precondition: Option<SeatPrecondition>,
    ) -> Result<i64> {
        let table = Self::checked_table(table)?;
        metrics::counter!("seat_adjustments_total").increment(1);

        let sql = match precondition {
            Some(SeatPrecondition::SeatsAvailable) => format!(
                "UPDATE {table} SET seat_allocation = seat_allocation + $2 \
                 WHERE flight_id = $1 AND seat_allocation > 0 \
                 RETURNING seat_allocation"
            ),
            None => format!(
                "UPDATE {table} SET seat_allocation = seat_allocation + $2 \
                 WHERE flight_id = $1 \
                 RETURNING seat_allocation"
            ),
        };

        let updated: Option<i64> = sqlx::query_scalar(&sql)
            .bind(flight_id.as_str())
            .bind(delta)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(seats) = updated {
            return Ok(seats);
        }

        // No row updated: either the flight is unknown or the precondition
        // failed. Look the row up to report which.
        let exists: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT seat_allocation FROM {table} WHERE flight_id = $1"
        ))
        .bind(flight_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match exists {
            Some(_) => Err(SeatStoreError::ConditionalCheckFailed {
                flight_id: flight_id.clone(),
            }),
            None => Err(SeatStoreError::FlightNotFound {
                flight_id: flight_id.clone(),
            }),
        }
    }

    async fn seat_allocation(&self, table: &str, flight_id: &FlightId) -> Result<i64> {
        let table = Self::checked_table(table)?;
        let seats: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT seat_allocation FROM {table} WHERE flight_id = $1"
        ))
        .bind(flight_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        seats.ok_or_else(|| SeatStoreError::FlightNotFound {
            flight_id: flight_id.clone(),
        })
    }

    async fn put_flight(&self, table: &str, flight_id: &FlightId, seats: i64) -> Result<()> {
        let table = Self::checked_table(table)?;
        sqlx::query(&format!(
            "INSERT INTO {table} (flight_id, seat_allocation) VALUES ($1, $2) \
             ON CONFLICT (flight_id) DO UPDATE SET seat_allocation = $2"
        ))
        .bind(flight_id.as_str())
        .bind(seats)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
