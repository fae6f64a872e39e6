use contrail_core::error::{BookingError, BookingResult};
use contrail_core::flight::{Flight, FlightSpec, SeatClass, SeatClassSpec, SeatPool, MAX_SEAT_COLUMNS};
use contrail_core::money::Multiplier;
use tracing::info;
use uuid::Uuid;

use crate::transaction::TransactionScope;

/// Creates a flight together with its three seat pools in one transaction.
pub struct FlightProvisioner {
    scope: TransactionScope,
    default_child_multiplier: Multiplier,
}

impl FlightProvisioner {
    pub fn new(scope: TransactionScope, default_child_multiplier: Multiplier) -> Self {
        Self {
            scope,
            default_child_multiplier,
        }
    }

    pub async fn create_flight_with_seats(
        &self,
        spec: FlightSpec,
        economy: SeatClassSpec,
        business: SeatClassSpec,
        first: SeatClassSpec,
    ) -> BookingResult<Flight> {
        spec.validate()?;
        let flight = spec.into_flight();

        let pools = vec![
            self.seat_pool(flight.id, SeatClass::Economy, &economy)?,
            self.seat_pool(flight.id, SeatClass::Business, &business)?,
            self.seat_pool(flight.id, SeatClass::First, &first)?,
        ];

        // Seat rows are numbered across all cabins, so the sum must fit too.
        pools
            .iter()
            .try_fold(0i32, |rows, pool| rows.checked_add(pool.max_row))
            .ok_or_else(|| BookingError::InvalidRequest("too many seat rows on one aircraft".into()))?;

        let created = self
            .scope
            .run(move |uow| {
                Box::pin(async move {
                    uow.insert_flight(&flight).await?;
                    for pool in &pools {
                        uow.insert_seat_pool(pool).await?;
                    }
                    Ok(flight)
                })
            })
            .await?;

        info!(
            "Provisioned flight {} ({}) {} -> {}",
            created.flight_number, created.id, created.departure_airport, created.arrival_airport
        );
        Ok(created)
    }

    fn seat_pool(&self, flight_id: Uuid, class: SeatClass, spec: &SeatClassSpec) -> BookingResult<SeatPool> {
        if spec.max_row < 0 || spec.max_col < 0 {
            return Err(BookingError::InvalidRequest(format!(
                "{} cabin dimensions cannot be negative",
                class
            )));
        }
        if spec.max_col > MAX_SEAT_COLUMNS {
            return Err(BookingError::InvalidRequest(format!(
                "{} cabin has {} columns, at most {} are addressable",
                class, spec.max_col, MAX_SEAT_COLUMNS
            )));
        }
        if spec.max_row.checked_mul(spec.max_col).is_none() {
            return Err(BookingError::InvalidRequest(format!(
                "{} cabin of {} x {} seats is too large",
                class, spec.max_row, spec.max_col
            )));
        }

        let child_multiplier = match spec.child_multiplier {
            Some(value) => Multiplier::from_f64(value)?,
            None => self.default_child_multiplier,
        };

        Ok(SeatPool {
            flight_id,
            class,
            class_multiplier: Multiplier::from_f64(spec.multiplier)?,
            child_multiplier,
            max_row: spec.max_row,
            max_col: spec.max_col,
            occupied: 0,
        })
    }
}
