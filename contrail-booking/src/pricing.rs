use contrail_core::booking::TicketOwner;
use contrail_core::flight::{Flight, SeatPool};
use contrail_core::money::fare;

/// Ticket pricing: the class multiplier always applies, the pool's child
/// multiplier only for passengers who are minors on the day of departure.
#[derive(Debug, Clone, Copy)]
pub struct FarePolicy {
    minor_age_limit: i32,
}

impl FarePolicy {
    pub fn new(minor_age_limit: i32) -> Self {
        Self { minor_age_limit }
    }

    pub fn is_minor(&self, owner: &TicketOwner, flight: &Flight) -> bool {
        owner.age_on(flight.scheduled_departure.date_naive()) < self.minor_age_limit
    }

    pub fn ticket_price(&self, flight: &Flight, pool: &SeatPool, owner: &TicketOwner) -> i64 {
        let child = self.is_minor(owner, flight).then_some(pool.child_multiplier);
        fare(flight.base_price, pool.class_multiplier, child)
    }
}

impl Default for FarePolicy {
    fn default() -> Self {
        Self::new(18)
    }
}
