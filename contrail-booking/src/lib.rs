pub mod cancellation;
pub mod engine;
pub mod orchestrator;
pub mod payment;
pub mod pricing;
pub mod provisioner;
pub mod reassignment;
pub mod seat_map;
pub mod transaction;

pub use cancellation::CancellationReversor;
pub use engine::{BookingEngine, EngineSettings};
pub use orchestrator::BookingOrchestrator;
pub use payment::{MockPaymentAdapter, PaymentOrchestrator};
pub use pricing::FarePolicy;
pub use provisioner::FlightProvisioner;
pub use reassignment::SeatReassignment;
pub use seat_map::{SeatCode, SeatMap};
pub use transaction::{run_in_transaction, TransactionScope};
