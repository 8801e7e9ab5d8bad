//! Token refresh protocol

mod coordinator;

pub use coordinator::{LeaderGuard, RefreshCoordinator, RefreshOutcome, Ticket, Waiting};
