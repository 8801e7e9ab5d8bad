//! Chat connections
//!
//! A [`ChatSocket`] per room and the [`RealtimeManager`] registry on top.

mod handlers;
mod manager;
mod socket;
mod state;

pub use handlers::{ChatHandlers, Handler};
pub use manager::RealtimeManager;
pub use socket::ChatSocket;
pub use state::ConnectionState;
