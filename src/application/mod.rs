// Application layer: transfer validation, history projections, and the
// host service that persists the ledger between runs.

pub mod error;
pub mod history;
pub mod service;
pub mod transfer;

pub use error::*;
pub use history::*;
pub use service::*;
pub use transfer::*;
