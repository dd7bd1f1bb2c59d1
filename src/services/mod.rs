//! Services layer - Business logic
//!
//! - `access_gate`: token issuance and authorization
//! - `lot`: lot registry queries and mutations
//!
//! Services hold repository handles and never touch a database pool
//! directly.

pub mod access_gate;
pub mod lot;

pub use access_gate::{AccessGate, AuthError, IssuedToken};
pub use lot::{LotMutationError, LotQueryError, LotService, RelocateError};
