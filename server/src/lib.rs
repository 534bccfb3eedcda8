//! HTTP shell over the `vitae` engine.
//!
//! Routing and serialization only; every invariant lives in the engine.

pub mod error;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
