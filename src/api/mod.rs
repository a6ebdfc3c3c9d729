// API module
//
// Thin HTTP wrapper around the ledger and the consensus engine

pub mod handlers;
pub mod routes;

// Re-export main components for easier access
pub use routes::configure_routes;
