// Library exports for Plaza
// This allows integration tests and external code to use Plaza modules

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod social;
pub mod state;
