//! Infrastructure layer - external service implementations

pub mod embedding;
pub mod index;
pub mod logging;
pub mod services;
pub mod store;
