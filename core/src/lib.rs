pub mod api;
pub mod config;
pub mod error;
pub mod executor;
pub mod identity;
pub mod scope;
pub mod script;
pub mod topology;
pub mod transport;
