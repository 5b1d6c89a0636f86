pub mod factory;
pub mod formatters;
pub mod identity;
pub mod topology;
pub mod transport;
