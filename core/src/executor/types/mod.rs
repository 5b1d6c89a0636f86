pub mod config;
pub mod event;
pub mod request;
pub mod result;

pub use config::*;
pub use event::*;
pub use request::*;
pub use result::*;
