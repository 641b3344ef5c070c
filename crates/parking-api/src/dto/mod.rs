//! Data Transfer Objects for API requests and responses

pub mod common;
pub mod payment;
pub mod rate_config;
pub mod session;
pub mod space;

pub use common::*;
pub use payment::*;
pub use rate_config::*;
pub use session::*;
pub use space::*;
