//! Data Transfer Objects for REST request/response serialization.
//!
//! Money amounts are integer cents; display strings are provided
//! alongside where the configurator shows them.

pub mod common_dto;
pub mod inquiry_dto;
pub mod pricing_dto;
pub mod session_dto;
pub mod sync_dto;

pub use common_dto::*;
pub use inquiry_dto::*;
pub use pricing_dto::*;
pub use session_dto::*;
pub use sync_dto::*;
