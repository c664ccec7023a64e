mod response;

pub mod serde;

pub mod error;
pub use error::{ApiError, ApiErrorKind, Detail};

pub mod traits;
pub use traits::Validator;

pub mod users;
pub mod auth;
pub mod tasks;

mod payload;
pub use payload::Payload;
