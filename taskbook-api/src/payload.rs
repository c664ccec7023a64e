use http::StatusCode;
use axum_core::response::{Response, IntoResponse};
use serde::{Serialize, Deserialize};

use crate::response::{serialize_json, error_json};

#[derive(Debug, Serialize, Deserialize)]
pub struct Payload<T> {
    payload: T
}

impl<T> Payload<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload
        }
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

impl<T> std::fmt::Display for Payload<T>
where
    T: std::fmt::Display
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        if f.alternate() {
            write!(f, "{:#}", self.payload)
        } else {
            write!(f, "{}", self.payload)
        }
    }
}

impl<T> IntoResponse for Payload<T>
where
    T: Serialize
{
    fn into_response(self) -> Response {
        match serialize_json(StatusCode::OK, &self) {
            Ok(res) => res,
            Err(err) => {
                tracing::error!("Payload<T> serialization error {:?}", err);
                error_json()
            }
        }
    }
}
