use crate::errors::ApiError;
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use std::future::{ready, Ready};

/// Header carrying the authenticated account id, set by the upstream auth layer
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The account a request is made on behalf of
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: i64,
}

impl CurrentUser {
    fn from_request_headers(req: &HttpRequest) -> Result<Self, ApiError> {
        let missing = || {
            ApiError::validation(
                "request",
                "missingUserContext",
                format!("Missing or invalid {} header", USER_ID_HEADER),
            )
        };

        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .ok_or_else(missing)?;

        Ok(Self { user_id })
    }
}

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_request_headers(req))
    }
}
