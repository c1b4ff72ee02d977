//! JSON body extraction with `validator` rules applied.
//!
//! Bodies that cannot be parsed are a 400 with a single `error` message.
//! Bodies that parse but break a rule are a 422 that lists every failing
//! field, so clients can attach messages to form inputs:
//!
//! ```json
//! {
//!   "error": "Validation failed",
//!   "fields": { "email": ["Invalid email address"], "password": ["Password must be at least 8 characters"] }
//! }
//! ```

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;
use validator::{Validate, ValidationErrors};

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

/// Why a body was refused before reaching a handler.
#[derive(Debug)]
pub enum BodyRejection {
    /// The body is not the JSON the handler expects.
    Malformed(String),
    /// Failing rules, keyed by field name.
    Invalid(BTreeMap<String, Vec<String>>),
}

impl BodyRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            BodyRejection::Malformed(_) => StatusCode::BAD_REQUEST,
            BodyRejection::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn from_json(rejection: &JsonRejection) -> Self {
        if matches!(rejection, JsonRejection::MissingJsonContentType(_)) {
            return Self::Malformed("Missing 'Content-Type: application/json' header".to_string());
        }

        let detail = rejection.body_text();
        if let Some(field) = backticked_after(&detail, "missing field `") {
            return Self::Malformed(format!("{field} is required"));
        }
        if detail.contains("invalid type") {
            return Self::Malformed("Invalid field type in request".to_string());
        }
        Self::Malformed("Invalid request body".to_string())
    }

    fn from_validation(errors: &ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, failures)| {
                let messages = failures
                    .iter()
                    .map(|failure| match &failure.message {
                        Some(message) => message.to_string(),
                        None => format!("{field} is invalid"),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        Self::Invalid(fields)
    }
}

/// serde reports the offending name between backticks.
fn backticked_after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let rest = text.split_once(marker)?.1;
    rest.split('`').next().filter(|name| !name.is_empty())
}

#[derive(Serialize)]
struct RejectionBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a BTreeMap<String, Vec<String>>>,
}

impl IntoResponse for BodyRejection {
    fn into_response(self) -> Response {
        let body = match &self {
            BodyRejection::Malformed(message) => RejectionBody {
                error: message,
                fields: None,
            },
            BodyRejection::Invalid(fields) => RejectionBody {
                error: "Validation failed",
                fields: Some(fields),
            },
        };
        (self.status(), Json(body)).into_response()
    }
}

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = BodyRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| BodyRejection::from_json(&rejection))?;

        if let Err(errors) = value.validate() {
            let rejection = BodyRejection::from_validation(&errors);
            if let BodyRejection::Invalid(fields) = &rejection {
                debug!(fields = ?fields.keys().collect::<Vec<_>>(), "Request body failed validation");
            }
            return Err(rejection);
        }

        Ok(ValidatedJson(value))
    }
}
