//! Request extractors that report malformed or invalid bodies in the shared error format.

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::{HeaderMap, header::IF_MATCH},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{AppError, FieldError};

/// JSON body that was deserialized and passed its `validator` rules.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Undecodable bodies are validation failures (400), not axum's default 422.
fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            AppError::Validation(vec![FieldError::new("body", err.body_text())])
        }
        JsonRejection::JsonSyntaxError(err) => {
            AppError::Validation(vec![FieldError::new("body", err.body_text())])
        }
        JsonRejection::MissingJsonContentType(err) => {
            AppError::Validation(vec![FieldError::new("content-type", err.body_text())])
        }
        other => AppError::BadRequest(other.body_text()),
    }
}

/// Parse a body that may be empty, falling back to `T::default()`.
pub fn optional_json<T>(body: &Bytes) -> Result<T, AppError>
where
    T: DeserializeOwned + Validate + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: T = serde_json::from_slice(body)
        .map_err(|err| AppError::Validation(vec![FieldError::new("body", err.to_string())]))?;
    value.validate()?;
    Ok(value)
}

/// Version token from an `If-Match` header (`3`, `"3"` or `W/"3"`).
pub fn if_match(headers: &HeaderMap) -> Result<Option<u64>, AppError> {
    let Some(value) = headers.get(IF_MATCH) else {
        return Ok(None);
    };
    let invalid = || {
        AppError::Validation(vec![FieldError::new(
            "If-Match",
            "must be a tournament version number",
        )])
    };
    let text = value.to_str().map_err(|_| invalid())?.trim();
    let text = text.strip_prefix("W/").unwrap_or(text).trim_matches('"');
    text.parse().map(Some).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::dto::bracket::PreviewRequest;

    #[test]
    fn if_match_accepts_quoted_and_weak_tags() {
        let mut headers = HeaderMap::new();
        assert_eq!(if_match(&headers).unwrap(), None);
        for raw in ["3", "\"3\"", "W/\"3\""] {
            headers.insert(IF_MATCH, HeaderValue::from_static(raw));
            assert_eq!(if_match(&headers).unwrap(), Some(3), "{raw}");
        }
        headers.insert(IF_MATCH, HeaderValue::from_static("*"));
        assert!(if_match(&headers).is_err());
    }

    #[test]
    fn empty_body_uses_default() {
        let request: PreviewRequest = optional_json(&Bytes::new()).unwrap();
        assert!(request.seed_order.is_none());
        let request: PreviewRequest = optional_json(&Bytes::from_static(b"{\"seedOrder\":[2,1]}")).unwrap();
        assert_eq!(request.seed_order, Some(vec![2, 1]));
        assert!(optional_json::<PreviewRequest>(&Bytes::from_static(b"{\"seedOrder\":\"x\"}")).is_err());
    }
}
