//! Single `IvdError -> StatusCode` mapping, owned by the HTTP boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use ivd_domain::IvdError;

pub struct ApiError(pub IvdError);

impl From<IvdError> for ApiError {
    fn from(err: IvdError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            IvdError::NotFound(_) => StatusCode::NOT_FOUND,
            IvdError::Conflict(_) => StatusCode::CONFLICT,
            IvdError::InvalidInput(_) | IvdError::InvalidConfiguration(_) | IvdError::InvalidTransition(_) => {
                StatusCode::BAD_REQUEST
            }
            IvdError::Immutable(_) => StatusCode::CONFLICT,
            IvdError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            IvdError::Forbidden(_) => StatusCode::FORBIDDEN,
            IvdError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let resp = ApiError::from(IvdError::not_found("sample", "x")).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn immutable_maps_to_409() {
        let resp = ApiError::from(IvdError::Immutable("terminal".into())).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unauthorized_maps_to_401() {
        let resp = ApiError::from(IvdError::Unauthorized("bad token".into())).into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
