//! Redirect responses.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// `302 Found` pointing at `location`.
///
/// Form handlers answer a successful POST with this rather than axum's
/// `Redirect::to`, which sends 303.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_sets_status_and_location() {
        let response = found("/books");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/books");
    }
}
