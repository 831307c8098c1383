use reqwest::StatusCode;

use super::ApiError;

#[test]
fn it_reads_text_detail() {
    let err = ApiError::from_body(
        StatusCode::UNAUTHORIZED,
        r#"{"detail": "Incorrect email or password"}"#,
    );

    assert_eq!(err.status(), Some(401));
    assert!(err.is_unauthorized());
    assert_eq!(err.detail_or("Login failed"), "Incorrect email or password");
    assert_eq!(err.to_string(), "Incorrect email or password (HTTP 401)");
}

#[test]
fn it_joins_validation_details() {
    let err = ApiError::from_body(
        StatusCode::UNPROCESSABLE_ENTITY,
        r#"{"detail": [{"loc": ["body", "email"], "msg": "value is not a valid email address", "type": "value_error"}, {"loc": ["body", "password"], "msg": "field required", "type": "missing"}]}"#,
    );

    assert_eq!(
        err.detail_or(""),
        "value is not a valid email address; field required"
    );
    assert!(!err.is_unauthorized());
}

#[test]
fn it_keeps_plain_bodies() {
    let err = ApiError::from_body(StatusCode::BAD_GATEWAY, "upstream exploded\n");
    assert_eq!(err.detail_or(""), "upstream exploded");
}

#[test]
fn it_falls_back_to_reason_for_empty_bodies() {
    let err = ApiError::from_body(StatusCode::NOT_FOUND, "");
    assert_eq!(err.detail_or(""), "Not Found");
}

#[test]
fn it_treats_refresh_failures_as_unauthorized() {
    let inner = ApiError::from_body(StatusCode::UNAUTHORIZED, r#"{"detail": "Invalid refresh token"}"#);
    let err = ApiError::RefreshFailed(Box::new(inner));

    assert!(err.is_unauthorized());
    assert_eq!(err.status(), None);
    assert_eq!(err.detail_or("Session expired"), "Invalid refresh token");
}
