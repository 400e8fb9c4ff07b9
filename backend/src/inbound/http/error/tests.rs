//! Tests for HTTP error mapping.

use actix_web::ResponseError;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use rstest::{fixture, rstest};
use serde_json::json;

use super::*;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

async fn decode_response(
    error: &Error,
    expected_status: StatusCode,
    expected_trace_id: Option<&str>,
) -> Error {
    let response = ResponseError::error_response(error);
    assert_eq!(response.status(), expected_status);

    let header = response.headers().get(TRACE_ID_HEADER);
    match expected_trace_id {
        Some(expected) => {
            let trace_id = header
                .expect("trace-id header is set by error_response")
                .to_str()
                .expect("trace-id is valid UTF-8");
            assert_eq!(trace_id, expected);
        }
        None => assert!(header.is_none(), "trace-id header should not be present"),
    }

    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    serde_json::from_slice(&bytes).expect("error JSON deserialises")
}

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::conflict("full"), StatusCode::CONFLICT)]
#[case(Error::unprocessable("too young"), StatusCode::UNPROCESSABLE_ENTITY)]
#[case(Error::service_unavailable("retry"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), status);
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted(expected_trace_id: String) {
    let error = Error::internal("capacity invariant violated for contest 42")
        .with_trace_id(expected_trace_id.clone())
        .with_details(json!({ "secret": "x" }));

    let body = decode_response(
        &error,
        StatusCode::INTERNAL_SERVER_ERROR,
        Some(expected_trace_id.as_str()),
    )
    .await;

    assert_eq!(body.message(), "Internal server error");
    assert!(body.details().is_none());
    assert_eq!(body.trace_id(), Some(TRACE_ID));
}

#[rstest]
#[actix_web::test]
async fn domain_rule_errors_keep_their_reason(expected_trace_id: String) {
    let error = Error::conflict("contest has no remaining slots")
        .with_trace_id(expected_trace_id.clone())
        .with_reason("no_slots");

    let body = decode_response(
        &error,
        StatusCode::CONFLICT,
        Some(expected_trace_id.as_str()),
    )
    .await;

    assert_eq!(body.reason(), Some("no_slots"));
    assert_eq!(body.message(), "contest has no remaining slots");
}

#[rstest]
#[actix_web::test]
async fn errors_without_trace_id_omit_the_header() {
    let error = Error::invalid_request("bad uuid");
    let body = decode_response(&error, StatusCode::BAD_REQUEST, None).await;
    assert_eq!(body.code(), ErrorCode::InvalidRequest);
}

#[rstest]
fn actix_errors_become_internal() {
    let actix = actix_web::error::ErrorBadRequest("raw");
    let error = Error::from(actix);
    assert_eq!(error.code(), ErrorCode::InternalError);
}
