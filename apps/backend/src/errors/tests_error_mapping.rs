// Unit tests for error mapping - pure domain logic without store dependencies
use crate::error::AppError;
use crate::errors::domain::{DomainError, InfraErrorKind, NotFoundKind, ValidationKind};
use crate::errors::ErrorCode;

#[test]
fn validation_kinds_map_to_codes() {
    let cases = [
        (ValidationKind::PhaseMismatch, ErrorCode::PhaseMismatch),
        (ValidationKind::OutOfTurn, ErrorCode::OutOfTurn),
        (ValidationKind::InsufficientRole, ErrorCode::InsufficientRole),
        (ValidationKind::InvalidBid, ErrorCode::InvalidBid),
        (ValidationKind::InvalidTransfer, ErrorCode::InvalidTransfer),
        (ValidationKind::InvalidTheme, ErrorCode::InvalidTheme),
        (ValidationKind::InvalidSlot, ErrorCode::InvalidSlot),
        (ValidationKind::InvalidPayload, ErrorCode::InvalidPayload),
    ];
    for (kind, code) in cases {
        let app: AppError = DomainError::validation(kind, "x").into();
        assert_eq!(app.code(), code);
        assert!(app.is_client_error());
    }
}

#[test]
fn validation_other_falls_back_to_generic_code() {
    let app: AppError =
        DomainError::validation(ValidationKind::Other("weird".into()), "bad field").into();
    assert_eq!(app.code(), ErrorCode::ValidationError);
}

#[test]
fn not_found_kinds_map_to_codes() {
    let cases = [
        (NotFoundKind::Game, ErrorCode::GameNotFound),
        (NotFoundKind::Player, ErrorCode::PlayerNotFound),
        (NotFoundKind::Question, ErrorCode::QuestionNotFound),
        (NotFoundKind::Round, ErrorCode::RoundNotFound),
    ];
    for (kind, code) in cases {
        let app: AppError = DomainError::not_found(kind, "x").into();
        assert_eq!(app.code(), code);
        assert!(app.is_client_error());
    }
}

#[test]
fn invariant_violations_are_server_errors() {
    let app: AppError = DomainError::invariant("unreachable branch").into();
    assert_eq!(app.code(), ErrorCode::Internal);
    assert!(!app.is_client_error());
    // Server error detail must not leak into the response body.
    assert_eq!(app.to_body().detail, "internal error");
}

#[test]
fn infra_kinds_map_to_codes() {
    let app: AppError = DomainError::infra(InfraErrorKind::DataCorruption, "bad game hash").into();
    assert_eq!(app.code(), ErrorCode::DataCorruption);
    assert!(!app.is_client_error());
}

#[test]
fn client_error_body_keeps_detail() {
    let app = AppError::validation(ErrorCode::InvalidBid, "bid below question price");
    let body = app.to_body();
    assert_eq!(body.code, "INVALID_BID");
    assert_eq!(body.detail, "bid below question price");
}
