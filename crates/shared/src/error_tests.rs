use super::*;
use rstest::rstest;

#[rstest]
#[case(AppError::NotFound("test".into()), 404, "NOT_FOUND")]
#[case(AppError::Validation("test".into()), 400, "VALIDATION_ERROR")]
#[case(AppError::PolicyViolation("test".into()), 403, "POLICY_VIOLATION")]
#[case(AppError::PartialFailure("test".into()), 500, "PARTIAL_FAILURE")]
#[case(AppError::Storage("test".into()), 502, "STORAGE_ERROR")]
#[case(AppError::Internal("test".into()), 500, "INTERNAL_ERROR")]
fn test_app_error_mapping(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
    assert_eq!(err.status_code(), status);
    assert_eq!(err.error_code(), code);
}

#[test]
fn test_app_error_display() {
    assert_eq!(
        format!("{}", AppError::NotFound("msg".into())),
        "Not found: msg"
    );
    assert_eq!(
        format!("{}", AppError::Validation("msg".into())),
        "Validation error: msg"
    );
    assert_eq!(
        format!("{}", AppError::PolicyViolation("msg".into())),
        "Policy violation: msg"
    );
    assert_eq!(
        format!("{}", AppError::PartialFailure("msg".into())),
        "Partial failure: msg"
    );
    assert_eq!(
        format!("{}", AppError::Storage("msg".into())),
        "Storage error: msg"
    );
    assert_eq!(
        format!("{}", AppError::Internal("msg".into())),
        "Internal error: msg"
    );
}

#[test]
fn test_app_result_alias() {
    fn fails() -> AppResult<()> {
        Err(AppError::Validation("bad url".into()))
    }
    assert!(matches!(fails(), Err(AppError::Validation(_))));
}
