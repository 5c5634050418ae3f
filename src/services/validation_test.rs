use super::*;

// =============================================================================
// normalize_email
// =============================================================================

#[test]
fn normalize_email_trims_and_lowercases() {
    assert_eq!(normalize_email("  Ada@Example.COM ").as_deref(), Some("ada@example.com"));
}

#[test]
fn normalize_email_rejects_malformed() {
    for bad in ["", "ada", "@example.com", "ada@", "a@b@c", "ada lovelace@example.com"] {
        assert_eq!(normalize_email(bad), None, "{bad:?}");
    }
}

// =============================================================================
// LoginForm
// =============================================================================

#[test]
fn login_form_from_camel_case_json() {
    let form: LoginForm =
        serde_json::from_str(r#"{"email":"ada@example.com","password":"pw","redirectTo":"/courses"}"#).unwrap();
    assert_eq!(form.redirect_to.as_deref(), Some("/courses"));
    let creds = form.validate().unwrap();
    assert_eq!(creds.email, "ada@example.com");
    assert_eq!(creds.password, "pw");
}

#[test]
fn login_form_requires_password() {
    let form: LoginForm = serde_json::from_str(r#"{"email":"ada@example.com"}"#).unwrap();
    assert_eq!(form.validate(), Err(ValidationError::PasswordRequired));
}

#[test]
fn login_form_checks_email_first() {
    let form: LoginForm = serde_json::from_str(r#"{"email":"nope","password":""}"#).unwrap();
    assert_eq!(form.validate(), Err(ValidationError::InvalidEmail));
}

// =============================================================================
// SignupForm
// =============================================================================

#[test]
fn signup_form_enforces_password_length() {
    let short = SignupForm { email: "a@b.co".into(), password: "short".into(), full_name: None };
    assert_eq!(short.validate(), Err(ValidationError::PasswordTooShort));
    let long = SignupForm { email: "a@b.co".into(), password: "x".repeat(MAX_PASSWORD_LEN + 1), full_name: None };
    assert_eq!(long.validate(), Err(ValidationError::PasswordTooLong));
}

#[test]
fn password_minimum_counts_characters_not_bytes() {
    let short = SignupForm { email: "a@b.co".into(), password: "éééé".into(), full_name: None };
    assert_eq!(short.validate(), Err(ValidationError::PasswordTooShort));
    let ok = SignupForm { email: "a@b.co".into(), password: "éééééééé".into(), full_name: None };
    assert!(ok.validate().is_ok());
}

#[test]
fn password_maximum_counts_bytes() {
    // 37 two-byte chars: 37 characters, 74 bytes.
    let form = ResetPasswordForm { password: "é".repeat(37), confirm_password: "é".repeat(37) };
    assert_eq!(form.validate(), Err(ValidationError::PasswordTooLong));
}

#[test]
fn signup_form_trims_and_drops_blank_name() {
    let form = SignupForm { email: "a@b.co".into(), password: "longenough".into(), full_name: Some("   ".into()) };
    let (_, name) = form.validate().unwrap();
    assert_eq!(name, None);

    let form = SignupForm {
        email: "a@b.co".into(),
        password: "longenough".into(),
        full_name: Some(" Ada Lovelace ".into()),
    };
    let (_, name) = form.validate().unwrap();
    assert_eq!(name.as_deref(), Some("Ada Lovelace"));
}

#[test]
fn signup_form_rejects_long_name() {
    let form = SignupForm {
        email: "a@b.co".into(),
        password: "longenough".into(),
        full_name: Some("n".repeat(MAX_FULL_NAME_LEN + 1)),
    };
    assert_eq!(form.validate(), Err(ValidationError::FullNameTooLong));
}

// =============================================================================
// ResetPasswordForm
// =============================================================================

#[test]
fn reset_form_requires_matching_confirmation() {
    let form: ResetPasswordForm =
        serde_json::from_str(r#"{"password":"newpassword1","confirmPassword":"newpassword2"}"#).unwrap();
    assert_eq!(form.validate(), Err(ValidationError::PasswordMismatch));
}

#[test]
fn reset_form_accepts_match() {
    let form = ResetPasswordForm { password: "newpassword1".into(), confirm_password: "newpassword1".into() };
    assert_eq!(form.validate(), Ok("newpassword1"));
}

#[test]
fn validation_messages_are_user_facing() {
    assert_eq!(ValidationError::PasswordTooShort.to_string(), "Password must be at least 8 characters");
    assert_eq!(ValidationError::InvalidEmail.to_string(), "Please enter a valid email address");
}
