//! Input validation for the auth forms.

use serde::Deserialize;

/// Counted in characters.
pub const MIN_PASSWORD_LEN: usize = 8;
/// Counted in UTF-8 bytes; bcrypt ignores everything past 72 bytes.
pub const MAX_PASSWORD_LEN: usize = 72;
pub const MAX_FULL_NAME_LEN: usize = 100;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a valid email address")]
    InvalidEmail,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least {} characters", MIN_PASSWORD_LEN)]
    PasswordTooShort,
    #[error("Password must be at most {} bytes", MAX_PASSWORD_LEN)]
    PasswordTooLong,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Full name must be less than {} characters", MAX_FULL_NAME_LEN)]
    FullNameTooLong,
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || normalized.contains(char::is_whitespace) {
        return None;
    }
    Some(normalized)
}

fn new_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::PasswordRequired);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooLong);
    }
    Ok(())
}

// =============================================================================
// FORMS
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub redirect_to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordForm {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Validated credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    /// # Errors
    ///
    /// Returns the first failing rule.
    pub fn validate(&self) -> Result<Credentials, ValidationError> {
        let email = normalize_email(&self.email).ok_or(ValidationError::InvalidEmail)?;
        if self.password.is_empty() {
            return Err(ValidationError::PasswordRequired);
        }
        Ok(Credentials { email, password: self.password.clone() })
    }
}

impl SignupForm {
    /// Returns credentials plus the trimmed full name (empty names dropped).
    ///
    /// # Errors
    ///
    /// Returns the first failing rule.
    pub fn validate(&self) -> Result<(Credentials, Option<String>), ValidationError> {
        let email = normalize_email(&self.email).ok_or(ValidationError::InvalidEmail)?;
        new_password(&self.password)?;
        let full_name = self
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned);
        if full_name.as_ref().is_some_and(|name| name.chars().count() > MAX_FULL_NAME_LEN) {
            return Err(ValidationError::FullNameTooLong);
        }
        Ok((Credentials { email, password: self.password.clone() }, full_name))
    }
}

impl ForgotPasswordForm {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidEmail`] for a malformed address.
    pub fn validate(&self) -> Result<String, ValidationError> {
        normalize_email(&self.email).ok_or(ValidationError::InvalidEmail)
    }
}

impl ResetPasswordForm {
    /// # Errors
    ///
    /// Returns the first failing rule.
    pub fn validate(&self) -> Result<&str, ValidationError> {
        new_password(&self.password)?;
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(&self.password)
    }
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
