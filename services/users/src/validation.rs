//! Input validation for user payloads

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::models::{CreateUser, UpdateUser};

/// A rejected field and the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

type FieldResult = Result<(), ValidationError>;

/// Validate username
pub fn validate_username(username: &str) -> FieldResult {
    if username.is_empty() {
        return Err(ValidationError::new("username", "is required"));
    }

    if username.len() < 3 {
        return Err(ValidationError::new(
            "username",
            "must be at least 3 characters long",
        ));
    }

    if username.len() > 32 {
        return Err(ValidationError::new(
            "username",
            "must be at most 32 characters long",
        ));
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z0-9_.-]+$").expect("username regex is valid"));

    if !regex.is_match(username) {
        return Err(ValidationError::new(
            "username",
            "can only contain letters, numbers, dots, dashes and underscores",
        ));
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> FieldResult {
    if email.is_empty() {
        return Err(ValidationError::new("email", "is required"));
    }

    if email.len() > 254 {
        return Err(ValidationError::new(
            "email",
            "must be at most 254 characters long",
        ));
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email regex is valid")
    });

    if !regex.is_match(email) {
        return Err(ValidationError::new("email", "is not a valid address"));
    }

    Ok(())
}

/// Validate password
///
/// Length only: 8 to 128 bytes.
pub fn validate_password(password: &str) -> FieldResult {
    if password.is_empty() {
        return Err(ValidationError::new("password", "is required"));
    }

    if password.len() < 8 {
        return Err(ValidationError::new(
            "password",
            "must be at least 8 characters long",
        ));
    }

    if password.len() > 128 {
        return Err(ValidationError::new(
            "password",
            "must be at most 128 characters long",
        ));
    }

    Ok(())
}

fn validate_name(field: &'static str, value: &str) -> FieldResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }

    if value.chars().count() > 100 {
        return Err(ValidationError::new(
            field,
            "must be at most 100 characters long",
        ));
    }

    Ok(())
}

/// Validate a full creation payload, reporting the first bad field
pub fn validate_new_user(input: &CreateUser) -> FieldResult {
    validate_username(&input.username)?;
    validate_password(&input.password)?;
    validate_name("firstName", &input.first_name)?;
    validate_name("lastName", &input.last_name)?;
    validate_email(&input.email)
}

/// Validate only the fields present in a partial update
pub fn validate_update(input: &UpdateUser) -> FieldResult {
    if let Some(username) = &input.username {
        validate_username(username)?;
    }
    if let Some(password) = &input.password {
        validate_password(password)?;
    }
    if let Some(first_name) = &input.first_name {
        validate_name("firstName", first_name)?;
    }
    if let Some(last_name) = &input.last_name {
        validate_name("lastName", last_name)?;
    }
    if let Some(email) = &input.email {
        validate_email(email)?;
    }
    Ok(())
}
