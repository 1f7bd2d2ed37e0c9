/// Input validation rules
///
/// Service inputs derive [`validator::Validate`]; the rules the derive can't
/// express (username charset, password strength, enumerated task fields,
/// due dates) are the custom functions in this module.
///
/// [`check`] runs a struct's rules and converts every violation into a
/// [`FieldError`] named after the request key (see [`WireNames`]), sorted
/// by field name so responses are stable.

use crate::auth::password::validate_password_strength;
use crate::error::{FieldError, ServiceError, ServiceResult};
use crate::models::task::{TaskPriority, TaskStatus};
use chrono::{DateTime, NaiveDate, Utc};
use std::borrow::Cow;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

/// Minimum username length
pub const MIN_USERNAME_LENGTH: usize = 3;

fn rule_error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Usernames: at least 3 characters from `[A-Za-z0-9_]`
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.chars().count() < MIN_USERNAME_LENGTH {
        return Err(rule_error(
            "username_length",
            format!("Username must be at least {} characters", MIN_USERNAME_LENGTH),
        ));
    }

    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(rule_error(
            "username_charset",
            "Username may only contain letters, digits and underscores",
        ));
    }

    Ok(())
}

/// Email addresses: `validator`'s syntax rule plus a dotted domain with an
/// alphabetic top-level label (`a@b` is rejected)
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let invalid = || rule_error("email", "Valid email is required");

    if !email.validate_email() {
        return Err(invalid());
    }

    let domain = email.rsplit_once('@').map(|(_, domain)| domain).unwrap_or_default();
    let mut labels = domain.split('.');
    let tld = labels.next_back().unwrap_or_default();
    let has_parent = labels.clone().next().is_some();

    if !has_parent
        || labels.any(str::is_empty)
        || tld.len() < 2
        || !tld.chars().all(|c| c.is_ascii_alphabetic())
    {
        return Err(invalid());
    }

    Ok(())
}

/// Password strength rule as a validator function
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    validate_password_strength(password).map_err(|message| rule_error("password_strength", message))
}

pub fn validate_priority(priority: &str) -> Result<(), ValidationError> {
    priority
        .parse::<TaskPriority>()
        .map(|_| ())
        .map_err(|_| rule_error("priority", "Priority must be one of: alta, media, baja"))
}

pub fn validate_status(status: &str) -> Result<(), ValidationError> {
    status.parse::<TaskStatus>().map(|_| ()).map_err(|_| {
        rule_error(
            "status",
            "Status must be one of: pendiente, en_progreso, completada, cancelada",
        )
    })
}

pub fn validate_due_date(due_date: &str) -> Result<(), ValidationError> {
    parse_due_date(due_date)
        .map(|_| ())
        .ok_or_else(|| rule_error("due_date", "Due date must be a valid ISO 8601 date"))
}

/// Parses an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC)
pub fn parse_due_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value) {
        return Some(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Request keys for fields whose Rust name differs
///
/// `validator` reports errors under the Rust field name; [`check`] renames
/// them with this table.
pub trait WireNames {
    /// `(rust_name, request_key)` pairs
    const WIRE_NAMES: &'static [(&'static str, &'static str)] = &[];
}

/// Flattens `validator` output into field errors, renaming fields via `names`
pub fn field_errors(
    errors: &ValidationErrors,
    names: &[(&'static str, &'static str)],
) -> Vec<FieldError> {
    let mut details: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            let field: &str = &field[..];
            let key = names
                .iter()
                .find(|(rust, _)| *rust == field)
                .map_or(field, |(_, wire)| *wire)
                .to_string();

            errors.iter().map(move |error| {
                FieldError::new(
                    key.clone(),
                    error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                )
            })
        })
        .collect();

    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

/// Validates `input`, mapping failures to [`ServiceError::Validation`]
pub fn check<T: Validate + WireNames>(input: &T) -> ServiceResult<()> {
    input
        .validate()
        .map_err(|errors| ServiceError::Validation(field_errors(&errors, T::WIRE_NAMES)))
}

/// Parses a path segment as a task id
pub fn parse_task_id(raw: &str) -> ServiceResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| ServiceError::invalid("id", "Task id must be an integer"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_username_rules() {
        assert!(validate_username("abc").is_ok());
        assert!(validate_username("user_01").is_ok());

        assert_eq!(validate_username("ab").unwrap_err().code, "username_length");
        assert_eq!(validate_username("a b").unwrap_err().code, "username_charset");
        assert_eq!(validate_username("ana.p").unwrap_err().code, "username_charset");
        assert_eq!(validate_username("añob").unwrap_err().code, "username_charset");
    }

    #[test]
    fn test_enumerated_fields() {
        assert!(validate_priority("media").is_ok());
        assert!(validate_priority("urgent").is_err());
        assert!(validate_status("completada").is_ok());
        assert!(validate_status("done").is_err());
    }

    #[test]
    fn test_parse_due_date_formats() {
        let ts = parse_due_date("2025-03-01T10:30:00Z").unwrap();
        assert_eq!(ts.hour(), 10);

        let offset = parse_due_date("2025-03-01T10:30:00-03:00").unwrap();
        assert_eq!(offset.hour(), 13);

        let date = parse_due_date("2025-03-01").unwrap();
        assert_eq!((date.year(), date.month(), date.day(), date.hour()), (2025, 3, 1, 0));

        assert!(parse_due_date("next tuesday").is_none());
        assert!(parse_due_date("2025-13-01").is_none());
    }

    #[test]
    fn test_email_requires_dotted_domain() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("ana.p+x@mail.example.org").is_ok());

        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a@b.c").is_err());
        assert!(validate_email("a@b.123").is_err());
        assert!(validate_email("a@.com").is_err());
        assert!(validate_email("not-an-email").is_err());
    }

    #[derive(Validate)]
    struct Renamed {
        #[validate(length(min = 1, message = "Title is required"))]
        title: String,

        #[validate(length(min = 1, message = "Note is required"))]
        note: String,
    }

    impl WireNames for Renamed {
        const WIRE_NAMES: &'static [(&'static str, &'static str)] = &[("title", "titulo")];
    }

    #[test]
    fn test_check_reports_request_keys() {
        let input = Renamed {
            title: String::new(),
            note: String::new(),
        };

        let Err(ServiceError::Validation(errors)) = check(&input) else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["note", "titulo"]);
    }

    #[test]
    fn test_parse_task_id() {
        assert_eq!(parse_task_id("42").unwrap(), 42);
        assert!(matches!(parse_task_id("abc"), Err(ServiceError::Validation(_))));
    }
}
