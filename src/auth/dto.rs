use lazy_static::lazy_static;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::repo::User;
use crate::validate::{
    string_field, validate_object, Check, FieldKind, FieldRule, ValidationErrors, EMAIL_RE,
    USERNAME_RE,
};

fn has_letter(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_alphabetic())
}

fn has_digit(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
}

lazy_static! {
    static ref REGISTER_RULES: Vec<FieldRule> = vec![
        FieldRule {
            name: "username",
            kind: FieldKind::Str,
            required: true,
            nullable: false,
            checks: vec![
                Check::Length {
                    min: 3,
                    max: 64,
                    message: "Username must be between 3 and 64 characters",
                },
                Check::Pattern {
                    re: &USERNAME_RE,
                    message: "Username can only contain letters, numbers, and underscores",
                },
            ],
        },
        FieldRule {
            name: "email",
            kind: FieldKind::Str,
            required: true,
            nullable: false,
            checks: vec![
                Check::Pattern {
                    re: &EMAIL_RE,
                    message: "Not a valid email address.",
                },
                Check::Length {
                    min: 0,
                    max: 120,
                    message: "Email must be less than 120 characters",
                },
            ],
        },
        FieldRule {
            name: "password",
            kind: FieldKind::Str,
            required: true,
            nullable: false,
            checks: vec![
                Check::Length {
                    min: 6,
                    max: 128,
                    message: "Password must be between 6 and 128 characters",
                },
                Check::Predicate {
                    test: has_letter,
                    message: "Password must contain at least one letter",
                },
                Check::Predicate {
                    test: has_digit,
                    message: "Password must contain at least one number",
                },
            ],
        },
    ];
    static ref LOGIN_RULES: Vec<FieldRule> = vec![
        FieldRule {
            name: "username_or_email",
            kind: FieldKind::Str,
            required: true,
            nullable: false,
            checks: vec![Check::Length {
                min: 1,
                max: 120,
                message: "Username or email is required",
            }],
        },
        FieldRule {
            name: "password",
            kind: FieldKind::Str,
            required: true,
            nullable: false,
            checks: vec![Check::Length {
                min: 1,
                max: usize::MAX,
                message: "Password is required",
            }],
        },
    ];
}

#[derive(Debug)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn from_json(body: &Map<String, Value>) -> Result<Self, ValidationErrors> {
        validate_object(&REGISTER_RULES, body)?;
        Ok(Self {
            username: string_field(body, "username"),
            email: string_field(body, "email"),
            password: string_field(body, "password"),
        })
    }
}

#[derive(Debug)]
pub struct LoginInput {
    pub username_or_email: String,
    pub password: String,
}

impl LoginInput {
    pub fn from_json(body: &Map<String, Value>) -> Result<Self, ValidationErrors> {
        validate_object(&LOGIN_RULES, body)?;
        Ok(Self {
            username_or_email: string_field(body, "username_or_email"),
            password: string_field(body, "password"),
        })
    }
}

/// Response for register and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: User,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn valid_registration_passes() {
        let input = RegisterInput::from_json(&as_map(json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "pass123"
        })))
        .expect("valid registration");
        assert_eq!(input.username, "alice");
        assert_eq!(input.email, "alice@x.com");
    }

    #[test]
    fn password_abc_fails_length_and_digit() {
        let err = RegisterInput::from_json(&as_map(json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "abc"
        })))
        .unwrap_err();
        let messages = &err.0["password"];
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().any(|m| m.contains("between 6 and 128")));
        assert!(messages.iter().any(|m| m.contains("at least one number")));
    }

    #[test]
    fn password_abcdef_fails_digit_only() {
        let err = RegisterInput::from_json(&as_map(json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "abcdef"
        })))
        .unwrap_err();
        assert_eq!(
            err.0["password"],
            vec!["Password must contain at least one number"]
        );
    }

    #[test]
    fn password_abc123_is_accepted() {
        assert!(RegisterInput::from_json(&as_map(json!({
            "username": "alice",
            "email": "alice@x.com",
            "password": "abc123"
        })))
        .is_ok());
    }

    #[test]
    fn username_with_spaces_is_rejected() {
        let err = RegisterInput::from_json(&as_map(json!({
            "username": "al ice",
            "email": "alice@x.com",
            "password": "pass123"
        })))
        .unwrap_err();
        assert_eq!(
            err.0["username"],
            vec!["Username can only contain letters, numbers, and underscores"]
        );
    }

    #[test]
    fn bad_email_and_missing_password_are_both_reported() {
        let err = RegisterInput::from_json(&as_map(json!({
            "username": "alice",
            "email": "not-an-email"
        })))
        .unwrap_err();
        assert_eq!(err.0["email"], vec!["Not a valid email address."]);
        assert_eq!(err.0["password"], vec!["Missing data for required field."]);
    }

    #[test]
    fn login_requires_both_fields() {
        let err = LoginInput::from_json(&as_map(json!({ "password": "" }))).unwrap_err();
        assert!(err.0.contains_key("username_or_email"));
        assert_eq!(err.0["password"], vec!["Password is required"]);
    }
}
