use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::users::{
    dto::{UserBody, UserInput},
    repo_types::NewUser,
};

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 100;
pub const PHONE_MIN: usize = 10;
pub const PHONE_MAX: usize = 15;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A user field as received, before its contents are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
    Missing,
    Text(&'a str),
    /// Present but not a string; carries the JSON type that was sent.
    Mistyped(&'static str),
}

/// Anything carrying the three user fields.
pub trait UserFields {
    fn name(&self) -> Field<'_>;
    fn email(&self) -> Field<'_>;
    fn phone(&self) -> Field<'_>;
}

fn text_field(value: &Option<String>) -> Field<'_> {
    value.as_deref().map_or(Field::Missing, Field::Text)
}

fn json_field(value: &Option<Value>) -> Field<'_> {
    match value {
        None => Field::Missing,
        Some(Value::String(s)) => Field::Text(s),
        Some(Value::Null) => Field::Mistyped("null"),
        Some(Value::Bool(_)) => Field::Mistyped("boolean"),
        Some(Value::Number(_)) => Field::Mistyped("number"),
        Some(Value::Array(_)) => Field::Mistyped("array"),
        Some(Value::Object(_)) => Field::Mistyped("object"),
    }
}

impl UserFields for UserInput {
    fn name(&self) -> Field<'_> {
        text_field(&self.name)
    }
    fn email(&self) -> Field<'_> {
        text_field(&self.email)
    }
    fn phone(&self) -> Field<'_> {
        text_field(&self.phone)
    }
}

impl UserFields for UserBody {
    fn name(&self) -> Field<'_> {
        json_field(&self.name)
    }
    fn email(&self) -> Field<'_> {
        json_field(&self.email)
    }
    fn phone(&self) -> Field<'_> {
        json_field(&self.phone)
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        // Dot-separated local atoms, dot-separated labels, alphabetic TLD.
        static ref EMAIL_RE: Regex = Regex::new(
            r"^[A-Za-z0-9_'+\-]+(?:\.[A-Za-z0-9_'+\-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$"
        )
        .unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Checks every field and returns either the trimmed record or all violations found.
pub fn validate<I: UserFields + ?Sized>(input: &I) -> Result<NewUser, Vec<Violation>> {
    let mut violations = Vec::new();

    let name = required("name", input.name(), &mut violations);
    if let Some(name) = name {
        let len = name.chars().count();
        if len < NAME_MIN {
            violations.push(Violation::new("name", "Name must be at least 2 characters"));
        } else if len > NAME_MAX {
            violations.push(Violation::new("name", "Name must be less than 100 characters"));
        }
    }

    let email = required("email", input.email(), &mut violations);
    if let Some(email) = email {
        if !is_valid_email(email) {
            violations.push(Violation::new("email", "Invalid email address"));
        }
    }

    let phone = required("phone", input.phone(), &mut violations);
    if let Some(phone) = phone {
        let len = phone.chars().count();
        if len < PHONE_MIN {
            violations.push(Violation::new("phone", "Phone number must be at least 10 characters"));
        } else if len > PHONE_MAX {
            violations.push(Violation::new("phone", "Phone number must be less than 15 characters"));
        }
    }

    match (name, email, phone) {
        (Some(name), Some(email), Some(phone)) if violations.is_empty() => Ok(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
        }),
        _ => Err(violations),
    }
}

fn required<'a>(field: &str, value: Field<'a>, violations: &mut Vec<Violation>) -> Option<&'a str> {
    match value {
        Field::Text(v) => Some(v.trim()),
        Field::Missing => {
            violations.push(Violation::new(field, "Required"));
            None
        }
        Field::Mistyped(received) => {
            violations.push(Violation::new(field, &format!("Expected string, received {received}")));
            None
        }
    }
}
