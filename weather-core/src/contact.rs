//! Contact form: field validation and submission.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use serde::Serialize;

use crate::{
    error::WeatherError,
    http::{classify, truncate_body},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
    Message,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Message => "message",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn length_between(
    value: &str,
    min: usize,
    max: usize,
    too_short: &'static str,
    too_long: &'static str,
) -> Result<(), &'static str> {
    let len = value.trim().chars().count();
    if len < min {
        Err(too_short)
    } else if len > max {
        Err(too_long)
    } else {
        Ok(())
    }
}

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-]+(?:\.[A-Za-z0-9_'+\-]+)*@(?:[A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

pub fn validate_name(value: &str) -> Result<(), &'static str> {
    length_between(value, 2, 100, "At least 2 characters.", "At most 100 characters.")
}

pub fn validate_message(value: &str) -> Result<(), &'static str> {
    length_between(value, 5, 500, "At least 5 characters.", "At most 500 characters.")
}

pub fn validate_email(value: &str) -> Result<(), &'static str> {
    if EMAIL.is_match(value.trim()) { Ok(()) } else { Err("Enter a valid email address.") }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactForm {
    /// Validate every field, reporting the first problem of each.
    /// On success the returned form has all fields trimmed.
    pub fn validate(&self) -> Result<ContactForm, Vec<FieldError>> {
        let checks = [
            (Field::Name, validate_name(&self.name)),
            (Field::Email, validate_email(&self.email)),
            (Field::Message, validate_message(&self.message)),
        ];

        let errors: Vec<FieldError> = checks
            .into_iter()
            .filter_map(|(field, r)| r.err().map(|message| FieldError { field, message }))
            .collect();

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ContactForm {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            message: self.message.trim().to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ContactSender {
    http: Client,
    endpoint: String,
    timeout_secs: u64,
}

impl ContactSender {
    pub fn new(http: Client, endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        Self { http, endpoint: endpoint.into(), timeout_secs }
    }

    /// POST an already validated form as JSON.
    pub async fn submit(&self, form: &ContactForm) -> Result<(), WeatherError> {
        tracing::debug!(endpoint = %self.endpoint, "sending contact form");

        let res = self
            .http
            .post(&self.endpoint)
            .json(form)
            .send()
            .await
            .map_err(|e| classify(e, self.timeout_secs))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(WeatherError::Status { status: status.as_u16(), body: truncate_body(&body) });
        }

        Ok(())
    }
}
