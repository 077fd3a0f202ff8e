use diesel::result::{DatabaseErrorKind, Error as DieselError};
use log::error;
use rocket::form::error::ErrorKind;
use rocket::form::Errors;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Flash, Redirect, Responder};
use std::collections::HashMap;
use std::fmt;
use std::io::Error as IoError;

use crate::utils::back;

pub trait Validate
where
    Self: Sized,
{
    type Error;
    fn validate(self) -> Result<Self, Self::Error>;
}

#[derive(Debug)]
pub enum ApiError {
    Diesel(DieselError),
    Validation(ValidationError),
    Conflict(String),
    NotFound(String),
    Forbidden(String),
    Internal,
    Unauthorized,
}

impl ApiError {
    pub fn conflict<S: Into<String>>(message: S) -> ApiError {
        ApiError::Conflict(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> ApiError {
        ApiError::NotFound(message.into())
    }

    pub fn forbidden<S: Into<String>>(message: S) -> ApiError {
        ApiError::Forbidden(message.into())
    }

    /// Message shown to the user for the errors that end in a flash redirect.
    /// `None` means the error is unexpected and goes to the error catcher.
    pub fn flash_message(&self) -> Option<String> {
        match self {
            ApiError::Validation(error) => Some(error.to_string()),
            ApiError::Conflict(message)
            | ApiError::NotFound(message)
            | ApiError::Forbidden(message) => Some(message.clone()),
            ApiError::Unauthorized => Some("Please sign in first.".to_string()),
            ApiError::Diesel(_) | ApiError::Internal => None,
        }
    }
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> ApiError {
        match err {
            DieselError::NotFound => ApiError::not_found("Record didn't exist!"),
            // the storage constraints are the last word on duplicates
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                ApiError::conflict(format!("Already exists: {}", info.message()))
            }
            // a session whose user row is gone
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                ApiError::not_found("User or restaurant didn't exist!")
            }
            other => ApiError::Diesel(other),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> ApiError {
        ApiError::Validation(err)
    }
}

impl<'v> From<Errors<'v>> for ApiError {
    fn from(errors: Errors<'v>) -> ApiError {
        ApiError::Validation(ValidationError::from_form(&errors))
    }
}

impl From<IoError> for ApiError {
    fn from(_: IoError) -> ApiError {
        ApiError::Internal
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.flash_message() {
            Some(message) => f.write_str(&message),
            None => match self {
                ApiError::Diesel(error) => write!(f, "database error: {}", error),
                _ => f.write_str("internal error"),
            },
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize, Default, PartialEq)]
pub struct ValidationError(HashMap<String, Vec<String>>);

impl ValidationError {
    pub fn add_error<K: Into<String>, V: Into<String>>(&mut self, key: K, val: V) {
        let entry = self.0.entry(key.into()).or_default();
        entry.push(val.into());
    }

    pub fn from<K: Into<String>, V: Into<String>>(key: K, val: V) -> Self {
        let mut error = ValidationError::default();
        error.add_error(key, val);
        error
    }

    /// One message per field Rocket could not parse, keyed by the field name.
    pub fn from_form(errors: &Errors<'_>) -> Self {
        let mut validation = ValidationError::default();
        for error in errors.iter() {
            let field = error
                .name
                .as_ref()
                .map(|name| name.to_string())
                .unwrap_or_else(|| "form".to_string());
            let message = match error.kind {
                ErrorKind::Missing => format!("{} is required!", field),
                _ => format!("{} is invalid: {}", field, error),
            };
            validation.add_error(field, message);
        }
        validation
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn merge(&mut self, other: ValidationError) {
        for (key, errors) in other.0.into_iter() {
            let entry = self.0.entry(key).or_default();
            entry.extend(errors);
        }
    }

    pub fn empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_error(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut keys = self.0.keys().collect::<Vec<_>>();
        keys.sort();
        let messages = keys
            .into_iter()
            .flat_map(|key| self.0[key].iter().map(String::as_str))
            .collect::<Vec<_>>();
        f.write_str(&messages.join(" "))
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        match self.flash_message() {
            Some(message) => {
                let target = match self {
                    ApiError::Unauthorized => "/signin".to_string(),
                    _ => back(req),
                };
                Flash::error(Redirect::to(target), message).respond_to(req)
            }
            None => {
                error!("{} {} failed: {}", req.method(), req.uri(), self);
                Err(Status::InternalServerError)
            }
        }
    }
}
