//! Column values buffered by backends that materialize one row at a time.

use smol_str::SmolStr;
use time::{Date, Month};

use crate::error::DriverError;

/// A single column value of the current row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Real(f64),
    Bool(bool),
    Text(SmolStr),
    Date(Date),
    Blob(Vec<u8>),
}

impl Value {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "integer",
            Self::Real(_) => "real",
            Self::Bool(_) => "boolean",
            Self::Text(_) => "text",
            Self::Date(_) => "date",
            Self::Blob(_) => "blob",
        }
    }

    pub fn to_text(&self) -> Result<String, DriverError> {
        match self {
            Self::Text(text) => Ok(text.to_string()),
            Self::Int(value) => Ok(value.to_string()),
            Self::Real(value) => Ok(value.to_string()),
            Self::Bool(value) => Ok(value.to_string()),
            Self::Date(value) => Ok(value.to_string()),
            other => Err(mismatch(other, "text")),
        }
    }

    pub fn to_long(&self) -> Result<i64, DriverError> {
        match self {
            Self::Int(value) => Ok(*value),
            Self::Bool(value) => Ok(i64::from(*value)),
            Self::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| DriverError::type_mismatch(format!("'{text}' is not an integer"))),
            other => Err(mismatch(other, "bigint")),
        }
    }

    pub fn to_int(&self) -> Result<i32, DriverError> {
        let value = self.to_long()?;
        i32::try_from(value)
            .map_err(|_| DriverError::type_mismatch(format!("{value} does not fit in an int")))
    }

    pub fn to_bool(&self) -> Result<bool, DriverError> {
        match self {
            Self::Bool(value) => Ok(*value),
            Self::Int(0) => Ok(false),
            Self::Int(1) => Ok(true),
            Self::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "t" | "true" | "1" => Ok(true),
                "f" | "false" | "0" => Ok(false),
                _ => Err(DriverError::type_mismatch(format!(
                    "'{text}' is not a boolean"
                ))),
            },
            other => Err(mismatch(other, "boolean")),
        }
    }

    pub fn to_date(&self) -> Result<Date, DriverError> {
        match self {
            Self::Date(value) => Ok(*value),
            Self::Text(text) => parse_iso_date(text),
            other => Err(mismatch(other, "date")),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<Date> for Value {
    fn from(value: Date) -> Self {
        Self::Date(value)
    }
}

fn mismatch(value: &Value, wanted: &str) -> DriverError {
    DriverError::type_mismatch(format!(
        "cannot read {} value as {wanted}",
        value.type_name()
    ))
}

/// Parses `YYYY-MM-DD`, ignoring any time part after the date.
pub(crate) fn parse_iso_date(text: &str) -> Result<Date, DriverError> {
    let invalid = || DriverError::type_mismatch(format!("'{text}' is not a date"));
    let date = text.trim().get(..10).ok_or_else(invalid)?;
    let mut parts = date.splitn(3, '-');
    let year = parts
        .next()
        .and_then(|part| part.parse::<i32>().ok())
        .ok_or_else(invalid)?;
    let month = parts
        .next()
        .and_then(|part| part.parse::<u8>().ok())
        .and_then(|month| Month::try_from(month).ok())
        .ok_or_else(invalid)?;
    let day = parts
        .next()
        .and_then(|part| part.parse::<u8>().ok())
        .ok_or_else(invalid)?;
    Date::from_calendar_date(year, month, day).map_err(|_| invalid())
}
