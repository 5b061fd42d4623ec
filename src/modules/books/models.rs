use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;

/// A persisted book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Storage-assigned identifier, never reused
    pub id: i64,
    pub title: String,
    /// Always `>= 0`
    pub price: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A validated book ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub price: i64,
}

/// Validated partial update; `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BookChanges {
    pub title: Option<String>,
    pub price: Option<i64>,
}

impl BookChanges {
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(price) = self.price {
            book.price = price;
        }
    }
}

/// Inclusive price filter. `max: None` leaves the range open above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    pub min: i64,
    pub max: Option<i64>,
}

/// Rejections produced before any storage call. `Display` is the client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BookValidationError {
    #[error("Title and price are required")]
    MissingFields,
    #[error("Title must be a string")]
    TitleNotString,
    #[error("Price must be a non-negative number")]
    InvalidPrice,
    #[error("At least one of title or price is required")]
    NoChanges,
    #[error("minprice query parameter is required")]
    MissingMinPrice,
    #[error("minprice must be a non-negative number")]
    InvalidMinPrice,
    #[error("maxprice must be a number greater than or equal to minprice")]
    InvalidMaxPrice,
    #[error("Invalid ID")]
    InvalidId,
}

impl From<BookValidationError> for bookstore_http::error::AppError {
    fn from(error: BookValidationError) -> Self {
        Self::validation(error.to_string())
    }
}

/// `POST /` body. Fields stay untyped until [`CreateBookRequest::validate`]
/// so every shape problem gets a precise message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBookRequest {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
}

impl CreateBookRequest {
    pub fn validate(self) -> Result<NewBook, BookValidationError> {
        let (title, price) = match (self.title, self.price) {
            (Some(title), Some(price)) if !is_empty_string(&title) => (title, price),
            _ => return Err(BookValidationError::MissingFields),
        };

        let Value::String(title) = title else {
            return Err(BookValidationError::TitleNotString);
        };
        let price = parse_price(&price)?;

        Ok(NewBook { title, price })
    }
}

/// `PATCH /{id}` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookRequest {
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
}

impl UpdateBookRequest {
    /// An empty `title` does not count towards "at least one field", but when
    /// sent alongside a price it is stored as-is.
    pub fn validate(self) -> Result<BookChanges, BookValidationError> {
        let title_supplied = matches!(&self.title, Some(title) if !is_empty_string(title));
        if !title_supplied && self.price.is_none() {
            return Err(BookValidationError::NoChanges);
        }

        let title = match self.title {
            None => None,
            Some(Value::String(title)) => Some(title),
            Some(_) => return Err(BookValidationError::TitleNotString),
        };
        let price = self.price.as_ref().map(parse_price).transpose()?;

        Ok(BookChanges { title, price })
    }
}

/// `GET /` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceRangeQuery {
    pub minprice: Option<String>,
    pub maxprice: Option<String>,
}

impl PriceRangeQuery {
    /// `Ok(None)` means the bounds are valid but `minprice` lies beyond any
    /// storable price, so nothing can match.
    pub fn validate(self) -> Result<Option<PriceRange>, BookValidationError> {
        let min = self
            .minprice
            .ok_or(BookValidationError::MissingMinPrice)?;
        let min = match parse_integer(&min) {
            Some(Integer::Fits(min)) if min >= 0 => Some(min),
            Some(Integer::AboveRange) => None,
            _ => return Err(BookValidationError::InvalidMinPrice),
        };

        let max = match self.maxprice {
            None => None,
            Some(max) => match (parse_integer(&max), min) {
                (Some(Integer::Fits(max)), Some(min)) if max >= min => Some(max),
                // Above every storable price, so no upper limit at all.
                (Some(Integer::AboveRange), _) => None,
                _ => return Err(BookValidationError::InvalidMaxPrice),
            },
        };

        Ok(min.map(|min| PriceRange { min, max }))
    }
}

/// Parse the `{id}` path segment. `Ok(None)` is a well-formed integer outside
/// the id space, which names no book.
pub fn parse_id(raw: &str) -> Result<Option<i64>, BookValidationError> {
    match parse_integer(raw).ok_or(BookValidationError::InvalidId)? {
        Integer::Fits(id) => Ok(Some(id)),
        Integer::AboveRange | Integer::BelowRange => Ok(None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Integer {
    Fits(i64),
    AboveRange,
    BelowRange,
}

/// Base-10 integer text. Values past `i64` are still integers, just unbounded.
fn parse_integer(raw: &str) -> Option<Integer> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<i64>() {
        return Some(Integer::Fits(value));
    }

    let (negative, digits) = match raw.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(if negative {
        Integer::BelowRange
    } else {
        Integer::AboveRange
    })
}

/// Prices must be JSON integers; numeric strings and fractions are rejected.
fn parse_price(value: &Value) -> Result<i64, BookValidationError> {
    value
        .as_i64()
        .filter(|price| *price >= 0)
        .ok_or(BookValidationError::InvalidPrice)
}

fn is_empty_string(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}
