//! Wire representation of products.
//!
//! Writes go through an ordered pipeline:
//!
//! 1. [`check_price`] runs first and stops at the first price problem
//!    (`InvalidNumber`, then `MustBePositive`). Both are decided on the
//!    floating-point value, so `-1e30` and `-inf` are rejected as non-positive.
//! 2. Each raw field is coerced to its type (presence, nulls, blanks,
//!    timestamps, uploads).
//! 3. The coerced name, description and price go through a derived
//!    [`Validate`] struct for length, range and decimal places.
//!
//! Errors from steps 2 and 3 are reported together.
//!
//! Reads project a [`Product`] into a [`ProductView`], computing `is_on_sale`
//! and `current_price` against the supplied instant.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::error::{FieldErrorKind, FieldErrors, ProductError, ProductResult};
use crate::media::{Upload, image_extension};
use crate::models::{CartItem, NewProduct, Product};
use crate::pricing::SalePricing;

/// `hour:minute AM/PM day month-name year`, e.g. `12:10 PM 16 August 2022`
pub const SALE_TIMESTAMP_FORMAT: &str = "%I:%M %p %d %B %Y";

pub const WARRANTY_HEADING: &str = "\n\nWarranty Information:\n";
const WARRANTY_LINE_SEPARATOR: &str = "; ";

const PRICE_DECIMAL_PLACES: u32 = 2;
const MIN_PRICE: f64 = 1.0;
const MAX_PRICE: f64 = 100_000.0;

const MSG_REQUIRED: &str = "This field is required.";
const MSG_NULL: &str = "This field may not be null.";
const MSG_BLANK: &str = "This field may not be blank.";
const MSG_NOT_A_STRING: &str = "Not a valid string.";
const MSG_INVALID_NUMBER: &str = "A valid number is required.";
const MSG_NOT_POSITIVE: &str = "Must be above $0.0";
const MSG_TIMESTAMP: &str =
    "Datetime has wrong format. Use one of these formats instead: hh:mm AM/PM DD Month YYYY.";
const MSG_PRICE_MIN: &str = "Ensure this value is greater than or equal to 1.00.";
const MSG_PRICE_MAX: &str = "Ensure this value is less than or equal to 100000.00.";
const MSG_NOT_A_FILE: &str = "The submitted data was not a file.";
const MSG_EMPTY_FILE: &str = "The submitted file is empty.";
const MSG_NOT_UTF8: &str = "The submitted file is not valid UTF-8 text.";
const MSG_NOT_AN_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Parses [`SALE_TIMESTAMP_FORMAT`]. The month must be spelled out in full;
/// `%B` alone would also take `Aug`.
pub fn parse_sale_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let naive = NaiveDateTime::parse_from_str(raw, SALE_TIMESTAMP_FORMAT).ok()?;

    let month = raw.split_whitespace().nth(3)?;
    let full_month = naive.format("%B").to_string();
    month
        .eq_ignore_ascii_case(&full_month)
        .then(|| naive.and_utc())
}

pub fn format_sale_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(SALE_TIMESTAMP_FORMAT).to_string()
}

/// Serde adapter for optional sale bounds in [`SALE_TIMESTAMP_FORMAT`].
pub mod sale_timestamp {
    use super::{format_sale_timestamp, parse_sale_timestamp};
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_some(&format_sale_timestamp(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| {
                parse_sale_timestamp(&raw)
                    .ok_or_else(|| de::Error::custom(format!("invalid sale timestamp: {}", raw)))
            })
            .transpose()
    }
}

/// Which fields a write must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// `POST`: name, description and price required
    Create,
    /// `PUT`: same requirements, omitted photo is cleared
    Replace,
    /// `PATCH`: every field optional, omitted fields untouched
    Partial,
}

impl WriteMode {
    fn requires_core_fields(self) -> bool {
        !matches!(self, WriteMode::Partial)
    }
}

/// Keeps an explicit `null` distinct from an omitted field.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Request body for create and update.
///
/// Fields are kept as raw JSON so type mismatches surface as field errors.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProductPayload {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, max_length = 200, example = "New product")]
    pub name: Option<Value>,

    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, min_length = 2, max_length = 200, example = "New awesome product")]
    pub description: Option<Value>,

    /// Decimal string or number in `[1.00, 100000.00]`, at most 2 decimal places
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, example = "123.45")]
    pub price: Option<Value>,

    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, nullable, example = "12:10 PM 16 August 2022")]
    pub sale_start: Option<Value>,

    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, nullable, example = "12:10 PM 23 August 2022")]
    pub sale_end: Option<Value>,

    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, nullable)]
    pub photo: Option<Value>,

    /// Text, list of lines, or UTF-8 bytes. Appended to the description on update, dropped on create.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, example = "7 day return")]
    pub warranty: Option<Value>,

    /// `photo` file part of a multipart body; takes precedence over `photo`
    #[serde(skip)]
    pub photo_file: Option<Upload>,

    /// `warranty` file part of a multipart body; takes precedence over `warranty`
    #[serde(skip)]
    pub warranty_file: Option<Upload>,
}

impl ProductPayload {
    /// Sets a text part of a multipart body. An empty value clears the
    /// nullable fields, the same as a JSON `null`.
    pub fn set_form_field(&mut self, name: &str, text: String) {
        let nullable = |text: String| {
            if text.trim().is_empty() {
                Some(Value::Null)
            } else {
                Some(Value::String(text))
            }
        };

        match name {
            "name" => self.name = Some(Value::String(text)),
            "description" => self.description = Some(Value::String(text)),
            "price" => self.price = Some(Value::String(text)),
            "sale_start" => self.sale_start = nullable(text),
            "sale_end" => self.sale_end = nullable(text),
            "photo" => self.photo = nullable(text),
            "warranty" => self.warranty = Some(Value::String(text)),
            other => tracing::debug!(field = %other, "Ignoring unknown form field"),
        }
    }
}

/// Warranty document split into lines, each keeping its line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarrantyDocument {
    lines: Vec<String>,
}

impl WarrantyDocument {
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.split_inclusive('\n').map(str::to_string).collect(),
        }
    }

    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, std::str::Utf8Error> {
        std::str::from_utf8(bytes).map(Self::from_text)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.is_empty())
    }

    pub fn append_to(&self, description: &mut String) {
        description.push_str(WARRANTY_HEADING);
        description.push_str(&self.lines.join(WARRANTY_LINE_SEPARATOR));
    }
}

/// Validated field values of a write. `None` means "not supplied".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub sale_start: Option<Option<DateTime<Utc>>>,
    pub sale_end: Option<Option<DateTime<Utc>>>,
    pub photo: Option<Option<String>>,
    /// Validated image still to be stored; its reference then becomes `photo`
    pub photo_upload: Option<Upload>,
    pub warranty: Option<WarrantyDocument>,
}

impl ProductChanges {
    /// Writes the supplied fields onto `product`, then appends the warranty
    /// to whichever description results.
    pub fn apply_to(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(sale_start) = self.sale_start {
            product.sale_start = sale_start;
        }
        if let Some(sale_end) = self.sale_end {
            product.sale_end = sale_end;
        }
        if let Some(photo) = self.photo {
            product.photo = photo;
        }
        if let Some(warranty) = self.warranty {
            warranty.append_to(&mut product.description);
        }
    }

    /// Drops the warranty; the stored entity has nowhere to keep it.
    pub fn into_new_product(self) -> ProductResult<NewProduct> {
        match (self.name, self.description, self.price) {
            (Some(name), Some(description), Some(price)) => Ok(NewProduct {
                name,
                description,
                price,
                sale_start: self.sale_start.flatten(),
                sale_end: self.sale_end.flatten(),
                photo: self.photo.flatten(),
            }),
            _ => Err(ProductError::Internal(
                "create payload passed validation without required fields".to_string(),
            )),
        }
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    raw.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(raw).ok())
}

/// A price that passed [`check_price`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CheckedPrice {
    Exact(Decimal),
    /// Positive, but beyond what a [`Decimal`] holds (`1e30`, `inf`, ...)
    Unrepresentable(f64),
}

impl CheckedPrice {
    pub fn exact(self) -> Option<Decimal> {
        match self {
            CheckedPrice::Exact(price) => Some(price),
            CheckedPrice::Unrepresentable(_) => None,
        }
    }
}

fn invalid_number() -> ProductError {
    ProductError::field("price", FieldErrorKind::InvalidNumber, MSG_INVALID_NUMBER)
}

/// First pipeline stage: price must be numeric, then strictly positive.
///
/// Returns `None` when no price (or `null`) was sent.
pub fn check_price(payload: &ProductPayload) -> ProductResult<Option<CheckedPrice>> {
    let raw = match &payload.price {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err(invalid_number()),
    };

    let value = raw
        .parse::<f64>()
        .ok()
        .filter(|v| !v.is_nan())
        .ok_or_else(invalid_number)?;

    if value <= 0.0 {
        return Err(ProductError::field(
            "price",
            FieldErrorKind::MustBePositive,
            MSG_NOT_POSITIVE,
        ));
    }

    Ok(Some(match parse_decimal(&raw) {
        Some(price) => CheckedPrice::Exact(price),
        None => CheckedPrice::Unrepresentable(value),
    }))
}

fn price_error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

fn decimal_places_error() -> ValidationError {
    price_error(
        "decimal_places",
        format!(
            "Ensure that there are no more than {} decimal places.",
            PRICE_DECIMAL_PLACES
        ),
    )
}

fn validate_price(price: &CheckedPrice) -> Result<(), ValidationError> {
    let price = match *price {
        CheckedPrice::Exact(price) => price,
        CheckedPrice::Unrepresentable(value) if value > MAX_PRICE => {
            return Err(price_error("range", MSG_PRICE_MAX));
        }
        CheckedPrice::Unrepresentable(value) if value < MIN_PRICE => {
            return Err(price_error("range", MSG_PRICE_MIN));
        }
        // In range but with more digits than a Decimal carries
        CheckedPrice::Unrepresentable(_) => return Err(decimal_places_error()),
    };

    if price.normalize().scale() > PRICE_DECIMAL_PLACES {
        return Err(decimal_places_error());
    }
    if price < Decimal::ONE {
        return Err(price_error("range", MSG_PRICE_MIN));
    }
    if price > Decimal::from(100_000) {
        return Err(price_error("range", MSG_PRICE_MAX));
    }
    Ok(())
}

/// Coerced core fields, checked with the validator derive.
#[derive(Debug, Validate)]
struct CoreFields {
    #[validate(length(max = 200))]
    name: Option<String>,

    #[validate(length(min = 2, max = 200))]
    description: Option<String>,

    #[validate(custom(function = "validate_price"))]
    price: Option<CheckedPrice>,
}

/// Runs the full pipeline and returns the validated changes.
pub fn validate_payload(payload: ProductPayload, mode: WriteMode) -> ProductResult<ProductChanges> {
    let price = check_price(&payload)?;

    let mut errors = FieldErrors::new();
    let required = mode.requires_core_fields();

    let core = CoreFields {
        name: text_field(&mut errors, "name", payload.name, required),
        description: text_field(&mut errors, "description", payload.description, required),
        price: price_field(&mut errors, payload.price.as_ref(), price, required),
    };
    if let Err(invalid) = core.validate() {
        errors.merge(invalid.into());
    }

    let (photo, photo_upload) = match payload.photo_file {
        Some(upload) => (None, image_upload(&mut errors, upload)),
        None => match photo_field(&mut errors, payload.photo) {
            None if mode == WriteMode::Replace => (Some(None), None),
            photo => (photo, None),
        },
    };

    let warranty = match payload.warranty_file {
        Some(upload) => warranty_upload(&mut errors, upload),
        None => warranty_field(&mut errors, payload.warranty),
    };

    let changes = ProductChanges {
        sale_start: timestamp_field(&mut errors, "sale_start", payload.sale_start),
        sale_end: timestamp_field(&mut errors, "sale_end", payload.sale_end),
        name: core.name,
        description: core.description,
        price: core.price.and_then(CheckedPrice::exact).map(|mut price| {
            price.rescale(PRICE_DECIMAL_PLACES);
            price
        }),
        photo,
        photo_upload,
        warranty,
    };

    errors.into_result()?;
    Ok(changes)
}

/// Presence, null and type checks; lengths are left to [`CoreFields`].
fn text_field(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<Value>,
    required: bool,
) -> Option<String> {
    let text = match raw {
        None => {
            if required {
                errors.add(field, FieldErrorKind::Required, MSG_REQUIRED);
            }
            return None;
        }
        Some(Value::Null) => {
            errors.add(field, FieldErrorKind::InvalidType, MSG_NULL);
            return None;
        }
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => {
            errors.add(field, FieldErrorKind::InvalidType, MSG_NOT_A_STRING);
            return None;
        }
    };

    if text.is_empty() {
        errors.add(field, FieldErrorKind::LengthConstraint, MSG_BLANK);
        return None;
    }
    Some(text)
}

fn price_field(
    errors: &mut FieldErrors,
    raw: Option<&Value>,
    checked: Option<CheckedPrice>,
    required: bool,
) -> Option<CheckedPrice> {
    match (raw, checked) {
        (Some(_), Some(price)) => Some(price),
        (None, _) => {
            if required {
                errors.add("price", FieldErrorKind::Required, MSG_REQUIRED);
            }
            None
        }
        (Some(_), None) => {
            errors.add("price", FieldErrorKind::InvalidType, MSG_NULL);
            None
        }
    }
}

fn timestamp_field(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<Value>,
) -> Option<Option<DateTime<Utc>>> {
    match raw {
        None => None,
        Some(Value::Null) => Some(None),
        Some(Value::String(s)) => match parse_sale_timestamp(&s) {
            Some(ts) => Some(Some(ts)),
            None => {
                errors.add(field, FieldErrorKind::InvalidTimestamp, MSG_TIMESTAMP);
                None
            }
        },
        Some(_) => {
            errors.add(field, FieldErrorKind::InvalidTimestamp, MSG_TIMESTAMP);
            None
        }
    }
}

fn photo_field(errors: &mut FieldErrors, raw: Option<Value>) -> Option<Option<String>> {
    match raw {
        None => None,
        Some(Value::Null) => Some(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Some((!s.is_empty()).then(|| s.to_string()))
        }
        Some(_) => {
            errors.add(
                "photo",
                FieldErrorKind::InvalidType,
                "Expected an image reference string.",
            );
            None
        }
    }
}

fn image_upload(errors: &mut FieldErrors, upload: Upload) -> Option<Upload> {
    if upload.is_empty() {
        errors.add("photo", FieldErrorKind::InvalidType, MSG_EMPTY_FILE);
        return None;
    }
    if image_extension(&upload.bytes).is_none() {
        errors.add("photo", FieldErrorKind::InvalidType, MSG_NOT_AN_IMAGE);
        return None;
    }
    Some(upload)
}

fn warranty_upload(errors: &mut FieldErrors, upload: Upload) -> Option<WarrantyDocument> {
    if upload.is_empty() {
        errors.add("warranty", FieldErrorKind::InvalidType, MSG_EMPTY_FILE);
        return None;
    }
    match WarrantyDocument::from_bytes(&upload.bytes) {
        Ok(document) => (!document.is_empty()).then_some(document),
        Err(_) => {
            errors.add("warranty", FieldErrorKind::InvalidEncoding, MSG_NOT_UTF8);
            None
        }
    }
}

fn warranty_field(errors: &mut FieldErrors, raw: Option<Value>) -> Option<WarrantyDocument> {
    let document = match raw {
        None | Some(Value::Null) => return None,
        Some(Value::String(text)) => WarrantyDocument::from_text(&text),
        Some(Value::Array(items)) => match warranty_from_array(items) {
            Ok(doc) => doc,
            Err((kind, message)) => {
                errors.add("warranty", kind, message);
                return None;
            }
        },
        Some(_) => {
            errors.add("warranty", FieldErrorKind::InvalidType, MSG_NOT_A_FILE);
            return None;
        }
    };

    (!document.is_empty()).then_some(document)
}

/// An array is either lines of text or the document's raw bytes.
fn warranty_from_array(
    items: Vec<Value>,
) -> Result<WarrantyDocument, (FieldErrorKind, &'static str)> {
    if items.iter().all(Value::is_string) {
        let lines = items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect();
        return Ok(WarrantyDocument::from_lines(lines));
    }

    let bytes = items
        .iter()
        .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect::<Option<Vec<u8>>>()
        .ok_or((FieldErrorKind::InvalidType, MSG_NOT_A_FILE))?;

    WarrantyDocument::from_bytes(&bytes).map_err(|_| (FieldErrorKind::InvalidEncoding, MSG_NOT_UTF8))
}

/// A product as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::str")]
    #[schema(value_type = String, example = "123.45")]
    pub price: Decimal,
    #[serde(with = "sale_timestamp")]
    #[schema(value_type = Option<String>, example = "12:10 PM 16 August 2022")]
    pub sale_start: Option<DateTime<Utc>>,
    #[serde(with = "sale_timestamp")]
    #[schema(value_type = Option<String>, example = "12:10 PM 23 August 2022")]
    pub sale_end: Option<DateTime<Utc>>,
    pub is_on_sale: bool,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 123.45)]
    pub current_price: Decimal,
    pub cart_items: Vec<CartItem>,
    pub photo: Option<String>,
}

impl ProductView {
    pub fn project(
        product: Product,
        cart_items: Vec<CartItem>,
        now: DateTime<Utc>,
        pricing: &dyn SalePricing,
    ) -> Self {
        Self {
            is_on_sale: product.is_on_sale(now),
            current_price: product.current_price(now, pricing),
            id: product.id,
            name: product.name,
            description: product.description,
            price: product.price,
            sale_start: product.sale_start,
            sale_end: product.sale_end,
            cart_items,
            photo: product.photo,
        }
    }
}
