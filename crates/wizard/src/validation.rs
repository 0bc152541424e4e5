//! Field validation, one pure function per step.
//!
//! Each validator turns a raw operator input into a typed [`FieldValue`]
//! or explains why it cannot. [`validate`] resolves the keep signal
//! against the session's [`EditOverlay`] before any step rule runs.

use std::str::FromStr;

use rust_decimal::Decimal;
use shopwright_core::catalog::{Category, CategoryId, ImageRef};
use thiserror::Error;

use crate::overlay::EditOverlay;
use crate::steps::{StepId, StepRegistry};

/// Shortest accepted product name, in characters.
pub const NAME_MIN_CHARS: usize = 5;
/// Longest accepted product name, in characters.
pub const NAME_MAX_CHARS: usize = 149;
/// Descriptions must be longer than this many characters.
pub const DESCRIPTION_MIN_EXCLUSIVE: usize = 4;

/// One operator input, as normalized by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardInput {
    /// Free text
    Text(String),
    /// Data of a pressed inline button
    Choice(String),
    /// An uploaded photo
    Photo {
        file_id: String,
        caption: Option<String>,
    },
    /// Keep the value the edited product already has
    Keep,
}

impl WizardInput {
    pub fn text(s: impl Into<String>) -> Self {
        WizardInput::Text(s.into())
    }

    pub fn photo(file_id: impl Into<String>) -> Self {
        WizardInput::Photo {
            file_id: file_id.into(),
            caption: None,
        }
    }
}

/// A validated field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Category(CategoryId),
    Price(Decimal),
    Image(ImageRef),
}

/// Field-level input problems. The session stays on the same step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "The name of the product must be between {min} and {max} characters long (got {len}).\nEnter again"
    )]
    NameLength { len: usize, min: usize, max: usize },

    #[error("Description too short.\nPlease enter again")]
    DescriptionTooShort { len: usize },

    #[error("Enter a correct price value, for example 9.50")]
    InvalidPrice(String),

    #[error("The price cannot be negative")]
    NegativePrice,

    #[error("Send a photo of the product")]
    PhotoRequired,

    #[error("You have entered invalid data, enter the product {field} as text")]
    TextRequired { field: &'static str },

    #[error("There is no previous value to keep here")]
    NothingToKeep,
}

/// The input does not name a category from the current list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Select the category from the buttons")]
pub struct SelectionError {
    pub input: String,
}

/// Either kind of rejection a validator can produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// What a validator may consult besides the raw input.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext<'a> {
    /// The product being edited, if any
    pub overlay: Option<&'a EditOverlay>,
    /// The category list as it is right now
    pub categories: &'a [Category],
}

/// Signature shared by every step validator.
pub type Validator = fn(&WizardInput, &ValidationContext<'_>) -> Result<FieldValue, FieldError>;

/// Validate `input` for `step`.
///
/// With an overlay present, `Keep` always succeeds and yields the
/// overlay's stored value. Without one, `Keep` is rejected.
pub fn validate(
    registry: &StepRegistry,
    step: StepId,
    input: &WizardInput,
    ctx: &ValidationContext<'_>,
) -> Result<FieldValue, FieldError> {
    if let WizardInput::Keep = input {
        return match ctx.overlay {
            Some(overlay) => Ok(overlay.value_for(step)),
            None => Err(ValidationError::NothingToKeep.into()),
        };
    }
    (registry.get(step).validator)(input, ctx)
}

pub(crate) fn validate_name(
    input: &WizardInput,
    _ctx: &ValidationContext<'_>,
) -> Result<FieldValue, FieldError> {
    let text = expect_text(input, "name")?;
    let len = text.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        return Err(ValidationError::NameLength {
            len,
            min: NAME_MIN_CHARS,
            max: NAME_MAX_CHARS,
        }
        .into());
    }
    Ok(FieldValue::Text(text.to_string()))
}

pub(crate) fn validate_description(
    input: &WizardInput,
    _ctx: &ValidationContext<'_>,
) -> Result<FieldValue, FieldError> {
    let text = expect_text(input, "description")?;
    let len = text.chars().count();
    if len <= DESCRIPTION_MIN_EXCLUSIVE {
        return Err(ValidationError::DescriptionTooShort { len }.into());
    }
    Ok(FieldValue::Text(text.to_string()))
}

pub(crate) fn validate_category(
    input: &WizardInput,
    ctx: &ValidationContext<'_>,
) -> Result<FieldValue, FieldError> {
    let raw = match input {
        WizardInput::Choice(data) | WizardInput::Text(data) => data.as_str(),
        WizardInput::Photo { .. } | WizardInput::Keep => "",
    };
    let selected = raw
        .trim()
        .parse::<i64>()
        .ok()
        .map(CategoryId)
        .filter(|id| ctx.categories.iter().any(|c| c.id == *id));

    selected.map(FieldValue::Category).ok_or_else(|| {
        SelectionError {
            input: raw.to_string(),
        }
        .into()
    })
}

pub(crate) fn validate_price(
    input: &WizardInput,
    _ctx: &ValidationContext<'_>,
) -> Result<FieldValue, FieldError> {
    let text = expect_text(input, "price")?;
    let price = Decimal::from_str(text.trim())
        .map_err(|_| ValidationError::InvalidPrice(text.to_string()))?;
    if price < Decimal::ZERO {
        return Err(ValidationError::NegativePrice.into());
    }
    Ok(FieldValue::Price(price))
}

pub(crate) fn validate_image(
    input: &WizardInput,
    _ctx: &ValidationContext<'_>,
) -> Result<FieldValue, FieldError> {
    match input {
        WizardInput::Photo { file_id, .. } => Ok(FieldValue::Image(ImageRef(file_id.clone()))),
        _ => Err(ValidationError::PhotoRequired.into()),
    }
}

fn expect_text<'a>(input: &'a WizardInput, field: &'static str) -> Result<&'a str, FieldError> {
    match input {
        WizardInput::Text(text) => Ok(text),
        _ => Err(ValidationError::TextRequired { field }.into()),
    }
}
