//! The records served and accepted by the web layer, their parsing implementations and tests for those.
//!
//! Incoming data is first deserialized into a `Deser*` struct, which may hold invalid fields,
//! and then parsed into its validated counterpart.

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use lazy_regex::regex_is_match;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;
use validator::{ValidateEmail, ValidateUrl};

use crate::store::Document;

/// Status of catalog items that are on sale.
pub const STATUS_CURRENT: &str = "current";
/// Status of catalog items that are no longer on sale.
pub const STATUS_ARCHIVED: &str = "archived";
/// Source recorded for subscribers that didn't name one.
pub const DEFAULT_SUBSCRIBER_SOURCE: &str = "website";
/// Field that identifies a subscriber.
pub const SUBSCRIBER_KEY: &str = "email";

const MAX_TEXT_GRAPHEMES: usize = 256;

// ###################################
// ->   CATALOG
// ###################################
/// A catalog item as it is stored. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct DeserCatalogItem {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: f64,
    pub image: String,
    pub gallery: Option<Vec<String>>,
    pub colorway: Option<String>,
    pub release_month: String,
    #[serde(default = "default_status")]
    pub status: String,
    pub tags: Option<Vec<String>>,
}

fn default_status() -> String {
    STATUS_CURRENT.to_string()
}

/// A validated limited edition tee.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogItem {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: f64,
    pub image: ValidUrl,
    pub gallery: Option<Vec<ValidUrl>>,
    pub colorway: Option<String>,
    pub release_month: ReleaseMonth,
    pub status: String,
    pub tags: Option<Vec<String>>,
}

impl CatalogItem {
    /// Parses a stored document. The internal id should already be stripped.
    pub fn from_document(document: Document) -> Result<Self, DataParsingError> {
        let deser: DeserCatalogItem = serde_json::from_value(Value::Object(document))
            .map_err(|er| DataParsingError::CatalogDocument(er.to_string()))?;
        deser.try_into()
    }
}

impl TryFrom<DeserCatalogItem> for CatalogItem {
    type Error = DataParsingError;

    fn try_from(deser: DeserCatalogItem) -> Result<Self, Self::Error> {
        if !deser.price.is_finite() || deser.price < 0.0 {
            return Err(DataParsingError::PriceInvalid(deser.price));
        }

        let gallery = deser
            .gallery
            .map(|urls| {
                urls.into_iter()
                    .map(ValidUrl::parse)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok(CatalogItem {
            name: deser.name,
            slug: deser.slug,
            description: deser.description,
            price: deser.price,
            image: ValidUrl::parse(deser.image)?,
            gallery,
            colorway: deser.colorway,
            release_month: ReleaseMonth::parse(deser.release_month)?,
            status: deser.status,
            tags: deser.tags,
        })
    }
}

/// An absolute `http` or `https` URL.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ValidUrl(String);

impl AsRef<str> for ValidUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl ValidUrl {
    pub fn parse<S>(value: S) -> Result<Self, DataParsingError>
    where
        S: AsRef<str>,
    {
        let value = value.as_ref();
        let is_http = value.starts_with("http://") || value.starts_with("https://");

        if is_http && value.validate_url() {
            Ok(ValidUrl(value.to_owned()))
        } else {
            Err(DataParsingError::UrlInvalid(value.to_owned()))
        }
    }
}

/// A `YYYY-MM` release month.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ReleaseMonth(String);

impl AsRef<str> for ReleaseMonth {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl ReleaseMonth {
    pub fn parse<S>(value: S) -> Result<Self, DataParsingError>
    where
        S: AsRef<str>,
    {
        let value = value.as_ref();
        if regex_is_match!(r"^\d{4}-\d{2}$", value) {
            Ok(ReleaseMonth(value.to_owned()))
        } else {
            Err(DataParsingError::ReleaseMonthInvalid(value.to_owned()))
        }
    }
}

// ###################################
// ->   SUBSCRIBER
// ###################################
/// Deserializable Subscriber
/// A Subscriber that can be Deserialized but can have invalid fields.
/// An absent `source` defaults to `DEFAULT_SUBSCRIBER_SOURCE`, an explicit `null` is kept.
#[derive(Debug, Deserialize)]
pub struct DeserSubscriber {
    pub email: String,
    pub name: Option<String>,
    #[serde(default = "default_source")]
    pub source: Option<String>,
}

fn default_source() -> Option<String> {
    Some(DEFAULT_SUBSCRIBER_SOURCE.to_string())
}

/// Validated Subscriber
/// A Subscriber with all the fields validated, in the shape it gets stored.
#[derive(Debug, Clone, Serialize)]
pub struct ValidSubscriber {
    pub email: ValidEmail,
    pub name: Option<ValidText>,
    pub source: Option<ValidText>,
}

impl TryFrom<DeserSubscriber> for ValidSubscriber {
    type Error = DataParsingError;

    fn try_from(deser_sub: DeserSubscriber) -> Result<Self, Self::Error> {
        Ok(ValidSubscriber {
            email: ValidEmail::parse(deser_sub.email)?,
            name: deser_sub.name.map(ValidText::parse).transpose()?,
            source: deser_sub.source.map(ValidText::parse).transpose()?,
        })
    }
}

/// Rejects the request before the handler runs if the body is not a valid subscriber.
impl<S> FromRequest<S> for ValidSubscriber
where
    S: Send + Sync,
{
    type Rejection = super::Error;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(deser_sub) = Json::<DeserSubscriber>::from_request(req, state).await?;
        let subscriber = ValidSubscriber::try_from(deser_sub)?;
        Ok(subscriber)
    }
}

/// Validated Subscriber Email
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ValidEmail(String);

impl AsRef<str> for ValidEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl ValidEmail {
    pub fn parse<S>(value: S) -> Result<Self, DataParsingError>
    where
        S: AsRef<str>,
    {
        let value = value.as_ref();

        if value.graphemes(true).count() > MAX_TEXT_GRAPHEMES {
            return Err(DataParsingError::EmailTooLong);
        }

        if !value.validate_email() {
            return Err(DataParsingError::EmailInvalid);
        }

        // The domain is case-insensitive, the local part is kept as given.
        let (local, domain) = value
            .rsplit_once('@')
            .ok_or(DataParsingError::EmailInvalid)?;

        Ok(ValidEmail(format!("{local}@{}", domain.to_lowercase())))
    }
}

/// Free text of at most 256 graphemes, used for subscriber names and sources.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ValidText(String);

impl AsRef<str> for ValidText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl ValidText {
    pub fn parse<S>(value: S) -> Result<Self, DataParsingError>
    where
        S: AsRef<str>,
    {
        let value = value.as_ref();
        if value.graphemes(true).count() > MAX_TEXT_GRAPHEMES {
            return Err(DataParsingError::TextTooLong);
        }

        Ok(ValidText(value.to_owned()))
    }
}

// ###################################
// ->   ERROR
// ###################################
#[derive(Debug, thiserror::Error)]
pub enum DataParsingError {
    #[error("email invalid")]
    EmailInvalid,
    #[error("email too long")]
    EmailTooLong,
    #[error("text longer than {MAX_TEXT_GRAPHEMES} characters")]
    TextTooLong,

    #[error("price must be a finite number >= 0, got: {0}")]
    PriceInvalid(f64),
    #[error("invalid http(s) url: {0}")]
    UrlInvalid(String),
    #[error("release month does not match YYYY-MM: {0}")]
    ReleaseMonthInvalid(String),
    #[error("malformed catalog document: {0}")]
    CatalogDocument(String),
}
