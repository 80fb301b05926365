//! Request location derived from edge geo headers.

use std::{borrow::Cow, convert::Infallible};

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

use crate::services::ranking::Location;

const COUNTRY_HEADERS: [&str; 3] = ["x-vercel-ip-country", "cf-ipcountry", "x-country-code"];
const REGION_HEADERS: [&str; 2] = ["x-vercel-ip-country-region", "x-region"];
const CITY_HEADERS: [&str; 2] = ["x-vercel-ip-city", "x-city"];

/// Location hints of the caller; missing headers fall back to placeholders.
#[derive(Debug, Clone)]
pub struct ClientLocation(pub Location);

impl<S> FromRequestParts<S> for ClientLocation
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(location_from_headers(&parts.headers)))
    }
}

/// Read the first present header of each group.
pub fn location_from_headers(headers: &HeaderMap) -> Location {
    Location::new(
        first_header(headers, &COUNTRY_HEADERS).as_deref(),
        first_header(headers, &REGION_HEADERS).as_deref(),
        first_header(headers, &CITY_HEADERS).as_deref(),
    )
}

fn first_header(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .map(decode_component)
        .find(|value| !value.trim().is_empty())
}

/// Vercel percent-encodes city names such as `S%C3%A3o%20Paulo`.
fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}
