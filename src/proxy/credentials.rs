//! Credential and model resolution shared by both routes

use super::error::AssistError;
use crate::config::{default_base_url, ProviderConfig};
use crate::provider::Endpoint;

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Pick the endpoint for a request: caller values win when non-empty, then process defaults
///
/// Fails with `MissingApiKey` when no key is available; nothing is sent upstream in that case.
pub fn resolve_endpoint(
    api_key: Option<&str>,
    base_url: Option<&str>,
    defaults: &ProviderConfig,
) -> Result<Endpoint, AssistError> {
    let key = non_empty(api_key)
        .or_else(|| non_empty(defaults.api_key.as_deref()))
        .ok_or(AssistError::MissingApiKey)?;

    let base = match non_empty(base_url).or_else(|| non_empty(Some(defaults.base_url.as_str()))) {
        Some(url) => url.to_string(),
        None => default_base_url(),
    };

    Ok(Endpoint::new(key, base))
}

/// Model for a request: caller value when non-empty, else the configured default
pub fn resolve_model(model: Option<&str>, defaults: &ProviderConfig) -> String {
    non_empty(model).unwrap_or(defaults.model.as_str()).to_string()
}
