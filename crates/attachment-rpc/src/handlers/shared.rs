//! Shared handler utilities used across RPC domains.

use attachment_search::AttachmentSearchError;
use serde_json::Value;

/// Extract an optional string parameter, supporting both snake_case and camelCase.
pub(crate) fn get_str_param<'a>(params: &'a Value, snake: &str, camel: &str) -> Option<&'a str> {
    params
        .get(snake)
        .or_else(|| params.get(camel))
        .and_then(|v| v.as_str())
}

/// Extract a required string parameter or return an error.
pub(crate) fn require_str_param(
    params: &Value,
    snake: &str,
    camel: &str,
) -> attachment_search::Result<String> {
    get_str_param(params, snake, camel)
        .map(String::from)
        .ok_or_else(|| AttachmentSearchError::InvalidParams {
            message: format!("Missing required parameter: {}", snake),
        })
}
