//! Search protocol handlers.

use super::shared::require_str_param;
use crate::server::AppState;
use attachment_search::GotoRequest;
use serde_json::Value;

pub async fn search(state: &AppState, params: &Value) -> attachment_search::Result<Value> {
    let query = require_str_param(params, "query", "query")?;
    let results = state.search.search(&query).await?;
    Ok(serde_json::to_value(results)?)
}

pub async fn goto(state: &AppState, params: &Value) -> attachment_search::Result<Value> {
    let request = GotoRequest {
        resource_id: require_str_param(params, "resource_id", "resourceId")?,
        note_id: require_str_param(params, "note_id", "noteId")?,
    };
    state.search.goto(&request).await?;
    Ok(Value::Null)
}
