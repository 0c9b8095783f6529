//! Index maintenance handlers.

use crate::server::AppState;
use serde_json::Value;

pub async fn update_index(state: &AppState, _params: &Value) -> attachment_search::Result<Value> {
    let outcome = state.search.update_index().await?;
    Ok(serde_json::to_value(outcome)?)
}

pub async fn rebuild_index(state: &AppState, _params: &Value) -> attachment_search::Result<Value> {
    let outcome = state.search.rebuild_index().await?;
    Ok(serde_json::to_value(outcome)?)
}

pub async fn index_status(state: &AppState, _params: &Value) -> attachment_search::Result<Value> {
    let status = state.search.index_status()?;
    Ok(serde_json::to_value(status)?)
}
