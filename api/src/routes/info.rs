use crate::error::{self, JsonError, JsonResult};
use crate::state::RocketState;
use rocket::get;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(super) struct InfoResponse {
    uris: Vec<String>,
    #[serde(rename = "on-chain")]
    on_chain: bool,
    #[serde(rename = "off-chain")]
    off_chain: bool,
}

#[get("/info")]
pub(super) async fn info(state: &State<RocketState>) -> JsonResult<InfoResponse> {
    let info = state
        .ln
        .info()
        .await
        .map_err(|e| error::internal_server_error(format!("Can't get info from LN node: {}", e)))?;
    Ok(Json(InfoResponse {
        uris: info.uris,
        on_chain: state.chain.is_some(),
        off_chain: true,
    }))
}

#[get("/healthcheck")]
pub(super) async fn healthcheck(state: &State<RocketState>) -> Result<Status, JsonError> {
    state.ln.info().await.map_err(|e| {
        log::warn!("healthcheck: LN node unreachable: {}", e);
        error::internal_server_error(format!("LN node unreachable: {}", e))
    })?;
    if let Some(chain) = &state.chain {
        chain.block_count().await.map_err(|e| {
            log::warn!("healthcheck: Bitcoin node unreachable: {}", e);
            error::internal_server_error(format!("Bitcoin node unreachable: {}", e))
        })?;
    }
    Ok(Status::Ok)
}
