use crate::error::{self, JsonResult};
use crate::state::RocketState;
use app::btc::Sats;
use app::chain::AddrStatus;
use app::ln;
use app::payment::{self, NewPayment, Only, StatusQuery, StatusReply};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, post, Shutdown, State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
pub(super) struct PaymentRequest {
    amount: i64,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    only: String,
}

#[derive(Debug, Serialize)]
pub(super) struct NewPaymentModel {
    created_at: i64,
    expiry: i64,
    bolt11: String,
    hash: String,
    address: String,
}

impl NewPaymentModel {
    fn from_entity(payment: NewPayment) -> Self {
        Self {
            created_at: payment.created_at,
            expiry: payment.expiry,
            bolt11: payment.bolt11,
            hash: payment.hash,
            address: payment.address,
        }
    }
}

/// Issue a new payment: an LN invoice and/or a watched on-chain address.
#[post("/payment", data = "<req>")]
pub(super) async fn create(
    state: &State<RocketState>,
    req: Json<PaymentRequest>,
) -> JsonResult<NewPaymentModel> {
    let only = match req.only.as_str() {
        "" => Only::Both,
        "btc" => Only::Btc,
        "ln" => Only::Ln,
        _ => {
            return Err(error::bad_request(
                "only= is an optional parameter that can only take `btc` and `ln` as values"
                    .to_owned(),
            ))
        }
    };
    payment::issue(
        state.ln.as_ref(),
        state.chain.as_deref(),
        Sats(req.amount),
        &req.desc,
        only,
    )
    .await
    .map(|payment| Json(NewPaymentModel::from_entity(payment)))
    .map_err(|e| {
        let description = e.to_string();
        match e {
            payment::IssueError::DescriptionTooLong => error::bad_request(description),
            _ => error::internal_server_error(description),
        }
    })
}

#[derive(Debug, Serialize)]
pub(super) struct StatusReplyModel {
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ln: Option<LnStatusModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bitcoin: Option<AddrStatusModel>,
}

#[derive(Debug, Serialize)]
struct LnStatusModel {
    created_at: i64,
    is_paid: bool,
    expiry: i64,
    amount: i64,
}

impl LnStatusModel {
    fn from_entity(status: ln::Status) -> Self {
        Self {
            created_at: status.created_at,
            is_paid: status.settled,
            expiry: status.expiry,
            amount: status.value.0,
        }
    }
}

#[derive(Debug, Serialize)]
struct AddrStatusModel {
    address: String,
    amount: f64,
    confirmations: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    label: String,
    txids: Vec<String>,
}

impl AddrStatusModel {
    fn from_entity(status: AddrStatus) -> Self {
        Self {
            address: status.address,
            amount: status.amount,
            confirmations: status.confirmations,
            label: status.label,
            txids: status.txids,
        }
    }
}

impl StatusReplyModel {
    fn from_entity(reply: StatusReply) -> (Status, Json<Self>) {
        // Code zero carries a non-terminal LN update; still a success.
        let code = if reply.code < 100 { 200 } else { reply.code };
        (
            Status::new(code),
            Json(Self {
                error: reply.error,
                ln: reply.ln.map(LnStatusModel::from_entity),
                bitcoin: reply.bitcoin.map(AddrStatusModel::from_entity),
            }),
        )
    }
}

/// Long-poll the status of one payment until either rail settles, the
/// invoice expires or the request is abandoned.
#[get("/payment?<hash>&<address>&<flexible>")]
pub(super) async fn status(
    state: &State<RocketState>,
    hash: Option<String>,
    address: Option<String>,
    flexible: Option<bool>,
    shutdown: Shutdown,
) -> (Status, Json<StatusReplyModel>) {
    let empty = |s: &Option<String>| s.as_deref().unwrap_or("").is_empty();
    if empty(&hash) && empty(&address) {
        return StatusReplyModel::from_entity(StatusReply::error(
            400,
            "At least one of `hash` or `address` needs to be provided".to_owned(),
        ));
    }

    let caller = CancellationToken::new();
    let resolve = payment::resolve(
        Arc::clone(&state.ln),
        state.chain.clone(),
        StatusQuery {
            hash,
            address,
            flexible: flexible.unwrap_or(false),
        },
        caller.clone(),
    );
    let reply = tokio::select! {
        reply = resolve => reply,
        _ = shutdown => {
            caller.cancel();
            StatusReply::cancelled()
        }
    };
    if reply.code >= 300 {
        log::info!("payment watch ended with {}: {:?}", reply.code, reply.error);
    }
    StatusReplyModel::from_entity(reply)
}
