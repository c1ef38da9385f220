use crate::access::BasicAuthGuard;
use crate::error::{self, JsonResult};
use crate::state::RocketState;
use app::payment::{self, HistoryQuery, Payment, StatusFilter};
use rocket::get;
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(super) struct HistoryResponse {
    history: Vec<PaymentModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct PaymentModel {
    created_at: i64,
    expiry: i64,
    bolt11: String,
    hash: String,
    address: String,
    description: String,
    amount: i64,
    is_expired: bool,
    is_paid: bool,
    #[serde(skip_serializing_if = "is_zero")]
    paid_at: i64,
    ln_paid: bool,
    btc_paid: bool,
    btc_amount: i64,
    confirmations: i64,
    txids: Vec<String>,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

impl PaymentModel {
    fn from_entity(payment: Payment) -> Self {
        Self {
            created_at: payment.details.created_at,
            expiry: payment.details.expiry,
            bolt11: payment.details.bolt11,
            hash: payment.details.hash,
            address: payment.details.address,
            description: payment.description,
            amount: payment.amount.0,
            is_expired: payment.expired,
            is_paid: payment.paid,
            paid_at: payment.paid_at,
            ln_paid: payment.ln_paid,
            btc_paid: payment.btc_paid,
            btc_amount: payment.btc_amount.0,
            confirmations: payment.confirmations,
            txids: payment.txids,
        }
    }
}

/// Merged payment history, newest first.
#[get("/history?<limit>&<offset>&<only_status>")]
pub(super) async fn list(
    state: &State<RocketState>,
    _guard: BasicAuthGuard,
    limit: Option<i64>,
    offset: Option<i64>,
    only_status: Option<String>,
) -> JsonResult<HistoryResponse> {
    let only_status = match only_status.as_deref() {
        None | Some("") => None,
        Some("paid") => Some(StatusFilter::Paid),
        Some("expired") => Some(StatusFilter::Expired),
        Some("pending") => Some(StatusFilter::Pending),
        Some(other) => {
            return Err(error::bad_request(format!(
                "invalid only_status {:?}: must be one of paid, expired or pending",
                other
            )))
        }
    };
    let query = HistoryQuery {
        limit: limit.unwrap_or(0),
        offset: offset.unwrap_or(0),
        only_status,
    };
    let result = payment::history(state.ln.as_ref(), state.chain.as_deref(), query)
        .await
        .map_err(|e| {
            error::internal_server_error(format!("Can't get history from LN node: {}", e))
        })?;
    Ok(Json(HistoryResponse {
        history: result
            .history
            .into_iter()
            .map(PaymentModel::from_entity)
            .collect(),
        error: result.warning,
    }))
}
