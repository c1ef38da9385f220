use rocket::http::Status;
use rocket::serde::json::Json;
use serde::Serialize;

/// Wire shape for failed requests.
#[derive(Debug, Serialize)]
pub struct Error {
    pub error: String,
}

pub type JsonError = (Status, Json<Error>);

pub type JsonResult<T> = Result<Json<T>, JsonError>;

pub fn bad_request(description: String) -> JsonError {
    (Status::BadRequest, Json(Error { error: description }))
}

pub fn internal_server_error(description: String) -> JsonError {
    (
        Status::InternalServerError,
        Json(Error { error: description }),
    )
}
