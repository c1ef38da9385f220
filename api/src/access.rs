//! HTTP Basic authentication for the history route.

use crate::state::RocketState;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing credentials")]
    MissingCredentials,
    #[error("invalid credentials")]
    InvalidCredentials,
}

/// Grants access when the request carries a configured user's credentials.
pub struct BasicAuthGuard;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for BasicAuthGuard {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let state = req.rocket().state::<RocketState>().unwrap();
        match req.headers().get_one("Authorization") {
            Some(header) if check_credentials(header, &state.users) => {
                Outcome::Success(BasicAuthGuard)
            }
            Some(_) => Outcome::Error((Status::Unauthorized, Error::InvalidCredentials)),
            None => Outcome::Error((Status::Unauthorized, Error::MissingCredentials)),
        }
    }
}

fn check_credentials(header: &str, users: &HashMap<String, String>) -> bool {
    let encoded = match header.strip_prefix("Basic ") {
        Some(encoded) => encoded,
        None => return false,
    };
    let decoded = match STANDARD.decode(encoded.trim()) {
        Ok(decoded) => decoded,
        Err(_) => return false,
    };
    let decoded = match String::from_utf8(decoded) {
        Ok(decoded) => decoded,
        Err(_) => return false,
    };
    match decoded.split_once(':') {
        Some((user, pass)) => users.get(user).map(|expected| expected == pass).unwrap_or(false),
        None => false,
    }
}
