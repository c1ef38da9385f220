//! This library contains definitions for the API layer.

use rocket::{Build, Rocket};

mod access;
mod error;
mod routes;
mod state;

pub use state::RocketState;

pub fn register(rocket: Rocket<Build>, state: RocketState) -> Rocket<Build> {
    routes::register(rocket, state)
}
