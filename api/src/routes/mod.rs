//! Add top-level routes as submodules here.

use crate::state::RocketState;
use rocket::{Build, Rocket};

mod history;
mod info;
mod payments;

pub fn register(rocket: Rocket<Build>, state: RocketState) -> Rocket<Build> {
    let mut routes = rocket::routes![
        payments::create,
        payments::status,
        info::info,
        info::healthcheck,
    ];
    // history is only served when basic auth is enabled
    if !state.users.is_empty() {
        routes.append(&mut rocket::routes![history::list]);
    }
    rocket.manage(state).mount("/api", routes)
}
