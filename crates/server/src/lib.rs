pub mod routes;
pub mod startup;
pub mod errors;
pub mod openapi;

pub use routes::auth::ServerState;
pub use startup::{build_app, build_state, run};
