mod server;

pub mod auth;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;
pub mod ws;

pub use server::{serve, start_server};
pub use state::AppState;
