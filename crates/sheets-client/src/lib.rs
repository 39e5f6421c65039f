pub mod auth;
pub mod client;
pub mod models;

pub use auth::ServiceAccount;
pub use client::Client;
pub use client::Endpoints;
