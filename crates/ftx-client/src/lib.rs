pub mod client;
pub mod models;

pub use client::Client;
pub use models::Fetched;
