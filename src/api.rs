// HTTP API over the reconciled cooler dataset

pub mod handlers;
pub mod routes;
pub mod server;

pub use server::ApiServer;
