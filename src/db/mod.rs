pub mod connection;
pub mod models;
pub mod schema;
pub mod store;

pub use connection::{establish_connection, PgPool};
pub use store::PgStore;
