//! Process bootstrap helpers shared by the api, worker, and unified server
//! binaries: env loading, tracing setup, and database pool construction.

pub mod bootstrap;

pub use bootstrap::{init_db, init_env, init_tracing};
