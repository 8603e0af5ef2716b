pub mod config;
pub mod engine;
pub mod error;
pub mod ethereum;
pub mod meta_vault;
pub mod server;
pub mod subgraph;
pub mod tools;
pub mod transaction;
pub mod vault_info;
