pub mod config;
pub mod models;

#[cfg(test)]
mod testing;

pub use config::*;
pub use models::*;
