#[macro_use]
extern crate diesel;

pub mod actions;
pub mod api;
pub mod booking;
pub mod config;
pub mod error;
pub mod models;
pub mod schema;
pub mod store;

#[cfg(test)]
mod memory_store;
