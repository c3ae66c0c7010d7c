pub mod config;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod presentation;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
pub mod views;
