pub mod config;
pub mod game;
pub mod models;
pub mod registry;
pub mod server;
pub mod session;
