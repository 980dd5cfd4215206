pub mod config;
pub mod console;
pub mod errors;
pub mod game;
pub mod gateway;
pub mod models;
pub mod notifications;
pub mod telemetry;
