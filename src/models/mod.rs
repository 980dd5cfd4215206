pub mod common;
pub mod game;
pub mod lineup;
pub mod player;
pub mod stats;
