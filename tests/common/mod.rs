#![allow(dead_code)]

pub mod game_helpers;
pub mod utils;
