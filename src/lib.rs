pub mod bot;
pub mod cli;
pub mod config;
pub mod global;
