pub mod commands;
pub mod config;
pub mod resolver;
pub mod session;
