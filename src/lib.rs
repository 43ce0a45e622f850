pub mod cli;
pub mod config;
pub mod discovery;
pub mod resolver;
pub mod service;
