pub mod board;
pub mod color;
pub mod command;
pub mod config;
pub mod error;
pub mod history;
pub mod layout;
pub mod model;
pub mod notify;
pub mod persistence;
pub mod search;
