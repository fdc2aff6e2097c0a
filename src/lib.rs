#![forbid(unsafe_code)]

pub mod books;
pub mod cache;
pub mod cli;
pub mod config;
pub mod cover;
pub mod library;
pub mod logging;
pub mod lru;
pub mod model;
pub mod notion;
pub mod render;
pub mod server;
