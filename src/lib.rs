//! audiotree: serve user-designated directory trees over HTTP
//!
//! Each configured root is published under `/{name}/` with HTML, JSON and
//! M3U listings, strong-validator file delivery with byte ranges, and
//! on-the-fly zip archives of a directory's files.

pub mod cli;
pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod tree;
