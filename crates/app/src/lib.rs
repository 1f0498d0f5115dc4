//! Terminal front-end over the marketplace, care-home directory, food posts
//! and profile features.

pub mod config;
pub mod demo;
pub mod platform;
pub mod render;
