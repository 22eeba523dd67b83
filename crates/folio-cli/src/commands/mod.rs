//! Command handlers

pub mod catalog;
pub mod config;
pub mod position;
pub mod read;
pub mod rewrite;
