//! Command handlers

pub mod catalog;
pub mod config;
pub mod request;
pub mod search;
pub mod stats;
pub mod vote;
