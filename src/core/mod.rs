//! Core module - configuration and outbound responses

pub mod config;
pub mod events;
