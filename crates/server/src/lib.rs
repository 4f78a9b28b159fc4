//! HTTP surface and configuration for the performance suite backend

pub mod api;
pub mod config;
