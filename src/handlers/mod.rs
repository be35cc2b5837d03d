//! HTTP handlers

pub mod admin;
pub mod health;
pub mod metrics;
pub mod model;
pub mod monitoring;
pub mod predict;
