//! HTTP front end for the air quality predictor

pub mod api;
pub mod config;
