//! Client for a raster prediction service: upload a trained model and TIFF
//! layers, request a prediction, and show the resulting raster and map.

pub mod api;
pub mod config;
pub mod controller;
pub mod shell;
pub mod view;

pub use controller::{Controller, ControllerError};
