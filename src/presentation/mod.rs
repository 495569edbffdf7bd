//! Presentation layer: projections and template rendering.

pub mod views;
