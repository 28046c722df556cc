//! Interactive terminal world map of earthquake events.
//!
//! Boundaries are rasterized as Braille dots, earthquakes are drawn as
//! colored circles whose size and visibility follow the zoom scale.

pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod error;
pub mod map;
pub mod ui;
