// Library exports for camxuc - capture-and-classify emotion client

pub mod camera;
pub mod client;
pub mod config;
pub mod controller;
pub mod display;
pub mod encoder;
pub mod error;
pub mod models;
pub mod ui;
