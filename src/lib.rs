#![forbid(unsafe_code)]

pub mod animation;
pub mod color;
pub mod connections;
pub mod draw;
pub mod extension;
pub mod host;
pub mod panel_corner;
pub mod screen_corner;
pub mod settings;
pub mod signals;
pub mod style;
pub mod theme;
