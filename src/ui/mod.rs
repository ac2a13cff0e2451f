//! Presentation: console tables, SVG figures and series colors.

pub mod chart;
pub mod palette;
pub mod table;

pub use palette::Palette;
