//! Domain types for BlendLab

pub mod bar;
pub mod position;
pub mod series;

pub use bar::Bar;
pub use position::Position;
pub use series::{ensure_aligned, PositionSeries, ReturnSeries, SeriesError, TimeIndex};
