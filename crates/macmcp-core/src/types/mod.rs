/*! Core data-model types shared by every other module in this crate (spec §3). */

mod element;
mod geometry;
mod ids;
mod value;

pub use element::{Element, ElementState};
pub use geometry::{Frame, Point};
pub use ids::{ElementIndex, ElementRef, ProcessId, SnapshotId};
pub use value::{Color, Value};
