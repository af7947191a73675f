// Zone domain module
// Layout cells and the occupancy allocator

#![allow(clippy::module_inception)]

pub mod allocator;
pub mod zone;

pub use allocator::{allocate, Allocation};
pub use zone::{default_zones, validate_layout, Zone, ZoneType};
