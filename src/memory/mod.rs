//! Memory Module
//!
//! Byte accounting helpers consumed by the store: size-string parsing,
//! the host memory probe, and value footprint estimation.

mod probe;
mod sizer;
mod size;

pub use probe::total_system_memory;
pub use size::parse_size_string;
pub use sizer::footprint_of;
