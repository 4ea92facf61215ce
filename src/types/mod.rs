pub mod resolution;
pub mod station;
