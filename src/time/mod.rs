//! High-precision monotonic timing

pub mod timebase;

pub use timebase::Timebase;
