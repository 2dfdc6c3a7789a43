//! Full instrument benchmarks.
//!
//! Each model renders a sustained note at its default controls, the way a
//! host would drive it once per control period.

mod instruments;

pub use instruments::bench_instruments;
