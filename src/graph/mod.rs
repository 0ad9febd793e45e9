//! Transition graphs - fold matched sequences into weighted state graphs

pub mod builder;
pub mod dot;
pub mod transition;
pub mod tree;

// Re-export key types
pub use builder::{GraphStats, TransitionGraph};
pub use transition::{NodeClass, Transition};
pub use tree::TransitionTree;

/// Spread a heavy-tailed weight distribution over `0.0..=1.0`.
///
/// Weight 1 maps to 0 and `max_weight` to 1; the curve lifts rare weights so
/// they remain distinguishable.
pub fn weight_intensity(weight: u32, max_weight: u32) -> f64 {
    if max_weight <= 1 {
        return 1.0;
    }
    let ratio = f64::from(weight.saturating_sub(1)) / f64::from(max_weight - 1);
    ratio.clamp(0.0, 1.0).powf(0.1)
}
