//! Value-range normalization between [0, 1] and [-1, 1].

use ndarray::{Array, ArrayBase, Data, Dimension};

/// Map a value from [0, 1] to [-1, 1].
#[inline]
#[must_use]
pub fn normalize_value(value: f32) -> f32 {
    value.mul_add(2.0, -1.0)
}

/// Map a value from [-1, 1] back to [0, 1], clamping anything outside.
#[inline]
#[must_use]
pub fn denormalize_value(value: f32) -> f32 {
    value.mul_add(0.5, 0.5).clamp(0.0, 1.0)
}

/// Normalize an array from [0, 1] to [-1, 1].
#[must_use]
pub fn normalize<S, D>(values: &ArrayBase<S, D>) -> Array<f32, D>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    values.mapv(normalize_value)
}

/// Denormalize an array from [-1, 1] to [0, 1].
///
/// The output is clamped, so slight overshoot from a decoder is harmless.
#[must_use]
pub fn denormalize<S, D>(values: &ArrayBase<S, D>) -> Array<f32, D>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    values.mapv(denormalize_value)
}

/// Smallest value in an array, `+inf` for an empty one.
#[must_use]
pub fn min_value<S, D>(values: &ArrayBase<S, D>) -> f32
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    values.iter().copied().fold(f32::INFINITY, f32::min)
}
