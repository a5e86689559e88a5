//! Gain ramps used for click-free transitions

use std::f32::consts::PI;

/// Raised-cosine fade-out gain at ramp index `t` of an `n`-frame ramp.
/// 1.0 at `t = 0`, 0.0 at `t = n - 1`.
#[inline]
pub fn raised_cosine_out(t: usize, n: usize) -> f32 {
    if n < 2 {
        return 0.0;
    }
    0.5 * (1.0 + (PI * t as f32 / (n - 1) as f32).cos())
}

/// Raised-cosine fade-in gain, the mirror of [`raised_cosine_out`]
#[inline]
pub fn raised_cosine_in(t: usize, n: usize) -> f32 {
    if n < 2 {
        return 1.0;
    }
    0.5 * (1.0 - (PI * t as f32 / (n - 1) as f32).cos())
}

/// Linear block-length fade-in gain at frame `s` of `frames`
#[inline]
pub fn linear_in(s: usize, frames: usize) -> f32 {
    if frames == 0 {
        return 1.0;
    }
    s as f32 / frames as f32
}

/// Linear block-length fade-out gain at frame `s` of `frames`
#[inline]
pub fn linear_out(s: usize, frames: usize) -> f32 {
    1.0 - linear_in(s, frames)
}
