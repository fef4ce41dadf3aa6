//! Read contract for the input collaborator.

/// One tick's worth of player intent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputSample {
    /// Forward/backward axis in `[-1, 1]`.
    pub forward: f32,
    /// Turn axis in `[-1, 1]`, positive turns right.
    pub turn: f32,
    /// Jump key went down since the last physics tick.
    pub jump_pressed: bool,
    /// Jump key went up since the last physics tick.
    pub jump_released: bool,
    pub jump_held: bool,
    pub run_held: bool,
}

/// Something that can be asked for the current [`InputSample`].
pub trait InputSource {
    /// `None` when the source is disabled, which reads as no input at all.
    fn sample(&self) -> Option<InputSample>;
}

impl InputSource for InputSample {
    fn sample(&self) -> Option<InputSample> {
        Some(*self)
    }
}

/// Snap small axis values to zero.
pub fn dead_zone(value: f32, threshold: f32) -> f32 {
    if value.abs() < threshold { 0.0 } else { value.clamp(-1.0, 1.0) }
}
