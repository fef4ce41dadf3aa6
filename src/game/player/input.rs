//! Keyboard sampling into [`CharacterInput`].

use bevy::prelude::*;

use crate::locomotion::{InputSample, InputSource};

pub const FORWARD_KEY: KeyCode = KeyCode::KeyW;
pub const BACKWARD_KEY: KeyCode = KeyCode::KeyS;
pub const TURN_LEFT_KEY: KeyCode = KeyCode::KeyA;
pub const TURN_RIGHT_KEY: KeyCode = KeyCode::KeyD;
pub const JUMP_KEY: KeyCode = KeyCode::Space;
pub const RECOVER_KEY: KeyCode = KeyCode::KeyR;

/// Latest input for a character.
///
/// Sampled every frame but consumed on the physics tick, so edges are latched until the tick
/// that reads them calls [`CharacterInput::consume_edges`].
#[derive(Component, Debug, Clone, Copy)]
pub struct CharacterInput {
    pub enabled: bool,
    pub sample: InputSample,
    pub recover_requested: bool,
}

impl Default for CharacterInput {
    fn default() -> Self {
        Self {
            enabled: true,
            sample: InputSample::default(),
            recover_requested: false,
        }
    }
}

impl CharacterInput {
    /// Fold one frame of key state in, keeping edges from earlier frames.
    pub fn record(&mut self, frame: InputSample, recover_pressed: bool) {
        let latched = self.sample;
        self.sample = InputSample {
            jump_pressed: latched.jump_pressed || frame.jump_pressed,
            jump_released: latched.jump_released || frame.jump_released,
            ..frame
        };
        self.recover_requested |= recover_pressed;
    }

    pub fn consume_edges(&mut self) {
        self.sample.jump_pressed = false;
        self.sample.jump_released = false;
    }

    pub fn take_recover(&mut self) -> bool {
        std::mem::take(&mut self.recover_requested)
    }
}

impl InputSource for CharacterInput {
    fn sample(&self) -> Option<InputSample> {
        self.enabled.then_some(self.sample)
    }
}

fn axis(keyboard: &ButtonInput<KeyCode>, positive: KeyCode, negative: KeyCode) -> f32 {
    let mut value = 0.0;
    if keyboard.pressed(positive) {
        value += 1.0;
    }
    if keyboard.pressed(negative) {
        value -= 1.0;
    }
    value
}

pub fn frame_sample(keyboard: &ButtonInput<KeyCode>) -> InputSample {
    InputSample {
        forward: axis(keyboard, FORWARD_KEY, BACKWARD_KEY),
        turn: axis(keyboard, TURN_RIGHT_KEY, TURN_LEFT_KEY),
        jump_pressed: keyboard.just_pressed(JUMP_KEY),
        jump_released: keyboard.just_released(JUMP_KEY),
        jump_held: keyboard.pressed(JUMP_KEY),
        run_held: keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]),
    }
}

pub fn record_keyboard_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut inputs: Query<&mut CharacterInput>,
) {
    let frame = frame_sample(&keyboard);
    let recover = keyboard.just_pressed(RECOVER_KEY);
    for mut input in &mut inputs {
        input.record(frame, recover);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jump_press_survives_until_consumed() {
        let mut input = CharacterInput::default();
        input.record(
            InputSample {
                jump_pressed: true,
                jump_held: true,
                ..default()
            },
            false,
        );
        // A second frame renders before the physics tick.
        input.record(
            InputSample {
                jump_held: true,
                ..default()
            },
            false,
        );
        assert!(input.sample.jump_pressed);

        input.consume_edges();
        assert!(!input.sample.jump_pressed);
        assert!(input.sample.jump_held);
    }

    #[test]
    fn test_disabled_input_reads_as_absent() {
        let input = CharacterInput {
            enabled: false,
            ..default()
        };
        assert_eq!(input.sample(), None);
    }

    #[test]
    fn test_keyboard_mapping() {
        let mut keyboard = ButtonInput::<KeyCode>::default();
        keyboard.press(KeyCode::KeyW);
        keyboard.press(KeyCode::KeyA);
        keyboard.press(KeyCode::ShiftLeft);
        keyboard.press(KeyCode::Space);

        let sample = frame_sample(&keyboard);
        assert_eq!(sample.forward, 1.0);
        assert_eq!(sample.turn, -1.0);
        assert!(sample.run_held);
        assert!(sample.jump_pressed);
        assert!(sample.jump_held);
    }

    #[test]
    fn test_recover_request_is_taken_once() {
        let mut input = CharacterInput::default();
        input.record(InputSample::default(), true);
        assert!(input.take_recover());
        assert!(!input.take_recover());
    }
}
