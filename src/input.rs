//! Reference input subsystem: named action/axis bindings over key state
//! with per-frame edge detection.

use crate::types::KeyState;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct HeadlessInput {
    actions: HashMap<String, Vec<String>>,
    axes: HashMap<String, Vec<(String, f32)>>,
    down: HashSet<String>,
    down_last_frame: HashSet<String>,
    /// Analog key values (sticks, triggers); override the digital level.
    analog: HashMap<String, f32>,
    mouse_delta: (f32, f32),
}

impl HeadlessInput {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Bindings
    // -----------------------------------------------------------------------

    pub fn bind_action(&mut self, action: impl Into<String>, key: impl Into<String>) {
        self.actions.entry(action.into()).or_default().push(key.into());
    }

    pub fn bind_axis(&mut self, axis: impl Into<String>, key: impl Into<String>, scale: f32) {
        self.axes
            .entry(axis.into())
            .or_default()
            .push((key.into(), scale));
    }

    // -----------------------------------------------------------------------
    // Device feed
    // -----------------------------------------------------------------------

    pub fn press(&mut self, key: &str) {
        self.down.insert(key.to_string());
    }

    pub fn release(&mut self, key: &str) {
        self.down.remove(key);
    }

    pub fn set_analog(&mut self, key: &str, value: f32) {
        self.analog.insert(key.to_string(), value);
    }

    pub fn move_mouse(&mut self, dx: f32, dy: f32) {
        self.mouse_delta.0 += dx;
        self.mouse_delta.1 += dy;
    }

    /// Close the current frame: this frame's levels become next frame's
    /// baseline for edge detection.
    pub fn end_frame(&mut self) {
        self.down_last_frame = self.down.clone();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn key_state(&self, key: &str) -> KeyState {
        let down = self.down.contains(key);
        let was_down = self.down_last_frame.contains(key);
        KeyState {
            down,
            just_pressed: down && !was_down,
            just_released: !down && was_down,
        }
    }

    pub fn action_keys(&self, action: &str) -> Vec<KeyState> {
        self.actions
            .get(action)
            .map(|keys| keys.iter().map(|k| self.key_state(k)).collect())
            .unwrap_or_default()
    }

    pub fn axis_value(&self, axis: &str) -> Option<f32> {
        let bindings = self.axes.get(axis)?;
        let value = bindings
            .iter()
            .map(|(key, scale)| match self.analog.get(key) {
                Some(v) => v * scale,
                None if self.down.contains(key) => *scale,
                None => 0.0,
            })
            .sum::<f32>();
        Some(value)
    }

    pub fn take_mouse_delta(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.mouse_delta)
    }
}
