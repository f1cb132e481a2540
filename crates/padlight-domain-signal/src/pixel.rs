use crate::color::Color;
use crate::signal::{BlendingMode, Signal};
use std::collections::BTreeMap;

// Deeper than any i32 layer can reach.
const OFF_KEY: i64 = i64::MAX;

/// Layered signal stack for one pad.
///
/// Entries are keyed by `-layer`, so iterating in key order visits the
/// highest-priority layer first. The off entry at the bottom is never removed.
#[derive(Clone, Debug)]
pub struct Pixel {
    stack: BTreeMap<i64, Signal>,
}

impl Pixel {
    pub fn new(index: u8) -> Self {
        let mut stack = BTreeMap::new();
        stack.insert(OFF_KEY, Signal::new(index, Color::BLACK));
        Self { stack }
    }

    /// Apply one signal. Returns whether the stack changed.
    pub fn enter(&mut self, signal: &Signal) -> bool {
        let key = signal.layer_key();

        if signal.is_lit() {
            if self.stack.get(&key) == Some(signal) {
                return false;
            }
            self.stack.insert(key, signal.clone());
            true
        } else {
            self.stack.remove(&key).is_some()
        }
    }

    /// Number of active layers, not counting the off entry.
    pub fn len(&self) -> usize {
        self.stack.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.stack.retain(|key, _| *key == OFF_KEY);
    }

    pub fn layers(&self) -> impl Iterator<Item = &Signal> {
        self.stack
            .iter()
            .filter(|(key, _)| **key != OFF_KEY)
            .map(|(_, signal)| signal)
    }

    /// Resultant colour, walking layers from the highest priority down.
    pub fn color(&self) -> Color {
        let entries: Vec<&Signal> = self.layers().collect();
        let mut result = Color::BLACK;
        let mut previous: Option<&Signal> = None;

        for (i, entry) in entries.iter().enumerate() {
            if entry.blending == BlendingMode::Mask {
                break;
            }

            if let Some(next) = entries.get(i + 1) {
                if layer_distance(entry, next) > entry.blending_range() as i64 {
                    continue;
                }
            }

            let multiply = previous.is_some_and(|prev| {
                prev.blending == BlendingMode::Multiply
                    && layer_distance(prev, entry) <= prev.blending_range() as i64
            });
            result = result.mix(&entry.color, multiply);
            previous = Some(entry);

            if entry.blending == BlendingMode::Normal {
                break;
            }
        }

        result
    }
}

fn layer_distance(upper: &Signal, lower: &Signal) -> i64 {
    upper.layer as i64 - lower.layer as i64
}
