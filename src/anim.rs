//! Keyframe trajectory data model
//!
//! Shared between the simulator (producer), the library (curator) and the
//! player (consumer). Field names serialize in camelCase to stay
//! wire-compatible with previously exported libraries.

use serde::{Deserialize, Serialize};

/// A timestamped sample of the ball's trajectory
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationKeyframe {
    /// Milliseconds since drop start; first keyframe is 0, sequence is
    /// non-decreasing
    pub time: f64,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// Curation state of an animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Fresh out of the simulator, not yet gated
    Pending,
    /// Passed every quality gate; safe to store and play
    Approved,
    /// Failed a gate; never stored
    Rejected,
}

/// Provenance carried alongside each animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimMeta {
    /// Unix epoch milliseconds at generation time
    pub created: u64,
    pub row_count: u32,
    pub description: String,
}

/// One complete, replayable ball trajectory
///
/// Immutable once approved and stored, except for the `target_bucket`
/// correction the library's scrub pass may apply. Keyframes are never
/// mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallAnimation {
    pub id: String,
    pub target_bucket: u32,
    /// Total length in milliseconds; equals the last keyframe's time
    pub duration: f64,
    pub keyframes: Vec<AnimationKeyframe>,
    pub quality: Quality,
    pub metadata: AnimMeta,
}

impl BallAnimation {
    /// The terminal keyframe (every animation has at least one)
    pub fn final_keyframe(&self) -> &AnimationKeyframe {
        self.keyframes.last().expect("animation has no keyframes")
    }

    pub fn is_approved(&self) -> bool {
        self.quality == Quality::Approved
    }

    /// Keyframe times start at 0 and never decrease
    pub fn times_ordered(&self) -> bool {
        match self.keyframes.first() {
            None => false,
            Some(first) if first.time != 0.0 => false,
            Some(_) => self
                .keyframes
                .windows(2)
                .all(|pair| pair[0].time <= pair[1].time),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(time: f64) -> AnimationKeyframe {
        AnimationKeyframe {
            time,
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
        }
    }

    fn anim(times: &[f64]) -> BallAnimation {
        BallAnimation {
            id: "t".into(),
            target_bucket: 0,
            duration: times.last().copied().unwrap_or(0.0),
            keyframes: times.iter().map(|&t| frame(t)).collect(),
            quality: Quality::Pending,
            metadata: AnimMeta {
                created: 0,
                row_count: 12,
                description: String::new(),
            },
        }
    }

    #[test]
    fn test_times_ordered() {
        assert!(anim(&[0.0, 33.3, 66.6]).times_ordered());
        assert!(anim(&[0.0, 33.3, 33.3]).times_ordered());
        assert!(!anim(&[10.0, 20.0]).times_ordered());
        assert!(!anim(&[0.0, 50.0, 40.0]).times_ordered());
        assert!(!anim(&[]).times_ordered());
    }

    #[test]
    fn test_wire_field_names() {
        let a = anim(&[0.0, 33.3]);
        let json = serde_json::to_value(&a).unwrap();
        assert!(json.get("targetBucket").is_some());
        assert_eq!(json["quality"], "pending");
        assert!(json["metadata"].get("rowCount").is_some());
        assert!(json["keyframes"][0].get("vx").is_some());
    }
}
