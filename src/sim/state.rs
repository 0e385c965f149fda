//! Simulation configuration and result types
//!
//! Expected, recoverable outcomes (bucket miss, timeout) are ordinary values
//! callers branch on; the simulator never panics on them.

use serde::{Deserialize, Serialize};

use crate::anim::BallAnimation;

/// Quality gate bounds applied by the library before an animation is stored
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityThreshold {
    /// Minimum peg bounces for a drop to look like a Plinko drop
    pub min_bounces: u32,
    /// Maximum peg bounces before a drop looks chaotic
    pub max_bounces: u32,
    /// Reject implausibly large inter-keyframe jumps (production mode)
    pub smoothness_check: bool,
}

impl Default for QualityThreshold {
    fn default() -> Self {
        Self {
            min_bounces: 2,
            max_bounces: 40,
            smoothness_check: true,
        }
    }
}

/// Everything that parameterizes a generation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub row_count: u32,
    /// Keyframe sampling rate (frames per second)
    pub frame_rate: u32,
    /// Hard cap on a single drop's duration in milliseconds
    pub max_duration_ms: f64,
    /// Approved-animation quota per bucket
    pub animations_per_bucket: u32,
    pub quality: QualityThreshold,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            row_count: 12,
            frame_rate: 30,
            max_duration_ms: 5000.0,
            animations_per_bucket: 5,
            quality: QualityThreshold::default(),
        }
    }
}

impl SimulationConfig {
    /// Milliseconds between sampled keyframes
    #[inline]
    pub fn frame_ms(&self) -> f64 {
        1000.0 / self.frame_rate as f64
    }
}

/// Per-drop statistics, reported on success and failure alike
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimStats {
    /// Peg bounces only; wall contact is tracked separately
    pub bounces: u32,
    pub duration_ms: f64,
    /// Bucket the ball actually reached; `None` on timeout
    pub final_bucket: Option<u32>,
    pub keyframe_count: usize,
    /// Ball touched a board margin at some point
    pub wall_hit: bool,
}

/// Why a drop failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissReason {
    /// Reached the bucket row, but not the requested bucket
    WrongBucket { landed: u32 },
    /// `max_duration_ms` elapsed before the ball reached the bucket row
    Timeout,
}

/// Outcome of one simulated drop
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationResult {
    /// Ball landed in the requested bucket; animation carries quality
    /// `Pending` until the library gates it
    Landed {
        animation: BallAnimation,
        stats: SimStats,
    },
    Missed {
        reason: MissReason,
        stats: SimStats,
    },
}

impl SimulationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SimulationResult::Landed { .. })
    }

    pub fn stats(&self) -> &SimStats {
        match self {
            SimulationResult::Landed { stats, .. } => stats,
            SimulationResult::Missed { stats, .. } => stats,
        }
    }
}
