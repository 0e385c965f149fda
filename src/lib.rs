//! Plinko Forge - deterministic Plinko trajectory synthesis and playback
//!
//! Core modules:
//! - `layout`: Board geometry derived from a row count (single source of truth)
//! - `sim`: Seeded, fixed-step ball drop simulation
//! - `anim`: Keyframe trajectory data model shared by generation and playback
//! - `library`: Rejection-sampled animation library with quality gates,
//!   persistence and versioned import/export
//! - `player`: Rate-independent keyframe playback state machine
//! - `storage`: Pluggable key-value persistence port

pub mod anim;
pub mod layout;
pub mod library;
pub mod player;
pub mod sim;
pub mod storage;

pub use anim::{AnimationKeyframe, BallAnimation, Quality};
pub use layout::{BoardLayout, Peg, calculate_layout, generate_pegs};
pub use library::AnimationLibrary;
pub use player::AnimationPlayer;
pub use sim::{SimulationConfig, SimulationResult, simulate_ball_drop};

/// Board and physics constants
///
/// Simulated trajectories and any live-rendered physics must read these from
/// one place or the bucket formula drifts silently between the two.
pub mod consts {
    /// Canvas width in pixels
    pub const CANVAS_WIDTH: f32 = 600.0;
    /// Canvas height in pixels
    pub const CANVAS_HEIGHT: f32 = 680.0;
    /// Margin between playfield and canvas edge (the "walls")
    pub const BOARD_MARGIN: f32 = 40.0;
    /// Y coordinate where the ball is released
    pub const START_Y: f32 = 60.0;
    /// Y coordinate of the bucket row (trajectory terminates here)
    pub const BUCKET_Y: f32 = 600.0;

    /// Peg radius in pixels
    pub const PEG_RADIUS: f32 = 4.0;
    /// Ball radius in pixels
    pub const BALL_RADIUS: f32 = 7.0;

    /// Downward acceleration (px/s²)
    pub const GRAVITY: f32 = 900.0;
    /// Velocity retained after a peg bounce
    pub const BOUNCE_DAMPING: f32 = 0.75;
    /// Velocity retained after a wall reflection (walls kill more energy)
    pub const WALL_DAMPING: f32 = 0.55;
    /// Friction decay per reference frame, scaled exponentially to the step
    pub const FRICTION: f32 = 0.995;
    /// Reference frame time for friction scaling (60 Hz)
    pub const TARGET_FRAME_MS: f32 = 1000.0 / 60.0;
    /// Speed floor (px/s) so the ball never stalls against a peg
    pub const MIN_VELOCITY: f32 = 60.0;

    /// Integration substeps per sampled keyframe
    pub const SIM_SUBSTEPS: u32 = 4;
    /// Substeps a peg stays "hot" after a bounce (no re-resolution)
    pub const BOUNCE_COOLDOWN: u32 = 3;
    /// Magnitude of the seeded perturbation added on each bounce (px/s)
    pub const BOUNCE_JITTER: f32 = 40.0;
    /// Scale of the launch bias toward the target bucket (px/s)
    pub const LAUNCH_BIAS: f32 = 150.0;
    /// Seeded jitter on the launch velocity (px/s)
    pub const LAUNCH_JITTER: f32 = 25.0;

    /// Slack added to the pyramidal envelope band (px)
    pub const ENVELOPE_TOLERANCE: f32 = 18.0;
    /// Fastest plausible speed used by the smoothness gate (px/s)
    pub const MAX_PLAUSIBLE_SPEED: f32 = 1400.0;
}

/// Linear interpolation between `a` and `b` by `t` in [0, 1]
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
