//! Rate-independent keyframe playback
//!
//! A small per-ball state machine (idle, playing, complete). The host drives
//! it from its animation-frame callback with a wall-clock timestamp; the
//! player interpolates between keyframes, so the display refresh rate and the
//! rate the trajectory was sampled at never need to agree. Players are fully
//! independent; one per concurrently dropping ball.

use crate::anim::BallAnimation;
use crate::lerp;

/// Interpolated ball position handed to `on_update`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackPoint {
    pub x: f32,
    pub y: f32,
    /// Elapsed milliseconds into the animation (clamped to its duration)
    pub time: f64,
}

/// What `advance` observed this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackFrame {
    /// Nothing playing
    Idle,
    Playing(PlaybackPoint),
    /// Animation finished (on this call or a previous one)
    Complete,
}

pub type UpdateFn = Box<dyn FnMut(PlaybackPoint)>;
pub type CompleteFn = Box<dyn FnOnce()>;

enum PlayerState {
    Idle,
    Playing { started_at: f64, max_progress: f64 },
    Complete,
}

/// Replays one [`BallAnimation`] against a host-supplied clock
pub struct AnimationPlayer {
    state: PlayerState,
    animation: Option<BallAnimation>,
    on_update: Option<UpdateFn>,
    on_complete: Option<CompleteFn>,
}

impl Default for AnimationPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationPlayer {
    pub fn new() -> Self {
        Self {
            state: PlayerState::Idle,
            animation: None,
            on_update: None,
            on_complete: None,
        }
    }

    /// Start playing an animation; `now_ms` becomes the drop's start time
    ///
    /// `on_update` fires on every `advance` while playing (final position
    /// included); `on_complete` fires exactly once when the duration elapses.
    pub fn play(
        &mut self,
        animation: BallAnimation,
        now_ms: f64,
        on_update: Option<UpdateFn>,
        on_complete: Option<CompleteFn>,
    ) {
        self.animation = Some(animation);
        self.on_update = on_update;
        self.on_complete = on_complete;
        self.state = PlayerState::Playing {
            started_at: now_ms,
            max_progress: 0.0,
        };
    }

    /// Advance playback to `now_ms`
    ///
    /// Call once per host animation frame. Past the duration this clamps to
    /// the final keyframe, emits one last update, fires `on_complete` once
    /// and settles in the complete state.
    pub fn advance(&mut self, now_ms: f64) -> PlaybackFrame {
        let started_at = match self.state {
            PlayerState::Idle => return PlaybackFrame::Idle,
            PlayerState::Complete => return PlaybackFrame::Complete,
            PlayerState::Playing { started_at, .. } => started_at,
        };
        let Some(animation) = &self.animation else {
            return PlaybackFrame::Idle;
        };

        let elapsed = now_ms - started_at;
        if elapsed >= animation.duration {
            let last = animation.final_keyframe();
            let point = PlaybackPoint {
                x: last.x,
                y: last.y,
                time: animation.duration,
            };
            if let Some(update) = self.on_update.as_mut() {
                update(point);
            }
            if let Some(complete) = self.on_complete.take() {
                complete();
            }
            self.state = PlayerState::Complete;
            return PlaybackFrame::Complete;
        }

        let point = sample(animation, elapsed.max(0.0));
        if let Some(update) = self.on_update.as_mut() {
            update(point);
        }
        PlaybackFrame::Playing(point)
    }

    /// Cancel playback; safe to call from any state, any number of times
    pub fn stop(&mut self) {
        self.state = PlayerState::Idle;
        self.animation = None;
        self.on_update = None;
        self.on_complete = None;
    }

    /// Fraction of the animation played, in [0, 1]
    ///
    /// Monotonic non-decreasing while playing, even if the host clock steps
    /// backward between frames.
    pub fn progress(&mut self, now_ms: f64) -> f64 {
        match &mut self.state {
            PlayerState::Idle => 0.0,
            PlayerState::Complete => 1.0,
            PlayerState::Playing {
                started_at,
                max_progress,
            } => {
                let duration = self
                    .animation
                    .as_ref()
                    .map(|a| a.duration)
                    .unwrap_or(0.0);
                if duration <= 0.0 {
                    return 1.0;
                }
                let raw = ((now_ms - *started_at) / duration).clamp(0.0, 1.0);
                *max_progress = max_progress.max(raw);
                *max_progress
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlayerState::Playing { .. })
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, PlayerState::Complete)
    }
}

/// Interpolate the animation at `elapsed` ms
///
/// Keyframe arrays are short; a linear scan for the bracketing pair beats
/// anything cleverer.
fn sample(animation: &BallAnimation, elapsed: f64) -> PlaybackPoint {
    let frames = &animation.keyframes;
    for pair in frames.windows(2) {
        let (k0, k1) = (&pair[0], &pair[1]);
        if elapsed <= k1.time {
            let span = k1.time - k0.time;
            let t = if span > 0.0 {
                ((elapsed - k0.time) / span) as f32
            } else {
                0.0
            };
            return PlaybackPoint {
                x: lerp(k0.x, k1.x, t),
                y: lerp(k0.y, k1.y, t),
                time: elapsed,
            };
        }
    }
    let last = animation.final_keyframe();
    PlaybackPoint {
        x: last.x,
        y: last.y,
        time: elapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::{AnimMeta, AnimationKeyframe, Quality};
    use std::cell::Cell;
    use std::rc::Rc;

    fn test_animation() -> BallAnimation {
        let keyframes = vec![
            AnimationKeyframe { time: 0.0, x: 0.0, y: 0.0, vx: 0.0, vy: 0.0 },
            AnimationKeyframe { time: 100.0, x: 10.0, y: 20.0, vx: 0.0, vy: 0.0 },
            AnimationKeyframe { time: 200.0, x: 30.0, y: 60.0, vx: 0.0, vy: 0.0 },
        ];
        BallAnimation {
            id: "p".into(),
            target_bucket: 0,
            duration: 200.0,
            keyframes,
            quality: Quality::Approved,
            metadata: AnimMeta {
                created: 0,
                row_count: 12,
                description: String::new(),
            },
        }
    }

    #[test]
    fn test_interpolates_between_keyframes() {
        let mut player = AnimationPlayer::new();
        player.play(test_animation(), 1000.0, None, None);

        match player.advance(1050.0) {
            PlaybackFrame::Playing(p) => {
                assert!((p.x - 5.0).abs() < 1e-4);
                assert!((p.y - 10.0).abs() < 1e-4);
            }
            other => panic!("expected playing frame, got {other:?}"),
        }
        match player.advance(1150.0) {
            PlaybackFrame::Playing(p) => {
                assert!((p.x - 20.0).abs() < 1e-4);
                assert!((p.y - 40.0).abs() < 1e-4);
            }
            other => panic!("expected playing frame, got {other:?}"),
        }
    }

    #[test]
    fn test_complete_fires_exactly_once() {
        let completions = Rc::new(Cell::new(0u32));
        let final_pos = Rc::new(Cell::new((0.0f32, 0.0f32)));

        let mut player = AnimationPlayer::new();
        let c = completions.clone();
        let f = final_pos.clone();
        player.play(
            test_animation(),
            0.0,
            Some(Box::new(move |p| f.set((p.x, p.y)))),
            Some(Box::new(move || c.set(c.get() + 1))),
        );

        assert_eq!(player.advance(500.0), PlaybackFrame::Complete);
        assert_eq!(player.advance(600.0), PlaybackFrame::Complete);
        assert_eq!(player.advance(700.0), PlaybackFrame::Complete);
        assert_eq!(completions.get(), 1);
        // Final update clamped to the last keyframe
        assert_eq!(final_pos.get(), (30.0, 60.0));
        assert!(player.is_complete());
    }

    #[test]
    fn test_progress_monotonic_against_backward_clock() {
        let mut player = AnimationPlayer::new();
        player.play(test_animation(), 0.0, None, None);

        assert_eq!(player.progress(0.0), 0.0);
        assert!((player.progress(100.0) - 0.5).abs() < 1e-9);
        // Host clock jumps backward; progress may not regress
        assert!((player.progress(60.0) - 0.5).abs() < 1e-9);
        assert!((player.progress(150.0) - 0.75).abs() < 1e-9);
        player.advance(250.0);
        assert_eq!(player.progress(250.0), 1.0);
    }

    #[test]
    fn test_stop_idempotent_from_any_state() {
        let mut player = AnimationPlayer::new();
        // Idle
        player.stop();
        player.stop();
        assert_eq!(player.advance(0.0), PlaybackFrame::Idle);

        // Playing
        player.play(test_animation(), 0.0, None, None);
        player.advance(50.0);
        player.stop();
        assert!(!player.is_playing());
        assert_eq!(player.advance(100.0), PlaybackFrame::Idle);
        assert_eq!(player.progress(100.0), 0.0);

        // Complete
        player.play(test_animation(), 0.0, None, None);
        player.advance(500.0);
        player.stop();
        player.stop();
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn progress_monotonic_under_any_clock(
                clocks in proptest::collection::vec(-50.0f64..500.0, 1..40)
            ) {
                let mut player = AnimationPlayer::new();
                player.play(test_animation(), 0.0, None, None);
                let mut last = 0.0f64;
                for now in clocks {
                    let p = player.progress(now);
                    prop_assert!(p >= last);
                    prop_assert!((0.0..=1.0).contains(&p));
                    last = p;
                }
            }
        }
    }

    #[test]
    fn test_stopped_player_never_completes() {
        let completions = Rc::new(Cell::new(0u32));
        let c = completions.clone();
        let mut player = AnimationPlayer::new();
        player.play(
            test_animation(),
            0.0,
            None,
            Some(Box::new(move || c.set(c.get() + 1))),
        );
        player.advance(50.0);
        player.stop();
        player.advance(500.0);
        assert_eq!(completions.get(), 0);
    }
}
