//! Quality gates applied before an animation is stored
//!
//! The simulator only guarantees the ball reached the right bucket. These
//! gates guarantee the trajectory also looks like a Plinko drop: zig-zag
//! motion inside the pyramidal envelope, no wall scraping, sane duration,
//! no numerical anomalies.

use serde::{Deserialize, Serialize};

use crate::anim::BallAnimation;
use crate::consts::{ENVELOPE_TOLERANCE, MAX_PLAUSIBLE_SPEED};
use crate::layout::{BoardLayout, envelope_half_width};
use crate::sim::{QualityThreshold, SimStats};

/// Shortest drop that still reads as a real drop on screen
pub const MIN_APPROVED_DURATION_MS: f64 = 1000.0;

/// Horizontal movement under this many pixels does not count as direction
const REVERSAL_EPSILON: f32 = 0.5;

/// Why a bucket-correct trajectory was still rejected
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Ball scraped a board margin
    WallContact,
    /// Bounce count outside the configured window
    BounceCount { bounces: u32 },
    /// Too quick or too slow to look right
    Duration { ms: f64 },
    /// A keyframe strayed outside the pyramidal envelope band
    Envelope { keyframe: usize },
    /// Monotonic slide; not enough zig-zag
    Reversals { found: u32, required: u32 },
    /// Implausible jump between consecutive keyframes
    Jump { keyframe: usize },
}

/// Direction reversals required for a row count: `max(2, ceil(rows / 3))`
#[inline]
pub fn required_reversals(row_count: u32) -> u32 {
    2.max(row_count.div_ceil(3))
}

/// Run every gate; `Ok(())` means the animation may be approved
pub fn evaluate(
    animation: &BallAnimation,
    stats: &SimStats,
    threshold: &QualityThreshold,
    max_duration_ms: f64,
    layout: &BoardLayout,
) -> Result<(), RejectReason> {
    if stats.wall_hit {
        return Err(RejectReason::WallContact);
    }
    if stats.bounces < threshold.min_bounces || stats.bounces > threshold.max_bounces {
        return Err(RejectReason::BounceCount {
            bounces: stats.bounces,
        });
    }
    if animation.duration < MIN_APPROVED_DURATION_MS || animation.duration > max_duration_ms {
        return Err(RejectReason::Duration {
            ms: animation.duration,
        });
    }
    check_envelope(animation, layout)?;
    check_reversals(animation, layout.row_count)?;
    if threshold.smoothness_check {
        check_smoothness(animation)?;
    }
    Ok(())
}

/// Every keyframe must stay inside the expanding envelope plus tolerance
///
/// A trajectory can stay off the literal walls and still swing implausibly
/// wide early in the drop; that is what this catches.
fn check_envelope(animation: &BallAnimation, layout: &BoardLayout) -> Result<(), RejectReason> {
    let center_x = layout.canvas_width / 2.0;
    let first_row_y = layout.start_y + layout.row_height;
    let span = layout.bucket_y - first_row_y;
    for (i, kf) in animation.keyframes.iter().enumerate() {
        let t = ((kf.y - first_row_y) / span).clamp(0.0, 1.0);
        let allowed = envelope_half_width(layout, t) + ENVELOPE_TOLERANCE;
        if (kf.x - center_x).abs() > allowed {
            return Err(RejectReason::Envelope { keyframe: i });
        }
    }
    Ok(())
}

/// Count horizontal direction changes across the keyframe sequence
fn check_reversals(animation: &BallAnimation, row_count: u32) -> Result<(), RejectReason> {
    let required = required_reversals(row_count);
    let mut reversals: u32 = 0;
    let mut direction: i8 = 0;
    for pair in animation.keyframes.windows(2) {
        let dx = pair[1].x - pair[0].x;
        if dx.abs() < REVERSAL_EPSILON {
            continue;
        }
        let sign: i8 = if dx > 0.0 { 1 } else { -1 };
        if direction != 0 && sign != direction {
            reversals += 1;
        }
        direction = sign;
    }
    if reversals < required {
        return Err(RejectReason::Reversals {
            found: reversals,
            required,
        });
    }
    Ok(())
}

/// No two consecutive keyframes may be further apart than the fastest
/// plausible ball could travel in the elapsed time
fn check_smoothness(animation: &BallAnimation) -> Result<(), RejectReason> {
    for (i, pair) in animation.keyframes.windows(2).enumerate() {
        let dt_s = (pair[1].time - pair[0].time) as f32 / 1000.0;
        if dt_s <= 0.0 {
            continue;
        }
        let dx = pair[1].x - pair[0].x;
        let dy = pair[1].y - pair[0].y;
        if (dx * dx + dy * dy).sqrt() > MAX_PLAUSIBLE_SPEED * dt_s {
            return Err(RejectReason::Jump { keyframe: i + 1 });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::{AnimMeta, AnimationKeyframe, Quality};
    use crate::layout::calculate_layout;

    fn animation_from(points: &[(f64, f32, f32)]) -> BallAnimation {
        let keyframes: Vec<_> = points
            .iter()
            .map(|&(time, x, y)| AnimationKeyframe {
                time,
                x,
                y,
                vx: 0.0,
                vy: 0.0,
            })
            .collect();
        BallAnimation {
            id: "q".into(),
            target_bucket: 0,
            duration: keyframes.last().map(|k| k.time).unwrap_or(0.0),
            keyframes,
            quality: Quality::Pending,
            metadata: AnimMeta {
                created: 0,
                row_count: 12,
                description: String::new(),
            },
        }
    }

    fn stats(bounces: u32, wall_hit: bool, duration_ms: f64) -> SimStats {
        SimStats {
            bounces,
            duration_ms,
            final_bucket: Some(0),
            keyframe_count: 2,
            wall_hit,
        }
    }

    fn zigzag(duration: f64) -> BallAnimation {
        // Gentle zig-zag down the middle of a 12-row board
        let steps = 30usize;
        let points: Vec<_> = (0..=steps)
            .map(|i| {
                let t = i as f64 / steps as f64;
                let x = 300.0 + if i % 2 == 0 { -12.0 } else { 12.0 };
                (t * duration, x, 60.0 + 540.0 * t as f32)
            })
            .collect();
        animation_from(&points)
    }

    #[test]
    fn test_approves_plausible_zigzag() {
        let layout = calculate_layout(12);
        let anim = zigzag(1800.0);
        let threshold = QualityThreshold::default();
        assert_eq!(
            evaluate(&anim, &stats(10, false, 1800.0), &threshold, 5000.0, &layout),
            Ok(())
        );
    }

    #[test]
    fn test_wall_contact_rejected() {
        let layout = calculate_layout(12);
        let anim = zigzag(1800.0);
        let threshold = QualityThreshold::default();
        assert_eq!(
            evaluate(&anim, &stats(10, true, 1800.0), &threshold, 5000.0, &layout),
            Err(RejectReason::WallContact)
        );
    }

    #[test]
    fn test_bounce_window() {
        let layout = calculate_layout(12);
        let anim = zigzag(1800.0);
        let threshold = QualityThreshold::default();
        assert!(matches!(
            evaluate(&anim, &stats(1, false, 1800.0), &threshold, 5000.0, &layout),
            Err(RejectReason::BounceCount { bounces: 1 })
        ));
        assert!(matches!(
            evaluate(&anim, &stats(41, false, 1800.0), &threshold, 5000.0, &layout),
            Err(RejectReason::BounceCount { bounces: 41 })
        ));
    }

    #[test]
    fn test_duration_window() {
        let layout = calculate_layout(12);
        let threshold = QualityThreshold::default();
        let quick = zigzag(800.0);
        assert!(matches!(
            evaluate(&quick, &stats(10, false, 800.0), &threshold, 5000.0, &layout),
            Err(RejectReason::Duration { .. })
        ));
        let slow = zigzag(6000.0);
        assert!(matches!(
            evaluate(&slow, &stats(10, false, 6000.0), &threshold, 5000.0, &layout),
            Err(RejectReason::Duration { .. })
        ));
    }

    #[test]
    fn test_envelope_rejects_wide_early_swing() {
        let layout = calculate_layout(12);
        let threshold = QualityThreshold::default();
        // 200px off-center just below the first peg row: outside the
        // early envelope without touching a wall
        let anim = animation_from(&[
            (0.0, 300.0, 60.0),
            (300.0, 100.0, 120.0),
            (600.0, 280.0, 300.0),
            (900.0, 320.0, 450.0),
            (1200.0, 290.0, 500.0),
            (1500.0, 310.0, 600.0),
        ]);
        assert!(matches!(
            evaluate(&anim, &stats(10, false, 1500.0), &threshold, 5000.0, &layout),
            Err(RejectReason::Envelope { .. })
        ));
    }

    #[test]
    fn test_monotonic_slide_rejected() {
        let layout = calculate_layout(12);
        let threshold = QualityThreshold::default();
        // Straight diagonal slide, zero reversals
        let points: Vec<_> = (0..=30)
            .map(|i| {
                let t = i as f64 / 30.0;
                (t * 1800.0, 300.0 - 60.0 * t as f32, 60.0 + 540.0 * t as f32)
            })
            .collect();
        let anim = animation_from(&points);
        assert!(matches!(
            evaluate(&anim, &stats(10, false, 1800.0), &threshold, 5000.0, &layout),
            Err(RejectReason::Reversals { found: 0, .. })
        ));
    }

    #[test]
    fn test_smoothness_gate_is_optional() {
        let layout = calculate_layout(12);
        // Teleporting keyframe: 150px sideways in 60ms, still inside the
        // envelope at that depth
        let mut anim = zigzag(1800.0);
        anim.keyframes[15].x = 450.0;

        let strict = QualityThreshold::default();
        assert!(matches!(
            evaluate(&anim, &stats(10, false, 1800.0), &strict, 5000.0, &layout),
            Err(RejectReason::Jump { .. })
        ));

        let lax = QualityThreshold {
            smoothness_check: false,
            ..QualityThreshold::default()
        };
        // Without the smoothness gate the same animation may pass the rest
        let verdict = evaluate(&anim, &stats(10, false, 1800.0), &lax, 5000.0, &layout);
        assert!(!matches!(verdict, Err(RejectReason::Jump { .. })));
    }

    #[test]
    fn test_required_reversals_scale() {
        assert_eq!(required_reversals(3), 2);
        assert_eq!(required_reversals(6), 2);
        assert_eq!(required_reversals(8), 3);
        assert_eq!(required_reversals(12), 4);
        assert_eq!(required_reversals(16), 6);
    }
}
