//! Seeded, fixed-step ball drop integration
//!
//! One call simulates one ball from release to the bucket row (or timeout)
//! and reports the outcome as a value. The requested bucket only influences
//! the launch bias; whether the ball actually lands there is up to the
//! physics, which is why the library rejection-samples over seeds.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::collision::{ball_peg_contact, resolve_peg_bounce, resolve_wall};
use super::state::{MissReason, SimStats, SimulationConfig, SimulationResult};
use crate::anim::{AnimMeta, AnimationKeyframe, BallAnimation, Quality};
use crate::consts::*;
use crate::layout::{BoardLayout, Peg, bucket_for_x};

/// Simulate one seeded drop aimed at `target_bucket`
///
/// Keyframes are sampled once per `1000 / frame_rate` ms frame; each frame is
/// integrated in [`SIM_SUBSTEPS`] equal substeps for stability. Identical
/// (config, layout, target, seed) inputs produce bit-identical keyframes.
pub fn simulate_ball_drop(
    config: &SimulationConfig,
    layout: &BoardLayout,
    pegs: &[Peg],
    target_bucket: u32,
    seed: u64,
) -> SimulationResult {
    let mut rng = Pcg32::seed_from_u64(seed);

    let frame_ms = config.frame_ms();
    let sub_ms = frame_ms as f32 / SIM_SUBSTEPS as f32;
    let sub_dt = sub_ms / 1000.0;
    // Exponential friction decay scaled to the substep size
    let friction = FRICTION.powf(sub_ms / TARGET_FRAME_MS);

    // Launch: top-center, biased toward the target so extreme buckets stay
    // reachable, plus seeded jitter so the bias alone never decides anything
    let spread = (target_bucket as f32 / (layout.bucket_count - 1).max(1) as f32) - 0.5;
    let mut pos = Vec2::new(layout.canvas_width / 2.0, layout.start_y);
    let mut vel = Vec2::new(
        spread * LAUNCH_BIAS + rng.random_range(-LAUNCH_JITTER..=LAUNCH_JITTER),
        0.0,
    );

    let mut keyframes = vec![AnimationKeyframe {
        time: 0.0,
        x: pos.x,
        y: pos.y,
        vx: vel.x,
        vy: vel.y,
    }];

    let mut bounces: u32 = 0;
    let mut wall_hit = false;
    let mut last_peg: Option<usize> = None;
    let mut cooldown: u32 = 0;

    let mut frame: u64 = 0;
    loop {
        let frame_start = frame as f64 * frame_ms;
        if frame_start + frame_ms > config.max_duration_ms {
            let stats = SimStats {
                bounces,
                duration_ms: frame_start,
                final_bucket: None,
                keyframe_count: keyframes.len(),
                wall_hit,
            };
            return SimulationResult::Missed {
                reason: MissReason::Timeout,
                stats,
            };
        }

        for sub in 0..SIM_SUBSTEPS {
            vel.y += GRAVITY * sub_dt;
            pos += vel * sub_dt;
            vel *= friction;

            // Speed floor prevents stalling against pegs
            let speed = vel.length();
            if speed > 0.0 && speed < MIN_VELOCITY {
                vel *= MIN_VELOCITY / speed;
            }

            if resolve_wall(&mut pos, &mut vel, layout) {
                wall_hit = true;
            }

            cooldown = cooldown.saturating_sub(1);
            let (lo, hi) = candidate_pegs(layout, pegs.len(), pos.y);
            for (i, peg) in pegs[lo..hi].iter().enumerate().map(|(i, p)| (i + lo, p)) {
                // Skip the immediately-prior peg while it is still "hot" or
                // the ball has not cleared it; prevents double-resolution
                if last_peg == Some(i) {
                    let release = peg.radius + layout.ball_radius + 2.0;
                    if cooldown > 0 || pos.distance_squared(peg.pos) < release * release {
                        continue;
                    }
                }
                if let Some(contact) = ball_peg_contact(pos, layout.ball_radius, peg) {
                    let (new_vel, normal) = resolve_peg_bounce(vel, &contact, &mut rng);
                    vel = new_vel;
                    pos += normal * contact.penetration;
                    bounces += 1;
                    last_peg = Some(i);
                    cooldown = BOUNCE_COOLDOWN;
                    break;
                }
            }

            if pos.y >= layout.bucket_y {
                pos.y = layout.bucket_y;
                let time = frame_start + (sub + 1) as f64 / SIM_SUBSTEPS as f64 * frame_ms;
                keyframes.push(AnimationKeyframe {
                    time,
                    x: pos.x,
                    y: pos.y,
                    vx: vel.x,
                    vy: vel.y,
                });
                return finish(config, layout, target_bucket, seed, keyframes, bounces, wall_hit);
            }
        }

        frame += 1;
        keyframes.push(AnimationKeyframe {
            time: frame as f64 * frame_ms,
            x: pos.x,
            y: pos.y,
            vx: vel.x,
            vy: vel.y,
        });
    }
}

/// Index range of pegs whose rows are close enough to `y` to touch the ball
///
/// Pegs are generated row by row (row `r` starts at offset `r(r+5)/2` and
/// holds `r + 3` pegs), so proximity reduces to a contiguous slice. Purely a
/// scan reduction; which pegs can collide is unchanged.
fn candidate_pegs(layout: &BoardLayout, peg_count: usize, y: f32) -> (usize, usize) {
    let reach = layout.ball_radius + layout.peg_radius + 4.0;
    let nearest = ((y - layout.start_y) / layout.row_height).round() as i64 - 1;
    let span = ((reach / layout.row_height).ceil() as i64).max(1);
    let first = (nearest - span).clamp(0, layout.row_count as i64) as u64;
    let last = (nearest + span).clamp(-1, layout.row_count as i64 - 1);
    if last < first as i64 {
        return (0, 0);
    }
    let offset = |r: u64| (r * (r + 5) / 2) as usize;
    let lo = offset(first).min(peg_count);
    let hi = offset(last as u64 + 1).min(peg_count);
    (lo, hi)
}

fn finish(
    config: &SimulationConfig,
    layout: &BoardLayout,
    target_bucket: u32,
    seed: u64,
    keyframes: Vec<AnimationKeyframe>,
    bounces: u32,
    wall_hit: bool,
) -> SimulationResult {
    let last = keyframes.last().expect("at least the launch keyframe");
    let landed = bucket_for_x(layout, last.x);
    let stats = SimStats {
        bounces,
        duration_ms: last.time,
        final_bucket: Some(landed),
        keyframe_count: keyframes.len(),
        wall_hit,
    };

    if landed != target_bucket {
        return SimulationResult::Missed {
            reason: MissReason::WrongBucket { landed },
            stats,
        };
    }

    let animation = BallAnimation {
        id: format!("r{}b{}-{:016x}", config.row_count, target_bucket, seed),
        target_bucket,
        duration: last.time,
        keyframes,
        quality: Quality::Pending,
        metadata: AnimMeta {
            created: chrono::Utc::now().timestamp_millis() as u64,
            row_count: config.row_count,
            description: format!(
                "{} rows, bucket {}, {} bounces",
                config.row_count, target_bucket, bounces
            ),
        },
    };
    SimulationResult::Landed { animation, stats }
}
