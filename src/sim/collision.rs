//! Circle collision detection and response
//!
//! Pegs are static circles, the ball is a moving circle; contacts reflect the
//! velocity about the contact normal with damping and a seeded perturbation
//! so no two bounces look machine-identical.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::consts::*;
use crate::layout::{BoardLayout, Peg};

/// A ball/peg contact
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// Unit normal pointing from the peg center toward the ball center.
    /// Zero when the centers coincide (degenerate contact).
    pub normal: Vec2,
    pub penetration: f32,
}

/// Circle-circle test between the ball and one peg
pub fn ball_peg_contact(ball_pos: Vec2, ball_radius: f32, peg: &Peg) -> Option<Contact> {
    let delta = ball_pos - peg.pos;
    let dist_sq = delta.length_squared();
    let contact_dist = ball_radius + peg.radius;
    if dist_sq >= contact_dist * contact_dist {
        return None;
    }
    let dist = dist_sq.sqrt();
    if dist < 1e-4 {
        // Ball concentric with the peg; caller resolves along a seeded angle
        return Some(Contact {
            normal: Vec2::ZERO,
            penetration: contact_dist,
        });
    }
    Some(Contact {
        normal: delta / dist,
        penetration: contact_dist - dist,
    })
}

/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Compute the post-bounce velocity for a peg contact
///
/// Reflects with damping, adds a seeded perturbation, then enforces the
/// velocity floor directed away from the peg so the ball cannot stall on it.
/// Returns the velocity and the normal actually used (degenerate contacts
/// get a random one).
pub fn resolve_peg_bounce(velocity: Vec2, contact: &Contact, rng: &mut Pcg32) -> (Vec2, Vec2) {
    let normal = if contact.normal.length_squared() < 0.5 {
        let angle: f32 = rng.random_range(0.0..std::f32::consts::TAU);
        Vec2::new(angle.cos(), angle.sin())
    } else {
        contact.normal
    };

    let mut out = reflect(velocity, normal) * BOUNCE_DAMPING;
    out.x += rng.random_range(-BOUNCE_JITTER..=BOUNCE_JITTER);
    out.y += rng.random_range(-BOUNCE_JITTER..=BOUNCE_JITTER);

    // Velocity floor, directed away from the peg
    let away = out.dot(normal);
    if away < MIN_VELOCITY {
        out += normal * (MIN_VELOCITY - away);
    }
    (out, normal)
}

/// Clamp the ball inside the board margins, reflecting with extra damping
///
/// Returns true when a wall was touched. Wall contact is never counted as a
/// bounce; the caller records it in the separate `wall_hit` stat.
pub fn resolve_wall(pos: &mut Vec2, vel: &mut Vec2, layout: &BoardLayout) -> bool {
    let left = layout.board_margin + layout.ball_radius;
    let right = layout.canvas_width - layout.board_margin - layout.ball_radius;
    let mut hit = false;
    if pos.x < left {
        pos.x = left;
        vel.x = vel.x.abs() * WALL_DAMPING;
        hit = true;
    } else if pos.x > right {
        pos.x = right;
        vel.x = -vel.x.abs() * WALL_DAMPING;
        hit = true;
    }
    hit
}
