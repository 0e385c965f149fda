//! Board geometry derived from a row count
//!
//! Everything that positions a peg, a bucket or a wall comes from here.
//! The simulator, the quality gates and any live renderer must all call
//! [`calculate_layout`] / [`generate_pegs`] rather than duplicate formulas,
//! or an animation generated under one geometry lands in the wrong bucket
//! under another.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Derived board geometry for one row count. Never persisted; recomputing it
/// for the same row count always yields identical values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoardLayout {
    pub row_count: u32,
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub board_margin: f32,
    pub peg_radius: f32,
    pub ball_radius: f32,
    /// Vertical spacing between peg rows
    pub row_height: f32,
    pub bucket_count: u32,
    pub bucket_width: f32,
    /// Y where the ball is released
    pub start_y: f32,
    /// Y of the bucket row; reaching it terminates a drop
    pub bucket_y: f32,
}

/// A fixed circular obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peg {
    pub pos: Vec2,
    pub radius: f32,
}

/// Compute the board layout for a row count
pub fn calculate_layout(row_count: u32) -> BoardLayout {
    let bucket_count = row_count + 1;
    let playfield = CANVAS_WIDTH - 2.0 * BOARD_MARGIN;
    BoardLayout {
        row_count,
        canvas_width: CANVAS_WIDTH,
        canvas_height: CANVAS_HEIGHT,
        board_margin: BOARD_MARGIN,
        peg_radius: PEG_RADIUS,
        ball_radius: BALL_RADIUS,
        row_height: (BUCKET_Y - START_Y) / (row_count + 1) as f32,
        bucket_count,
        bucket_width: playfield / bucket_count as f32,
        start_y: START_Y,
        bucket_y: BUCKET_Y,
    }
}

/// Generate the triangular peg field for a layout
///
/// Row `r` (0-based) carries `r + 3` pegs, centered on the canvas midline
/// with horizontal spacing of one bucket width, so the bottom row spans the
/// playfield exactly with pegs sitting on bucket boundaries.
pub fn generate_pegs(layout: &BoardLayout) -> Vec<Peg> {
    let center_x = layout.canvas_width / 2.0;
    let mut pegs = Vec::new();
    for row in 0..layout.row_count {
        let count = row + 3;
        let y = layout.start_y + (row + 1) as f32 * layout.row_height;
        for i in 0..count {
            let offset = i as f32 - (count - 1) as f32 / 2.0;
            pegs.push(Peg {
                pos: Vec2::new(center_x + offset * layout.bucket_width, y),
                radius: layout.peg_radius,
            });
        }
    }
    pegs
}

/// The one bucket formula: which bucket an x coordinate falls into
#[inline]
pub fn bucket_for_x(layout: &BoardLayout, x: f32) -> u32 {
    let raw = ((x - layout.board_margin) / layout.bucket_width).floor();
    (raw as i64).clamp(0, layout.bucket_count as i64 - 1) as u32
}

/// Half-width of the expanding pyramidal envelope at vertical progress
/// `t` in [0, 1] (0 = first peg row, 1 = bucket row)
///
/// Interpolates from the first peg row's half-width out to the full playfield
/// half-width; a plausible trajectory stays within this band plus tolerance.
pub fn envelope_half_width(layout: &BoardLayout, t: f32) -> f32 {
    let first_row_half = layout.bucket_width; // (3 - 1) / 2 pegs worth
    let full_half = (layout.canvas_width - 2.0 * layout.board_margin) / 2.0;
    crate::lerp(first_row_half, full_half, t.clamp(0.0, 1.0))
}
