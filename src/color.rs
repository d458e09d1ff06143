//! Color transition: sample once at birth, then hold.

use crate::frame::RgbdFrame;
use crate::state::LifecycleCell;
use glam::{UVec2, Vec3};

/// Color for one cell this tick.
///
/// Samples the color half when the cell's current age is zero, i.e. on the
/// first tick after a respawn. Otherwise the previous color is carried.
pub fn advance_color(prev: Vec3, lifecycle: &LifecycleCell, frame: &RgbdFrame, texel: UVec2) -> Vec3 {
    if lifecycle.age == 0.0 {
        frame.color_at(texel.x, texel.y)
    } else {
        prev
    }
}
