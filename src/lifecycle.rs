//! Particle lifecycle management.
//!
//! Every cell cycles through the same states:
//!
//! ```text
//! Respawning -> Alive -> (age reaches max_age) -> Respawning -> ...
//! ```
//!
//! # Lifecycle Fields
//!
//! | Field | Type | Description |
//! |-------|------|-------------|
//! | `age` | `f32` | Time since the last respawn (seconds) |
//! | `max_age` | `f32` | Lifetime drawn at respawn (seconds) |
//! | `respawn` | `bool` | Re-seed this cell from depth this tick |
//!
//! # Transition
//!
//! Each tick, first match wins:
//!
//! 1. previous position flagged invalid -> `respawn = true`
//! 2. previous `respawn` -> `age = 0`, new `max_age`, `respawn = false`
//! 3. `age >= max_age` -> `respawn = true`
//! 4. otherwise `age += dt`, clamped to `max_age`
//!
//! `max_age` is drawn from a hash of the cell coordinate and the wall-clock
//! time, so the same cell never repeats its lifetime sequence.
//!
//! # Presets
//!
//! ```ignore
//! Simulation::new().with_lifecycle(Lifecycle::flicker())   // 0.1..2.0 s
//! Simulation::new().with_lifecycle(Lifecycle::steady())    // 4 s each
//! Simulation::new().with_lifecycle(Lifecycle::new().lifetime_range(0.5..1.5))
//! ```

use crate::error::ConfigError;
use crate::math::{cell_seed, rand_range};
use crate::params::TickParams;
use crate::state::{AuxFlag, LifecycleCell};
use glam::UVec2;
use std::ops::Range;

/// Lifecycle configuration builder.
///
/// # Example
///
/// ```ignore
/// let lifecycle = Lifecycle::new().lifetime_range(0.2..1.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Lifecycle {
    /// Fixed lifetime in seconds (if set).
    lifetime_fixed: Option<f32>,
    /// Random lifetime range (if set, overrides fixed).
    lifetime_range: Option<Range<f32>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::flicker()
    }
}

impl Lifecycle {
    /// Create a lifecycle with the default lifetime range.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // PRESETS
    // =========================================================================

    /// Short, widely spread lifetimes: the cloud constantly shimmers.
    pub fn flicker() -> Self {
        Self {
            lifetime_fixed: None,
            lifetime_range: Some(0.1..2.0),
        }
    }

    /// Every particle lives four seconds.
    ///
    /// Particles born in the same tick also die together, which makes the
    /// cloud pulse.
    pub fn steady() -> Self {
        Self {
            lifetime_fixed: Some(4.0),
            lifetime_range: None,
        }
    }

    // =========================================================================
    // BUILDER METHODS
    // =========================================================================

    /// Fixed lifetime for every particle.
    pub fn lifetime(mut self, seconds: f32) -> Self {
        self.lifetime_fixed = Some(seconds);
        self.lifetime_range = None;
        self
    }

    /// Lifetime drawn uniformly from a range at every respawn.
    pub fn lifetime_range(mut self, range: Range<f32>) -> Self {
        self.lifetime_range = Some(range);
        self
    }

    /// Effective lifetime bounds. A fixed lifetime is a zero-width range.
    pub fn lifetime_bounds(&self) -> Range<f32> {
        match (&self.lifetime_range, self.lifetime_fixed) {
            (Some(r), _) => r.clone(),
            (None, Some(t)) => t..t,
            (None, None) => 0.1..2.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = self.lifetime_bounds();
        if r.start.is_nan() || r.end.is_nan() || r.start <= 0.0 || r.start > r.end {
            return Err(ConfigError::Lifetime {
                start: r.start,
                end: r.end,
            });
        }
        Ok(())
    }
}

/// Lifetime for a respawning cell.
#[inline]
pub fn draw_max_age(cell: UVec2, time: f32, lifetime: [f32; 2]) -> f32 {
    if lifetime[0] == lifetime[1] {
        return lifetime[0];
    }
    rand_range(cell_seed(cell, time), lifetime[0], lifetime[1])
}

/// Lifecycle transition for one cell.
///
/// Reads the previous lifecycle and the previous position flag only.
pub fn advance(prev: &LifecycleCell, prev_flag: AuxFlag, cell: UVec2, params: &TickParams) -> LifecycleCell {
    if prev_flag == AuxFlag::InvalidDepth {
        return LifecycleCell {
            respawn: true,
            ..*prev
        };
    }

    if prev.respawn {
        return LifecycleCell {
            age: 0.0,
            max_age: draw_max_age(cell, params.time, params.lifetime),
            respawn: false,
        };
    }

    if prev.age >= prev.max_age {
        return LifecycleCell {
            respawn: true,
            ..*prev
        };
    }

    LifecycleCell {
        age: (prev.age + params.delta_time).min(prev.max_age),
        ..*prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(dt: f32, time: f32, lifetime: [f32; 2]) -> TickParams {
        TickParams {
            delta_time: dt,
            time,
            lifetime,
            ..TickParams::default()
        }
    }

    #[test]
    fn test_presets() {
        assert_eq!(Lifecycle::flicker().lifetime_bounds(), 0.1..2.0);
        assert_eq!(Lifecycle::steady().lifetime_bounds(), 4.0..4.0);
        assert_eq!(Lifecycle::new(), Lifecycle::flicker());
    }

    #[test]
    fn test_builder_overrides() {
        let l = Lifecycle::steady().lifetime_range(0.5..1.5);
        assert_eq!(l.lifetime_bounds(), 0.5..1.5);

        let l = Lifecycle::flicker().lifetime(2.5);
        assert_eq!(l.lifetime_bounds(), 2.5..2.5);
    }

    #[test]
    fn test_validate() {
        assert!(Lifecycle::flicker().validate().is_ok());
        assert!(Lifecycle::new().lifetime(1.0).validate().is_ok());
        assert!(Lifecycle::new().lifetime(0.0).validate().is_err());
        assert_eq!(
            Lifecycle::new().lifetime_range(2.0..1.0).validate(),
            Err(ConfigError::Lifetime { start: 2.0, end: 1.0 })
        );
    }

    #[test]
    fn test_draw_within_range() {
        for i in 0..500 {
            let cell = UVec2::new(i % 37, i / 37);
            let m = draw_max_age(cell, i as f32 * 0.016, [0.1, 2.0]);
            assert!((0.1..=2.0).contains(&m), "{m}");
        }
        assert_eq!(draw_max_age(UVec2::ZERO, 3.0, [1.0, 1.0]), 1.0);
    }

    #[test]
    fn test_fixed_lifetime_sequence() {
        // N = 2, every cell starts respawning, max_age 1.0, dt 0.5
        let p = params(0.5, 0.0, [1.0, 1.0]);
        let mut cells = [LifecycleCell::spawning(); 4];

        let step = |cells: &mut [LifecycleCell; 4], tick: u32| {
            for (i, c) in cells.iter_mut().enumerate() {
                let cell = UVec2::new(i as u32 % 2, i as u32 / 2);
                let p = TickParams { time: tick as f32 * 0.5, ..p };
                *c = advance(c, AuxFlag::None, cell, &p);
            }
        };

        step(&mut cells, 1);
        assert!(cells.iter().all(|c| c.age == 0.0 && !c.respawn && c.max_age == 1.0));
        step(&mut cells, 2);
        assert!(cells.iter().all(|c| c.age == 0.5 && !c.respawn));
        step(&mut cells, 3);
        assert!(cells.iter().all(|c| c.age == 1.0 && !c.respawn));
        step(&mut cells, 4);
        assert!(cells.iter().all(|c| c.respawn));
        step(&mut cells, 5);
        assert!(cells.iter().all(|c| c.age == 0.0 && !c.respawn));
    }

    #[test]
    fn test_invalid_depth_forces_respawn() {
        let p = params(0.1, 1.0, [1.0, 1.0]);
        let alive = LifecycleCell {
            age: 0.3,
            max_age: 1.0,
            respawn: false,
        };
        let next = advance(&alive, AuxFlag::InvalidDepth, UVec2::ZERO, &p);
        assert!(next.respawn);
        assert_eq!(next.age, 0.3);

        // still invalid: stays respawning instead of resetting age
        let again = advance(&next, AuxFlag::InvalidDepth, UVec2::ZERO, &p);
        assert!(again.respawn);
    }

    #[test]
    fn test_age_clamped_to_max_age() {
        let p = params(0.7, 1.0, [1.0, 1.0]);
        let c = LifecycleCell {
            age: 0.6,
            max_age: 1.0,
            respawn: false,
        };
        let next = advance(&c, AuxFlag::None, UVec2::ZERO, &p);
        assert_eq!(next.age, 1.0);
        assert!(!next.respawn);
        assert!(advance(&next, AuxFlag::None, UVec2::ZERO, &p).respawn);
    }

    #[test]
    fn test_lifetimes_vary_across_cells_and_time() {
        let p = params(0.016, 12.5, [0.1, 2.0]);
        let a = advance(&LifecycleCell::spawning(), AuxFlag::None, UVec2::new(3, 4), &p);
        let b = advance(&LifecycleCell::spawning(), AuxFlag::None, UVec2::new(4, 3), &p);
        let later = TickParams { time: 12.516, ..p };
        let c = advance(&LifecycleCell::spawning(), AuxFlag::None, UVec2::new(3, 4), &later);
        assert_ne!(a.max_age, b.max_age);
        assert_ne!(a.max_age, c.max_age);
    }
}
