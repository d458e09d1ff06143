//! Runtime tunables and the per-tick parameter snapshot.
//!
//! [`Tunables`] are the knobs a host UI exposes while the simulation runs.
//! Changes take effect on the next tick: every tick freezes the current
//! values into an immutable [`TickParams`] that all four passes read.

use crate::calibration::Intrinsics;
use crate::depth::{DepthFilter, DEFAULT_DEPTH_SCALE};
use crate::error::ConfigError;
use crate::integrator::NoiseField;
use crate::lifecycle::Lifecycle;
use glam::UVec2;

/// Values adjustable at any time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tunables {
    particle_size: f32,
    depth_range: [f32; 2],
    filter_radius: f32,
    filter_threshold: f32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            particle_size: 0.02,
            depth_range: [0.3, 2.8],
            filter_radius: 0.0,
            filter_threshold: 3.0,
        }
    }
}

impl Tunables {
    pub fn particle_size(&self) -> f32 {
        self.particle_size
    }

    /// Accepted depth `[min, max]` in meters.
    pub fn depth_range(&self) -> [f32; 2] {
        self.depth_range
    }

    pub fn filter_radius(&self) -> f32 {
        self.filter_radius
    }

    pub fn filter_threshold(&self) -> f32 {
        self.filter_threshold
    }

    pub fn set_particle_size(&mut self, size: f32) -> Result<(), ConfigError> {
        if size.is_nan() || size <= 0.0 {
            return Err(ConfigError::ParticleSize(size));
        }
        self.particle_size = size;
        Ok(())
    }

    pub fn set_depth_range(&mut self, min: f32, max: f32) -> Result<(), ConfigError> {
        if min.is_nan() || max.is_nan() || min >= max {
            return Err(ConfigError::DepthRange { min, max });
        }
        self.depth_range = [min, max];
        Ok(())
    }

    pub fn set_filter_radius(&mut self, radius: f32) -> Result<(), ConfigError> {
        if radius.is_nan() || radius < 0.0 {
            return Err(ConfigError::FilterRadius(radius));
        }
        self.filter_radius = radius;
        Ok(())
    }

    pub fn set_filter_threshold(&mut self, threshold: f32) -> Result<(), ConfigError> {
        if threshold.is_nan() || threshold < 0.0 {
            return Err(ConfigError::FilterThreshold(threshold));
        }
        self.filter_threshold = threshold;
        Ok(())
    }

    /// Builder form of [`set_particle_size`](Self::set_particle_size).
    pub fn with_particle_size(mut self, size: f32) -> Result<Self, ConfigError> {
        self.set_particle_size(size)?;
        Ok(self)
    }

    pub fn with_depth_range(mut self, min: f32, max: f32) -> Result<Self, ConfigError> {
        self.set_depth_range(min, max)?;
        Ok(self)
    }

    pub fn with_filter(mut self, radius: f32, threshold: f32) -> Result<Self, ConfigError> {
        self.set_filter_radius(radius)?;
        self.set_filter_threshold(threshold)?;
        Ok(self)
    }

    /// Re-check every value, for tunables assembled elsewhere.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut copy = Tunables::default();
        copy.set_particle_size(self.particle_size)?;
        copy.set_depth_range(self.depth_range[0], self.depth_range[1])?;
        copy.set_filter_radius(self.filter_radius)?;
        copy.set_filter_threshold(self.filter_threshold)?;
        Ok(())
    }
}

/// Everything one tick needs, frozen at the start of the tick.
#[derive(Clone, Copy, Debug)]
pub struct TickParams {
    pub delta_time: f32,
    /// Wall-clock time, seeds the lifetime hash.
    pub time: f32,
    pub tunables: Tunables,
    pub depth_scale: f32,
    pub lifetime: [f32; 2],
    pub noise: NoiseField,
    pub intrinsics: Intrinsics,
    /// Size of one half of the frame.
    pub half_resolution: UVec2,
}

impl TickParams {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        delta_time: f32,
        time: f32,
        tunables: Tunables,
        depth_scale: f32,
        lifecycle: &Lifecycle,
        noise: NoiseField,
        intrinsics: Intrinsics,
        half_resolution: UVec2,
    ) -> Self {
        let range = lifecycle.lifetime_bounds();
        Self {
            delta_time,
            time,
            tunables,
            depth_scale,
            lifetime: [range.start, range.end],
            noise,
            intrinsics,
            half_resolution,
        }
    }

    pub fn depth_filter(&self) -> DepthFilter {
        let [min_depth, max_depth] = self.tunables.depth_range();
        DepthFilter {
            depth_scale: self.depth_scale,
            min_depth,
            max_depth,
            radius: self.tunables.filter_radius(),
            threshold: self.tunables.filter_threshold(),
        }
    }
}

impl Default for TickParams {
    fn default() -> Self {
        Self::new(
            0.0,
            0.0,
            Tunables::default(),
            DEFAULT_DEPTH_SCALE,
            &Lifecycle::default(),
            NoiseField::default(),
            Intrinsics::new(1.0, 1.0, 0.0, 0.0),
            UVec2::ONE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let t = Tunables::default();
        assert_eq!(t.particle_size(), 0.02);
        assert_eq!(t.depth_range(), [0.3, 2.8]);
        assert_eq!(t.filter_radius(), 0.0);
        assert_eq!(t.filter_threshold(), 3.0);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut t = Tunables::default();
        assert_eq!(t.set_particle_size(0.0), Err(ConfigError::ParticleSize(0.0)));
        assert!(t.set_particle_size(f32::NAN).is_err());
        assert_eq!(
            t.set_depth_range(2.0, 2.0),
            Err(ConfigError::DepthRange { min: 2.0, max: 2.0 })
        );
        assert_eq!(t.set_filter_radius(-0.1), Err(ConfigError::FilterRadius(-0.1)));
        assert_eq!(t.set_filter_threshold(-1.0), Err(ConfigError::FilterThreshold(-1.0)));
        // rejected updates leave the old values in place
        assert_eq!(t, Tunables::default());
    }

    #[test]
    fn test_builders_chain() {
        let t = Tunables::default()
            .with_particle_size(0.03)
            .and_then(|t| t.with_depth_range(0.1, 2.8))
            .and_then(|t| t.with_filter(1.0, 0.2))
            .unwrap();
        assert_eq!(t.particle_size(), 0.03);
        assert_eq!(t.depth_range(), [0.1, 2.8]);
        assert_eq!(t.filter_radius(), 1.0);
        assert_eq!(t.filter_threshold(), 0.2);
    }

    #[test]
    fn test_depth_filter_from_params() {
        let params = TickParams::default();
        let f = params.depth_filter();
        assert_eq!(f.depth_scale, 3.0);
        assert_eq!((f.min_depth, f.max_depth), (0.3, 2.8));
        assert_eq!(f.offset(), 0);
    }
}
