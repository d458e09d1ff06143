//! Pure math helpers shared by the CPU passes.
//!
//! Every function here has a WGSL twin in [`crate::shader_utils`] so the CPU
//! engine and the GPU compute passes agree on the same formulas.
//!
//! # Available Functions
//!
//! ## Scalars
//! - [`remap`] - linear remap between two ranges
//! - [`clamp_wrapped`] - wrap a value into `[min, max)` (GLSL `mod` semantics)
//! - [`smoothstep`] - Hermite step between two edges
//!
//! ## Random & Hash
//! - [`hash`], [`hash2`], [`hash3`] - integer hashes
//! - [`rand`], [`rand_range`] - floats derived from a hash seed
//! - [`cell_seed`] - seed from a grid cell and wall-clock time
//!
//! ## Noise
//! - [`noise3`] - 3D simplex gradient noise in roughly `[-1, 1]`
//!
//! ## Color
//! - [`rgb_to_hue`] - hue of an RGB triple in `[0, 1)`
//! - [`hue_to_rgb`] - fully saturated RGB for a hue

use glam::{UVec2, UVec3, Vec2, Vec3, Vec3Swizzles, Vec4, Vec4Swizzles};

/// Linearly map `value` from `[low1, high1]` onto `[low2, high2]`.
///
/// No clamping is applied; values outside the source range extrapolate.
#[inline]
pub fn remap(value: f32, low1: f32, high1: f32, low2: f32, high2: f32) -> f32 {
    low2 + (value - low1) * (high2 - low2) / (high1 - low1)
}

/// Wrap `x` into `[min_val, max_val)`.
///
/// Uses floor-based modulo like GLSL `mod`, so negative inputs wrap
/// upward instead of mirroring.
#[inline]
pub fn clamp_wrapped(x: f32, min_val: f32, max_val: f32) -> f32 {
    let span = max_val - min_val;
    let t = x - min_val;
    t - span * (t / span).floor() + min_val
}

/// Hermite interpolation between `edge0` and `edge1`, clamped to `[0, 1]`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

// ============================================================================
// Hashing
// ============================================================================

/// Hash a u32 to a pseudo-random u32.
#[inline]
pub fn hash(n: u32) -> u32 {
    let mut x = n;
    x ^= x >> 17;
    x = x.wrapping_mul(0xed5a_d4bb);
    x ^= x >> 11;
    x = x.wrapping_mul(0xac4c_1b51);
    x ^= x >> 15;
    x = x.wrapping_mul(0x3184_8bab);
    x ^= x >> 14;
    x
}

/// Hash a 2D coordinate.
#[inline]
pub fn hash2(p: UVec2) -> u32 {
    hash(p.x.wrapping_add(hash(p.y)))
}

/// Hash a 3D coordinate.
#[inline]
pub fn hash3(p: UVec3) -> u32 {
    hash(p.x.wrapping_add(hash(p.y.wrapping_add(hash(p.z)))))
}

/// Random float in `[0, 1]` from a seed.
#[inline]
pub fn rand(seed: u32) -> f32 {
    (hash(seed) as f64 / u32::MAX as f64) as f32
}

/// Random float in `[min_val, max_val]` from a seed.
#[inline]
pub fn rand_range(seed: u32, min_val: f32, max_val: f32) -> f32 {
    min_val + rand(seed) * (max_val - min_val)
}

/// Seed decorrelated across cells and across time.
///
/// The time is hashed through its bit pattern, so two ticks at different
/// wall-clock times never share a seed for the same cell.
#[inline]
pub fn cell_seed(cell: UVec2, time: f32) -> u32 {
    hash3(UVec3::new(cell.x, cell.y, time.to_bits()))
}

// ============================================================================
// Simplex noise
// ============================================================================

fn mod289_3(x: Vec3) -> Vec3 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn mod289_4(x: Vec4) -> Vec4 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

fn permute4(x: Vec4) -> Vec4 {
    mod289_4((x * 34.0 + Vec4::ONE) * x)
}

fn taylor_inv_sqrt4(r: Vec4) -> Vec4 {
    Vec4::splat(1.792_842_9) - r * 0.853_734_7
}

// step(edge, x): 1.0 where x >= edge
fn step3(edge: Vec3, x: Vec3) -> Vec3 {
    Vec3::new(
        if x.x >= edge.x { 1.0 } else { 0.0 },
        if x.y >= edge.y { 1.0 } else { 0.0 },
        if x.z >= edge.z { 1.0 } else { 0.0 },
    )
}

fn step4(edge: Vec4, x: Vec4) -> Vec4 {
    Vec4::new(
        if x.x >= edge.x { 1.0 } else { 0.0 },
        if x.y >= edge.y { 1.0 } else { 0.0 },
        if x.z >= edge.z { 1.0 } else { 0.0 },
        if x.w >= edge.w { 1.0 } else { 0.0 },
    )
}

/// 3D simplex noise.
///
/// Output is continuous and stays roughly within `[-1, 1]`.
pub fn noise3(v: Vec3) -> f32 {
    let c = Vec2::new(1.0 / 6.0, 1.0 / 3.0);
    let d = Vec4::new(0.0, 0.5, 1.0, 2.0);

    // First corner
    let mut i = (v + Vec3::splat(v.dot(Vec3::splat(c.y)))).floor();
    let x0 = v - i + Vec3::splat(i.dot(Vec3::splat(c.x)));

    // Other corners
    let g = step3(x0.yzx(), x0);
    let l = Vec3::ONE - g;
    let i1 = g.min(l.zxy());
    let i2 = g.max(l.zxy());

    let x1 = x0 - i1 + Vec3::splat(c.x);
    let x2 = x0 - i2 + Vec3::splat(c.y);
    let x3 = x0 - Vec3::splat(d.y);

    // Permutations
    i = mod289_3(i);
    let p = permute4(
        permute4(
            permute4(Vec4::splat(i.z) + Vec4::new(0.0, i1.z, i2.z, 1.0))
                + Vec4::splat(i.y)
                + Vec4::new(0.0, i1.y, i2.y, 1.0),
        ) + Vec4::splat(i.x)
            + Vec4::new(0.0, i1.x, i2.x, 1.0),
    );

    // Gradients on a 7x7 grid
    let n_ = 0.142_857_15;
    let ns = d.wyz() * n_ - d.xzx();

    let j = p - (p * ns.z * ns.z).floor() * 49.0;

    let x_ = (j * ns.z).floor();
    let y_ = (j - x_ * 7.0).floor();

    let x = x_ * ns.x + Vec4::splat(ns.y);
    let y = y_ * ns.x + Vec4::splat(ns.y);
    let h = Vec4::ONE - x.abs() - y.abs();

    let b0 = Vec4::new(x.x, x.y, y.x, y.y);
    let b1 = Vec4::new(x.z, x.w, y.z, y.w);

    let s0 = b0.floor() * 2.0 + Vec4::ONE;
    let s1 = b1.floor() * 2.0 + Vec4::ONE;
    let sh = -step4(h, Vec4::ZERO);

    let a0 = b0.xzyw() + s0.xzyw() * sh.xxyy();
    let a1 = b1.xzyw() + s1.xzyw() * sh.zzww();

    let mut p0 = Vec3::new(a0.x, a0.y, h.x);
    let mut p1 = Vec3::new(a0.z, a0.w, h.y);
    let mut p2 = Vec3::new(a1.x, a1.y, h.z);
    let mut p3 = Vec3::new(a1.z, a1.w, h.w);

    let norm = taylor_inv_sqrt4(Vec4::new(p0.dot(p0), p1.dot(p1), p2.dot(p2), p3.dot(p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    let mut m = (Vec4::splat(0.6) - Vec4::new(x0.dot(x0), x1.dot(x1), x2.dot(x2), x3.dot(x3)))
        .max(Vec4::ZERO);
    m *= m;
    42.0 * (m * m).dot(Vec4::new(p0.dot(x0), p1.dot(x1), p2.dot(x2), p3.dot(x3)))
}

// ============================================================================
// Color
// ============================================================================

/// Hue of an RGB color, in `[0, 1)`.
///
/// Gray inputs (no chroma) return 0.
pub fn rgb_to_hue(rgb: Vec3) -> f32 {
    let cmax = rgb.max_element();
    let cmin = rgb.min_element();
    let delta = cmax - cmin;

    if delta <= 0.0001 {
        return 0.0;
    }

    let mut h = if cmax == rgb.x {
        ((rgb.y - rgb.z) / delta) % 6.0
    } else if cmax == rgb.y {
        (rgb.z - rgb.x) / delta + 2.0
    } else {
        (rgb.x - rgb.y) / delta + 4.0
    };
    h /= 6.0;
    if h < 0.0 {
        h += 1.0;
    }
    h
}

/// Fully saturated, full-value RGB for a hue in `[0, 1)`.
pub fn hue_to_rgb(hue: f32) -> Vec3 {
    let hp = clamp_wrapped(hue, 0.0, 1.0) * 6.0;
    let x = 1.0 - ((hp % 2.0) - 1.0).abs();

    if hp < 1.0 {
        Vec3::new(1.0, x, 0.0)
    } else if hp < 2.0 {
        Vec3::new(x, 1.0, 0.0)
    } else if hp < 3.0 {
        Vec3::new(0.0, 1.0, x)
    } else if hp < 4.0 {
        Vec3::new(0.0, x, 1.0)
    } else if hp < 5.0 {
        Vec3::new(x, 0.0, 1.0)
    } else {
        Vec3::new(1.0, 0.0, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap() {
        assert_eq!(remap(0.25, 0.0, 0.5, 1.0, 0.0), 0.5);
        assert_eq!(remap(0.0, 0.0, 0.5, 1.0, 0.0), 1.0);
        assert_eq!(remap(0.5, 0.0, 0.5, 1.0, 0.0), 0.0);
    }

    #[test]
    fn test_clamp_wrapped() {
        assert!((clamp_wrapped(1.25, 0.0, 1.0) - 0.25).abs() < 1e-6);
        assert!((clamp_wrapped(-0.25, 0.0, 1.0) - 0.75).abs() < 1e-6);
        assert!((clamp_wrapped(5.0, 2.0, 4.0) - 3.0).abs() < 1e-6);
        assert!((clamp_wrapped(0.5, 0.0, 1.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_smoothstep_edges() {
        assert_eq!(smoothstep(0.0, 0.2, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 0.2, 0.0), 0.0);
        assert_eq!(smoothstep(0.0, 0.2, 0.2), 1.0);
        assert!((smoothstep(0.0, 0.2, 0.1) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash(42), hash(42));
        assert_ne!(hash(42), hash(43));
        assert_ne!(hash2(UVec2::new(1, 2)), hash2(UVec2::new(2, 1)));
    }

    #[test]
    fn test_cell_seed_varies_with_time_and_cell() {
        let a = cell_seed(UVec2::new(3, 4), 1.0);
        let b = cell_seed(UVec2::new(3, 4), 1.016);
        let c = cell_seed(UVec2::new(4, 3), 1.0);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_rand_range_bounds() {
        for seed in 0..1000 {
            let v = rand_range(seed, 0.1, 2.0);
            assert!((0.1..=2.0).contains(&v));
        }
    }

    #[test]
    fn test_noise_is_bounded_and_continuous() {
        let mut prev = noise3(Vec3::ZERO);
        for i in 1..500 {
            let p = Vec3::new(i as f32 * 0.01, 0.3, -0.7);
            let n = noise3(p);
            assert!(n.is_finite());
            assert!(n.abs() <= 1.1, "noise out of range: {n}");
            assert!((n - prev).abs() < 0.2, "noise jumped at {p}");
            prev = n;
        }
    }

    #[test]
    fn test_noise_is_not_constant() {
        let a = noise3(Vec3::new(0.1, 0.2, 0.3));
        let b = noise3(Vec3::new(3.7, -1.2, 8.9));
        assert_ne!(a, b);
    }

    #[test]
    fn test_primary_hues() {
        assert!((rgb_to_hue(Vec3::new(1.0, 0.0, 0.0)) - 0.0).abs() < 1e-6);
        assert!((rgb_to_hue(Vec3::new(0.0, 1.0, 0.0)) - 1.0 / 3.0).abs() < 1e-6);
        assert!((rgb_to_hue(Vec3::new(0.0, 0.0, 1.0)) - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(rgb_to_hue(Vec3::splat(0.5)), 0.0);
    }

    #[test]
    fn test_hue_round_trip() {
        for i in 0..200 {
            let h = i as f32 / 200.0;
            let back = rgb_to_hue(hue_to_rgb(h));
            assert!((back - h).abs() < 1e-5, "hue {h} came back as {back}");
        }
    }
}
