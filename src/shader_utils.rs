//! Built-in WGSL utility functions for the compute and render shaders.
//!
//! These are the GPU twins of [`crate::math`]. They are prepended to every
//! generated shader by [`all_utils_wgsl`].
//!
//! # Available Functions
//!
//! ## Math
//! - `remap(value, low1, high1, low2, high2) -> f32`
//! - `clamp_wrapped(x, min_val, max_val) -> f32`
//!
//! ## Random & Hash
//! - `hash(n: u32) -> u32`, `hash2(p: vec2<u32>) -> u32`, `hash3(p: vec3<u32>) -> u32`
//! - `rand(seed: u32) -> f32`, `rand_range(seed: u32, min: f32, max: f32) -> f32`
//! - `cell_seed(cell: vec2<u32>, time: f32) -> u32`
//!
//! ## Noise
//! - `noise3(p: vec3<f32>) -> f32` - 3D simplex noise in [-1, 1]
//!
//! ## Color
//! - `rgb_to_hue(rgb: vec3<f32>) -> f32`

/// WGSL code for scalar remapping helpers.
pub const MATH_WGSL: &str = r#"
fn remap(value: f32, low1: f32, high1: f32, low2: f32, high2: f32) -> f32 {
    return low2 + (value - low1) * (high2 - low2) / (high1 - low1);
}

// Floor-based modulo, matches GLSL mod()
fn clamp_wrapped(x: f32, min_val: f32, max_val: f32) -> f32 {
    let span = max_val - min_val;
    let t = x - min_val;
    return t - span * floor(t / span) + min_val;
}
"#;

/// WGSL code for random/hash functions.
pub const RANDOM_WGSL: &str = r#"
// Hash functions for pseudo-random number generation
fn hash(n: u32) -> u32 {
    var x = n;
    x = x ^ (x >> 17u);
    x = x * 0xed5ad4bbu;
    x = x ^ (x >> 11u);
    x = x * 0xac4c1b51u;
    x = x ^ (x >> 15u);
    x = x * 0x31848babu;
    x = x ^ (x >> 14u);
    return x;
}

fn hash2(p: vec2<u32>) -> u32 {
    return hash(p.x + hash(p.y));
}

fn hash3(p: vec3<u32>) -> u32 {
    return hash(p.x + hash(p.y + hash(p.z)));
}

// Random float in [0, 1]
fn rand(seed: u32) -> f32 {
    return f32(hash(seed)) / 4294967295.0;
}

fn rand_range(seed: u32, min_val: f32, max_val: f32) -> f32 {
    return min_val + rand(seed) * (max_val - min_val);
}

// Decorrelated per cell and per tick
fn cell_seed(cell: vec2<u32>, time: f32) -> u32 {
    return hash3(vec3<u32>(cell.x, cell.y, bitcast<u32>(time)));
}
"#;

/// WGSL code for the gradient noise used by the velocity field.
pub const NOISE_WGSL: &str = r#"
fn mod289_3(x: vec3<f32>) -> vec3<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn mod289_4(x: vec4<f32>) -> vec4<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn permute4(x: vec4<f32>) -> vec4<f32> {
    return mod289_4(((x * 34.0) + 1.0) * x);
}

fn taylor_inv_sqrt4(r: vec4<f32>) -> vec4<f32> {
    return 1.79284291400159 - 0.85373472095314 * r;
}

// 3D simplex noise
fn noise3(v: vec3<f32>) -> f32 {
    let C = vec2<f32>(1.0 / 6.0, 1.0 / 3.0);
    let D = vec4<f32>(0.0, 0.5, 1.0, 2.0);

    var i = floor(v + dot(v, vec3(C.y)));
    let x0 = v - i + dot(i, vec3(C.x));

    let g = step(x0.yzx, x0.xyz);
    let l = 1.0 - g;
    let i1 = min(g.xyz, l.zxy);
    let i2 = max(g.xyz, l.zxy);

    let x1 = x0 - i1 + C.x;
    let x2 = x0 - i2 + C.y;
    let x3 = x0 - D.yyy;

    i = mod289_3(i);
    let p = permute4(permute4(permute4(
        i.z + vec4<f32>(0.0, i1.z, i2.z, 1.0))
      + i.y + vec4<f32>(0.0, i1.y, i2.y, 1.0))
      + i.x + vec4<f32>(0.0, i1.x, i2.x, 1.0));

    let n_ = 0.142857142857;
    let ns = n_ * D.wyz - D.xzx;

    let j = p - 49.0 * floor(p * ns.z * ns.z);

    let x_ = floor(j * ns.z);
    let y_ = floor(j - 7.0 * x_);

    let x = x_ * ns.x + ns.yyyy;
    let y = y_ * ns.x + ns.yyyy;
    let h = 1.0 - abs(x) - abs(y);

    let b0 = vec4<f32>(x.xy, y.xy);
    let b1 = vec4<f32>(x.zw, y.zw);

    let s0 = floor(b0) * 2.0 + 1.0;
    let s1 = floor(b1) * 2.0 + 1.0;
    let sh = -step(h, vec4<f32>(0.0));

    let a0 = b0.xzyw + s0.xzyw * sh.xxyy;
    let a1 = b1.xzyw + s1.xzyw * sh.zzww;

    var p0 = vec3<f32>(a0.xy, h.x);
    var p1 = vec3<f32>(a0.zw, h.y);
    var p2 = vec3<f32>(a1.xy, h.z);
    var p3 = vec3<f32>(a1.zw, h.w);

    let norm = taylor_inv_sqrt4(vec4<f32>(dot(p0, p0), dot(p1, p1), dot(p2, p2), dot(p3, p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    var m = max(0.6 - vec4<f32>(dot(x0, x0), dot(x1, x1), dot(x2, x2), dot(x3, x3)), vec4<f32>(0.0));
    m = m * m;
    return 42.0 * dot(m * m, vec4<f32>(dot(p0, x0), dot(p1, x1), dot(p2, x2), dot(p3, x3)));
}
"#;

/// WGSL code for the hue decoder.
pub const COLOR_WGSL: &str = r#"
// Hue of an RGB color in [0, 1); gray returns 0
fn rgb_to_hue(rgb: vec3<f32>) -> f32 {
    let cmax = max(max(rgb.r, rgb.g), rgb.b);
    let cmin = min(min(rgb.r, rgb.g), rgb.b);
    let delta = cmax - cmin;

    var h = 0.0;
    if delta > 0.0001 {
        if cmax == rgb.r {
            h = ((rgb.g - rgb.b) / delta) % 6.0;
        } else if cmax == rgb.g {
            h = (rgb.b - rgb.r) / delta + 2.0;
        } else {
            h = (rgb.r - rgb.g) / delta + 4.0;
        }
        h = h / 6.0;
        if h < 0.0 {
            h = h + 1.0;
        }
    }
    return h;
}
"#;

/// Get all built-in utility functions combined.
pub fn all_utils_wgsl() -> String {
    format!(
        "// Built-in utility functions\n{}\n{}\n{}\n{}\n",
        MATH_WGSL, RANDOM_WGSL, NOISE_WGSL, COLOR_WGSL
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_wgsl(code: &str) -> Result<(), String> {
        let module = naga::front::wgsl::parse_str(code)
            .map_err(|e| format!("WGSL parse error: {:?}", e))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| format!("WGSL validation error: {:?}", e))?;

        Ok(())
    }

    #[test]
    fn test_utils_validate_standalone() {
        let shader = format!(
            r#"{utils}

@group(0) @binding(0) var<storage, read_write> results: array<vec4<f32>>;

@compute @workgroup_size(64)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {{
    let seed = cell_seed(id.xy, 1.5);
    let n = noise3(vec3<f32>(f32(id.x), 0.5, rand(seed)));
    let hue = rgb_to_hue(vec3<f32>(0.2, 0.9, 0.1));
    let r = remap(hue, 0.0, 1.0, -1.0, 1.0);
    results[id.x] = vec4<f32>(n, hue, r, clamp_wrapped(r, 0.0, 1.0));
}}
"#,
            utils = all_utils_wgsl()
        );

        validate_wgsl(&shader).expect("utility WGSL should be valid");
    }

    #[test]
    fn test_all_utils_contains_every_function() {
        let utils = all_utils_wgsl();
        for name in ["fn remap", "fn clamp_wrapped", "fn hash3", "fn cell_seed", "fn noise3", "fn rgb_to_hue"] {
            assert!(utils.contains(name), "missing {name}");
        }
    }
}
