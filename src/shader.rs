//! WGSL generation for the compute passes and the point renderer.
//!
//! Every compute pass gets the same preamble (utilities, uniforms, frame
//! texture, depth helpers) plus one storage binding per input declared in
//! the [`PassGraph`] and one read-write output:
//!
//! | Binding | Resource |
//! |---------|----------|
//! | 0 | `sim: SimUniforms` |
//! | 1 | `frame: texture_2d<f32>` (side-by-side RGBD) |
//! | 2.. | inputs, e.g. `prev_position`, `cur_lifecycle` |
//! | last | `out_<field>` |
//!
//! Each field is an `array<vec4<f32>>` with one texel per grid cell.

use crate::graph::{Dependency, PassGraph, PassKind};
use crate::shader_utils::all_utils_wgsl;
use crate::uniforms::{RENDER_UNIFORMS_WGSL, SIM_UNIFORMS_WGSL};

/// Workgroup edge; passes dispatch `ceil(n / 8)` groups per axis.
pub const WORKGROUP_SIZE: u32 = 8;

/// Binding index of the first pass input.
pub const FIRST_INPUT_BINDING: u32 = 2;

/// Storage inputs of a pass, in binding order.
pub fn pass_inputs(graph: &PassGraph, pass: PassKind) -> Vec<Dependency> {
    graph.inputs(pass).copied().collect()
}

/// Binding index of a pass's output buffer.
pub fn output_binding(graph: &PassGraph, pass: PassKind) -> u32 {
    FIRST_INPUT_BINDING + graph.inputs(pass).count() as u32
}

const DEPTH_HELPERS_WGSL: &str = r#"
fn cell_uv(cell: vec2<u32>) -> vec2<f32> {
    let denom = f32(max(sim.grid.x, 2u) - 1u);
    return vec2<f32>(cell) / denom;
}

fn texel_for_cell(cell: vec2<u32>) -> vec2<u32> {
    let half = sim.grid.yz;
    let uv = clamp(cell_uv(cell), vec2<f32>(0.0), vec2<f32>(1.0));
    let t = vec2<u32>(floor(uv * vec2<f32>(half)));
    return min(t, half - vec2<u32>(1u));
}

fn color_at(texel: vec2<u32>) -> vec3<f32> {
    return textureLoad(frame, vec2<i32>(texel), 0).rgb;
}

fn depth_at(texel: vec2<u32>) -> f32 {
    let shifted = texel + vec2<u32>(sim.grid.y, 0u);
    let rgb = textureLoad(frame, vec2<i32>(shifted), 0).rgb;
    return sim.depth.x * rgb_to_hue(rgb);
}

// xyz = camera-space point, w = 1 when rejected
fn unproject_texel(texel: vec2<u32>) -> vec4<f32> {
    let rejected = vec4<f32>(0.0, 0.0, 0.0, 1.0);
    let d = depth_at(texel);
    if d < sim.depth.y || d > sim.depth.z {
        return rejected;
    }

    let r = sim.grid.w;
    if r > 0u {
        let half = sim.grid.yz;
        if texel.x < r || texel.y < r || texel.x + r >= half.x || texel.y + r >= half.y {
            return rejected;
        }
        let t = sim.depth.w;
        if abs(depth_at(texel - vec2<u32>(r, 0u)) - d) > t
            || abs(depth_at(texel + vec2<u32>(r, 0u)) - d) > t
            || abs(depth_at(texel - vec2<u32>(0u, r)) - d) > t
            || abs(depth_at(texel + vec2<u32>(0u, r)) - d) > t {
            return rejected;
        }
    }

    let p = vec2<f32>(texel);
    return vec4<f32>((p.x * sim.ik.x + sim.ik.z) * d, (p.y * sim.ik.y + sim.ik.w) * d, -d, 0.0);
}
"#;

// Texel layouts:
//   lifecycle (age, max_age, respawn, 0)
//   position  (x, y, z, invalid)
//   velocity  (x, y, z, 0)
//   color     (r, g, b, 0)

const LIFECYCLE_BODY: &str = r#"
    let prev = prev_lifecycle[i];
    var next = prev;
    if prev_position[i].w > 0.5 {
        next.z = 1.0;
    } else if prev.z > 0.5 {
        var max_age = sim.timing.z;
        if sim.timing.w != sim.timing.z {
            max_age = rand_range(cell_seed(cell, sim.timing.y), sim.timing.z, sim.timing.w);
        }
        next = vec4<f32>(0.0, max_age, 0.0, 0.0);
    } else if prev.x >= prev.y {
        next.z = 1.0;
    } else {
        next.x = min(prev.x + sim.timing.x, prev.y);
    }
    out_lifecycle[i] = next;
"#;

const POSITION_BODY: &str = r#"
    let prev = prev_position[i];
    if cur_lifecycle[i].z > 0.5 {
        let p = unproject_texel(texel_for_cell(cell));
        if p.w > 0.5 {
            out_position[i] = vec4<f32>(prev.xyz, 1.0);
        } else {
            out_position[i] = p;
        }
    } else {
        out_position[i] = vec4<f32>(prev.xyz + prev_velocity[i].xyz * sim.timing.x, prev.w);
    }
"#;

const VELOCITY_BODY: &str = r#"
    if cur_lifecycle[i].z > 0.5 {
        out_velocity[i] = vec4<f32>(0.0);
        return;
    }
    let q = prev_position[i].xyz * sim.noise.y;
    let a = sim.noise.x * vec3<f32>(
        noise3(q + sim.noise_offsets[0].xyz),
        noise3(q + sim.noise_offsets[1].xyz),
        noise3(q + sim.noise_offsets[2].xyz),
    );
    var v = prev_velocity[i].xyz + a * sim.timing.x;
    if sim.noise.z > 0.0 {
        v = v * max(1.0 - sim.noise.z * sim.timing.x, 0.0);
    }
    out_velocity[i] = vec4<f32>(v, 0.0);
"#;

const COLOR_BODY: &str = r#"
    if cur_lifecycle[i].x == 0.0 {
        out_color[i] = vec4<f32>(color_at(texel_for_cell(cell)), 0.0);
    } else {
        out_color[i] = prev_color[i];
    }
"#;

fn pass_body(pass: PassKind) -> &'static str {
    match pass {
        PassKind::Lifecycle => LIFECYCLE_BODY,
        PassKind::Position => POSITION_BODY,
        PassKind::Velocity => VELOCITY_BODY,
        PassKind::Color => COLOR_BODY,
    }
}

/// Generate the compute shader for one pass.
pub fn generate_compute_shader(graph: &PassGraph, pass: PassKind) -> String {
    let inputs: String = pass_inputs(graph, pass)
        .iter()
        .enumerate()
        .map(|(k, dep)| {
            format!(
                "@group(0) @binding({}) var<storage, read> {}: array<vec4<f32>>;\n",
                FIRST_INPUT_BINDING + k as u32,
                dep.binding_name()
            )
        })
        .collect();

    format!(
        r#"{utils}
{uniforms}
@group(0) @binding(0) var<uniform> sim: SimUniforms;
@group(0) @binding(1) var frame: texture_2d<f32>;
{inputs}@group(0) @binding({out_binding}) var<storage, read_write> out_{name}: array<vec4<f32>>;
{helpers}
// {name} pass
@compute @workgroup_size({wg}, {wg})
fn main(@builtin(global_invocation_id) id: vec3<u32>) {{
    let n = sim.grid.x;
    if id.x >= n || id.y >= n {{
        return;
    }}
    let cell = id.xy;
    let i = id.y * n + id.x;
{body}}}
"#,
        utils = all_utils_wgsl(),
        uniforms = SIM_UNIFORMS_WGSL,
        inputs = inputs,
        out_binding = output_binding(graph, pass),
        name = pass.name(),
        helpers = DEPTH_HELPERS_WGSL,
        wg = WORKGROUP_SIZE,
        body = pass_body(pass),
    )
}

/// Generate the point render shader.
///
/// Bindings: 0 uniforms, 1 positions, 2 colors, 3 lifecycles. One instance
/// per cell, six vertices per instance.
pub fn generate_render_shader() -> String {
    format!(
        r#"{utils}
{uniforms}
@group(0) @binding(0) var<uniform> uniforms: RenderUniforms;
@group(0) @binding(1) var<storage, read> positions: array<vec4<f32>>;
@group(0) @binding(2) var<storage, read> colors: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read> lifecycles: array<vec4<f32>>;

struct VertexOutput {{
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
    @location(1) point_coord: vec2<f32>,
    @location(2) age: f32,
}};

@vertex
fn vs_main(
    @builtin(vertex_index) vertex_index: u32,
    @builtin(instance_index) instance: u32,
) -> VertexOutput {{
    var quad_vertices = array<vec2<f32>, 6>(
        vec2<f32>(-0.5, -0.5),
        vec2<f32>( 0.5, -0.5),
        vec2<f32>(-0.5,  0.5),
        vec2<f32>(-0.5,  0.5),
        vec2<f32>( 0.5, -0.5),
        vec2<f32>( 0.5,  0.5),
    );
    let corner = quad_vertices[vertex_index];

    let pos = positions[instance];
    let life = lifecycles[instance];

    let view_pos = uniforms.view * vec4<f32>(pos.xyz, 1.0);
    var size = uniforms.point.x * {scale:.1} / -view_pos.z;
    if uniforms.point.w > 0.5 && life.y > 0.0 {{
        size = size * (life.y - life.x) / life.y;
    }}

    var clip = uniforms.view_proj * vec4<f32>(pos.xyz, 1.0);
    // pixels to clip units
    clip.x += corner.x * size * 2.0 / uniforms.point.y * clip.w;
    clip.y += corner.y * size * 2.0 / uniforms.point.z * clip.w;

    // Respawning or invalid: push past the far plane
    if life.z > 0.5 || pos.w > 0.5 {{
        clip = vec4<f32>(clip.x, clip.y, abs(clip.w) * 2.0 + 1.0, clip.w);
    }}

    var out: VertexOutput;
    out.clip_position = clip;
    out.color = colors[instance].rgb;
    out.point_coord = vec2<f32>(corner.x + 0.5, 0.5 - corner.y);
    out.age = life.x;
    return out;
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    let len = length(in.point_coord - vec2<f32>(0.5));
    if len > 0.5 {{
        discard;
    }}
    let brightness = remap(len, 0.0, 0.5, 1.0, 0.0);
    let fade_in = smoothstep(0.0, {fade:.1}, in.age);
    return vec4<f32>(in.color * brightness * fade_in, 1.0);
}}
"#,
        utils = all_utils_wgsl(),
        uniforms = RENDER_UNIFORMS_WGSL,
        scale = crate::visuals::POINT_SCALE,
        fade = crate::visuals::FADE_IN_SECONDS,
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
    fn test_compute_shaders_validate() {
        let graph = PassGraph::standard();
        for pass in PassKind::ALL {
            let src = generate_compute_shader(&graph, pass);
            if let Err(e) = validate_wgsl(&src) {
                panic!("{} pass failed validation: {}\n{}", pass.name(), e, src);
            }
        }
    }

    #[test]
    fn test_render_shader_validates() {
        let src = generate_render_shader();
        validate_wgsl(&src).expect("render shader should be valid");
        assert!(src.contains("300.0"));
        assert!(src.contains("smoothstep(0.0, 0.2, in.age)"));
    }

    #[test]
    fn test_bindings_follow_graph() {
        let graph = PassGraph::standard();
        let src = generate_compute_shader(&graph, PassKind::Position);
        assert!(src.contains("@binding(2) var<storage, read> cur_lifecycle"));
        assert!(src.contains("@binding(3) var<storage, read> prev_position"));
        assert!(src.contains("@binding(4) var<storage, read> prev_velocity"));
        assert!(src.contains("@binding(5) var<storage, read_write> out_position"));
        assert_eq!(output_binding(&graph, PassKind::Color), 4);
    }

    #[test]
    fn test_bodies_only_use_declared_inputs() {
        let graph = PassGraph::standard();
        let fields = ["lifecycle", "position", "velocity", "color"];
        for pass in PassKind::ALL {
            let declared: Vec<String> = pass_inputs(&graph, pass).iter().map(|d| d.binding_name()).collect();
            let body = pass_body(pass);
            for field in fields {
                for prefix in ["prev", "cur"] {
                    let name = format!("{prefix}_{field}[");
                    if body.contains(&name) {
                        assert!(
                            declared.iter().any(|d| format!("{d}[") == name),
                            "{} pass reads undeclared {}",
                            pass.name(),
                            name
                        );
                    }
                }
            }
        }
    }
}
