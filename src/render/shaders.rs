//! WGSL for every technique, compiled into one module.
//!
//! Bind groups: 0 = per-frame constants, 1 = per-object constants,
//! 2 = material textures + sampler, 3 = both shadow maps + comparison
//! sampler. Entry points only touch the groups their pipeline layout has.

pub const SHADER_SOURCE: &str = r#"
struct Light {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    color: vec3<f32>,
    cos_half_angle: f32,
    position: vec3<f32>,
    facing: vec3<f32>,
}

struct Frame {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    view_projection: mat4x4<f32>,
    lights: array<Light, 2>,
    ambient_color: vec3<f32>,
    specular_power: f32,
    camera_position: vec3<f32>,
    parallax_depth: f32,
}

struct Object {
    world: mat4x4<f32>,
    color: vec3<f32>,
    wiggle: f32,
}

@group(0) @binding(0) var<uniform> frame: Frame;
@group(1) @binding(0) var<uniform> object: Object;

@group(2) @binding(0) var diffuse_map: texture_2d<f32>;
@group(2) @binding(1) var secondary_map: texture_2d<f32>;
@group(2) @binding(2) var material_sampler: sampler;

@group(3) @binding(0) var shadow_map_0: texture_depth_2d;
@group(3) @binding(1) var shadow_map_1: texture_depth_2d;
@group(3) @binding(2) var shadow_sampler: sampler_comparison;

const DEPTH_ADJUST: f32 = 0.0005;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) tangent: vec3<f32>,
}

struct BasicVertex {
    @builtin(position) clip: vec4<f32>,
    @location(2) uv: vec2<f32>,
}

struct LitVertex {
    @builtin(position) clip: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) world_tangent: vec3<f32>,
}

fn to_world_direction(direction: vec3<f32>) -> vec3<f32> {
    return (object.world * vec4<f32>(direction, 0.0)).xyz;
}

fn lit_vertex(position: vec3<f32>, input: VertexInput) -> LitVertex {
    var out: LitVertex;
    let world_position = object.world * vec4<f32>(position, 1.0);
    out.clip = frame.view_projection * world_position;
    out.world_position = world_position.xyz;
    out.world_normal = to_world_direction(input.normal);
    out.world_tangent = to_world_direction(input.tangent);
    out.uv = input.uv;
    return out;
}

@vertex
fn vs_basic_transform(input: VertexInput) -> BasicVertex {
    var out: BasicVertex;
    out.clip = frame.view_projection * object.world * vec4<f32>(input.position, 1.0);
    out.uv = input.uv;
    return out;
}

@vertex
fn vs_pixel_lighting(input: VertexInput) -> LitVertex {
    var out = lit_vertex(input.position, input);
    out.world_tangent = vec3<f32>(0.0);
    return out;
}

@vertex
fn vs_normal_mapping(input: VertexInput) -> LitVertex {
    return lit_vertex(input.position, input);
}

@vertex
fn vs_wiggle(input: VertexInput) -> LitVertex {
    let ripple = sin(input.position.y * 0.5 + object.wiggle) + sin(input.position.x * 0.5 + object.wiggle * 0.7);
    let displaced = input.position + input.normal * ripple * 0.4;
    return lit_vertex(displaced, input);
}

// 1 when the point is lit by the light, 0 when something nearer occludes it.
fn shadow_visibility(light: Light, world_position: vec3<f32>, index: u32) -> f32 {
    let light_clip = light.projection * light.view * vec4<f32>(world_position, 1.0);
    if (light_clip.w <= 0.0) {
        return 0.0;
    }
    let ndc = light_clip.xyz / light_clip.w;
    let uv = vec2<f32>(0.5 + 0.5 * ndc.x, 0.5 - 0.5 * ndc.y);
    let depth = ndc.z - DEPTH_ADJUST;
    if (index == 0u) {
        return textureSampleCompareLevel(shadow_map_0, shadow_sampler, uv, depth);
    }
    return textureSampleCompareLevel(shadow_map_1, shadow_sampler, uv, depth);
}

struct Lighting {
    diffuse: vec3<f32>,
    specular: vec3<f32>,
}

fn spotlights(world_position: vec3<f32>, normal: vec3<f32>) -> Lighting {
    var result: Lighting;
    result.diffuse = frame.ambient_color;
    result.specular = vec3<f32>(0.0);
    let to_camera = normalize(frame.camera_position - world_position);

    for (var i = 0u; i < 2u; i = i + 1u) {
        let light = frame.lights[i];
        let to_light = light.position - world_position;
        let light_distance = length(to_light);
        if (light_distance <= 0.0) {
            continue;
        }
        let direction = to_light / light_distance;
        if (dot(-direction, normalize(light.facing)) <= light.cos_half_angle) {
            continue;
        }
        let visibility = shadow_visibility(light, world_position, i);
        let diffuse = light.color * max(dot(normal, direction), 0.0) / light_distance * visibility;
        let halfway = normalize(direction + to_camera);
        result.diffuse += diffuse;
        result.specular += diffuse * pow(max(dot(normal, halfway), 0.0), frame.specular_power);
    }
    return result;
}

fn shade(texel: vec4<f32>, world_position: vec3<f32>, normal: vec3<f32>) -> vec4<f32> {
    let lighting = spotlights(world_position, normal);
    let color = texel.rgb * lighting.diffuse + texel.a * lighting.specular;
    return vec4<f32>(color, 1.0);
}

struct TangentFrame {
    tangent: vec3<f32>,
    bitangent: vec3<f32>,
    normal: vec3<f32>,
}

fn tangent_frame(input: LitVertex) -> TangentFrame {
    var basis: TangentFrame;
    basis.normal = normalize(input.world_normal);
    basis.tangent = normalize(input.world_tangent - dot(input.world_tangent, basis.normal) * basis.normal);
    basis.bitangent = cross(basis.normal, basis.tangent);
    return basis;
}

fn perturbed_normal(basis: TangentFrame, encoded: vec3<f32>) -> vec3<f32> {
    let n = normalize(encoded * 2.0 - 1.0);
    return normalize(basis.tangent * n.x + basis.bitangent * n.y + basis.normal * n.z);
}

@fragment
fn fs_pixel_lighting(input: LitVertex) -> @location(0) vec4<f32> {
    let texel = textureSample(diffuse_map, material_sampler, input.uv);
    return shade(texel, input.world_position, normalize(input.world_normal));
}

@fragment
fn fs_normal_mapping(input: LitVertex) -> @location(0) vec4<f32> {
    let basis = tangent_frame(input);
    let texel = textureSample(diffuse_map, material_sampler, input.uv);
    let encoded = textureSample(secondary_map, material_sampler, input.uv).rgb;
    return shade(texel, input.world_position, perturbed_normal(basis, encoded));
}

@fragment
fn fs_parallax_mapping(input: LitVertex) -> @location(0) vec4<f32> {
    let basis = tangent_frame(input);
    let to_camera = normalize(frame.camera_position - input.world_position);
    let eye = vec3<f32>(
        dot(to_camera, basis.tangent),
        dot(to_camera, basis.bitangent),
        dot(to_camera, basis.normal)
    );
    let height = textureSample(secondary_map, material_sampler, input.uv).a;
    let uv = input.uv + eye.xy * frame.parallax_depth * (height - 0.5);

    let texel = textureSample(diffuse_map, material_sampler, uv);
    let encoded = textureSample(secondary_map, material_sampler, uv).rgb;
    return shade(texel, input.world_position, perturbed_normal(basis, encoded));
}

@fragment
fn fs_wiggle(input: LitVertex) -> @location(0) vec4<f32> {
    let scroll = vec2<f32>(0.0, object.wiggle * 0.05);
    let texel = textureSample(diffuse_map, material_sampler, input.uv + scroll);
    return shade(texel, input.world_position, normalize(input.world_normal));
}

@fragment
fn fs_lerp(input: LitVertex) -> @location(0) vec4<f32> {
    let first = textureSample(diffuse_map, material_sampler, input.uv);
    let second = textureSample(secondary_map, material_sampler, input.uv);
    let texel = mix(first, second, clamp(object.color.r, 0.0, 1.0));
    return shade(texel, input.world_position, normalize(input.world_normal));
}

@fragment
fn fs_light_model(input: BasicVertex) -> @location(0) vec4<f32> {
    let texel = textureSample(diffuse_map, material_sampler, input.uv);
    return vec4<f32>(texel.rgb * object.color, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Technique;

    #[test]
    fn every_technique_entry_point_exists() {
        for technique in Technique::ALL {
            let vertex = format!("fn {}(", technique.vertex_stage().entry_point());
            assert!(SHADER_SOURCE.contains(&vertex), "{vertex}");
            if let Some(fragment) = technique.pixel_entry_point() {
                let fragment = format!("fn {fragment}(");
                assert!(SHADER_SOURCE.contains(&fragment), "{fragment}");
            }
        }
    }
}
