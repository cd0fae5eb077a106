//! The effect's single vertex/fragment pair.
//!
//! Both stages are Vulkan-flavoured GLSL 450 so the `wgpu` backend can feed
//! them straight to naga. The fragment stage works in a bottom-up pixel frame:
//! `gl_FragCoord` is flipped on entry, and the anchor, direction, and pointer
//! uniforms are all supplied in that same frame.

/// Two triangles covering clip space.
pub const QUAD_VERTICES: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [-1.0, 1.0],
    [-1.0, 1.0],
    [1.0, -1.0],
    [1.0, 1.0],
];

pub const VERTEX_SHADER: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = a_position * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Uniform block layout is reflected at link time, so member order here is
/// free to change as long as the names stay in [`crate::uniforms::UNIFORM_NAMES`].
pub const FRAGMENT_SHADER: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform RayUniforms {
    vec2 u_resolution;
    vec2 u_anchor;
    vec2 u_direction;
    vec2 u_pointer;
    vec3 u_color;
    float u_time;
    float u_speed;
    float u_spread;
    float u_length;
    float u_pointer_influence;
    float u_noise;
    float u_distortion;
    float u_pulsating;
    float u_fade_distance;
    float u_saturation;
};

float dither(vec2 st) {
    return fract(sin(dot(st, vec2(12.9898, 78.233))) * 43758.5453);
}

float ray_strength(vec2 source, vec2 ray_dir, vec2 coord, float seed_a, float seed_b, float speed) {
    vec2 to_coord = coord - source;
    float dist = length(to_coord);
    float cos_angle = dot(to_coord / max(dist, 0.0001), ray_dir);
    float bent = cos_angle + u_distortion * sin(u_time * 2.0 + dist * 0.01) * 0.2;
    float spread = pow(max(bent, 0.0), 1.0 / max(u_spread, 0.001));

    float reach = u_resolution.x * max(u_length, 0.0001);
    float length_falloff = clamp((reach - dist) / reach, 0.0, 1.0);
    float fade = u_resolution.x * max(u_fade_distance, 0.0001);
    float fade_falloff = clamp((fade - dist) / fade, 0.5, 1.0);

    float pulse = u_pulsating > 0.5 ? 0.8 + 0.2 * sin(u_time * speed * 3.0) : 1.0;
    float base = clamp(
        (0.45 + 0.15 * sin(bent * seed_a + u_time * speed)) +
        (0.3 + 0.2 * cos(-bent * seed_b + u_time * speed)),
        0.0,
        1.0
    );
    return base * length_falloff * fade_falloff * spread * pulse;
}

void main() {
    vec2 coord = vec2(gl_FragCoord.x, u_resolution.y - gl_FragCoord.y);

    vec2 ray_dir = u_direction;
    if (u_pointer_influence > 0.0) {
        vec2 toward = normalize(u_pointer * u_resolution - u_anchor);
        ray_dir = normalize(mix(u_direction, toward, u_pointer_influence));
    }

    float first = ray_strength(u_anchor, ray_dir, coord, 36.2214, 21.11349, 1.5 * u_speed);
    float second = ray_strength(u_anchor, ray_dir, coord, 22.3991, 18.0234, 1.1 * u_speed);
    vec3 color = vec3(first * 0.5 + second * 0.4);

    if (u_noise > 0.0) {
        float grain = dither(coord * 0.01 + u_time * 0.1);
        color *= 1.0 - u_noise + u_noise * grain;
    }

    // Cooler and dimmer the further a pixel sits from the anchor edge.
    float span = max(abs(dot(u_resolution, u_direction)), 1.0);
    float glow = 1.0 - clamp(dot(coord - u_anchor, u_direction) / span, 0.0, 1.0);
    color *= vec3(0.1 + glow * 0.8, 0.3 + glow * 0.6, 0.5 + glow * 0.5);

    float gray = dot(color, vec3(0.299, 0.587, 0.114));
    color = mix(vec3(gray), color, u_saturation) * u_color;

    float alpha = clamp(max(color.r, max(color.g, color.b)), 0.0, 1.0);
    out_color = vec4(color, alpha);
}
";
