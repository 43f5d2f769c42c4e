//! Cache Deduplication Tests
//!
//! Tests for:
//! - Identical pipeline descriptions materializing every derived object once
//! - Vertex-input sets shared across pipelines with different programs
//! - Samplers shared inside and across image-binding sets
//! - Include resolution feeding the program key
//! - Global-state normalization collapsing equivalent blocks

use myth_gl::{
    BufferDescriptor, BufferId, Context, ContextSettings, ImageDescriptor, ImageFormat, ImageId, LayoutBinding,
    NativeObjectKind, PipelineDescriptor, RecordingBackend, ResourceBinding, SamplerParams, StepMode,
    VertexAttribute, VertexBufferLayout, VertexFormat, Wrap,
};

const VERTEX: &str = "#version 330 core
layout (location = 0) in vec3 in_vertex;
void main() {
    gl_Position = vec4(in_vertex, 1.0);
}
";

const FRAGMENT: &str = "#version 330 core
out vec4 out_color;
void main() {
    out_color = vec4(1.0);
}
";

const TEXTURED_FRAGMENT: &str = "#version 330 core
uniform sampler2D Texture;
out vec4 out_color;
void main() {
    out_color = texture(Texture, vec2(0.0));
}
";

fn context() -> Context<RecordingBackend> {
    let _ = env_logger::builder().is_test(true).try_init();
    Context::new(RecordingBackend::new(), ContextSettings::default()).unwrap()
}

fn vertex_buffer(ctx: &mut Context<RecordingBackend>) -> BufferId {
    ctx.buffer(&BufferDescriptor::with_data(&[0; 36])).unwrap()
}

fn color_target(ctx: &mut Context<RecordingBackend>) -> ImageId {
    ctx.image(&ImageDescriptor::new(64, 64, ImageFormat::Rgba8Unorm)).unwrap()
}

fn texture(ctx: &mut Context<RecordingBackend>) -> ImageId {
    ctx.image(&ImageDescriptor { texture: Some(true), ..ImageDescriptor::new(16, 16, ImageFormat::Rgba8Unorm) })
        .unwrap()
}

fn triangle(vertex_buffer: BufferId, target: ImageId) -> PipelineDescriptor {
    PipelineDescriptor {
        vertex_shader: VERTEX.to_string(),
        fragment_shader: FRAGMENT.to_string(),
        framebuffer: vec![target],
        vertex_buffers: vec![VertexBufferLayout {
            buffer: vertex_buffer,
            stride: 12,
            step_mode: StepMode::Vertex,
            attributes: vec![VertexAttribute { location: 0, offset: 0, format: VertexFormat::Float32x3 }],
        }],
        vertex_count: 3,
        ..Default::default()
    }
}

// ============================================================================
// Whole-Pipeline Deduplication
// ============================================================================

#[test]
fn identical_pipelines_share_every_cached_object() {
    let mut ctx = context();
    let vbo = vertex_buffer(&mut ctx);
    let target = color_target(&mut ctx);
    let desc = triangle(vbo, target);

    let a = ctx.pipeline(&desc).unwrap();
    let b = ctx.pipeline(&desc).unwrap();
    let (pa, pb) = (*ctx.get_pipeline(a).unwrap(), *ctx.get_pipeline(b).unwrap());

    assert_eq!(pa.program(), pb.program());
    assert_eq!(pa.vertex_array(), pb.vertex_array());
    assert_eq!(pa.global_settings(), pb.global_settings());
    assert_eq!(pa.buffer_bindings(), pb.buffer_bindings());
    assert_eq!(pa.image_bindings(), pb.image_bindings());

    let gl = ctx.backend();
    assert_eq!(gl.created(NativeObjectKind::Program), 1);
    assert_eq!(gl.created(NativeObjectKind::Shader), 2);
    assert_eq!(gl.created(NativeObjectKind::VertexArray), 1);
    assert_eq!(ctx.caches().programs.use_count(pa.program()), Some(2));
    assert_eq!(ctx.caches().vertex_arrays.use_count(pa.vertex_array()), Some(2));
}

#[test]
fn pipeline_reuses_the_framebuffer_of_its_target_image() {
    let mut ctx = context();
    let vbo = vertex_buffer(&mut ctx);
    let target = color_target(&mut ctx);
    let own = ctx.get_image(target).unwrap().framebuffer().unwrap();

    let pipeline = ctx.pipeline(&triangle(vbo, target)).unwrap();

    assert_eq!(ctx.get_pipeline(pipeline).unwrap().framebuffer(), own);
    assert_eq!(ctx.caches().framebuffers.use_count(own), Some(2));
    assert_eq!(ctx.backend().created(NativeObjectKind::Framebuffer), 1);
}

#[test]
fn shared_vertex_input_with_distinct_programs() {
    let mut ctx = context();
    let vbo = vertex_buffer(&mut ctx);
    let target = color_target(&mut ctx);
    let plain = triangle(vbo, target);
    let tinted = PipelineDescriptor {
        fragment_shader: FRAGMENT.replace("vec4(1.0)", "vec4(0.5)"),
        ..plain.clone()
    };

    let a = ctx.pipeline(&plain).unwrap();
    let b = ctx.pipeline(&tinted).unwrap();
    let (pa, pb) = (*ctx.get_pipeline(a).unwrap(), *ctx.get_pipeline(b).unwrap());

    assert_eq!(pa.vertex_array(), pb.vertex_array());
    assert_eq!(ctx.caches().vertex_arrays.len(), 1);
    assert_eq!(ctx.caches().vertex_arrays.use_count(pa.vertex_array()), Some(2));

    assert_ne!(pa.program(), pb.program());
    assert_eq!(ctx.caches().programs.len(), 2);
    // The vertex shader is shared between both programs.
    assert_eq!(ctx.caches().shaders.len(), 3);
}

// ============================================================================
// Sampler Sharing
// ============================================================================

#[test]
fn identical_sampler_params_share_one_sampler() {
    let mut ctx = context();
    let vbo = vertex_buffer(&mut ctx);
    let target = color_target(&mut ctx);
    let (tex_a, tex_b, tex_c) = (texture(&mut ctx), texture(&mut ctx), texture(&mut ctx));
    let sampler = SamplerParams { wrap: [Wrap::ClampToEdge; 3], ..Default::default() };

    let first = PipelineDescriptor {
        fragment_shader: TEXTURED_FRAGMENT.to_string(),
        layout: vec![LayoutBinding::new("Texture", 0)],
        resources: vec![
            ResourceBinding::SampledImage { binding: 0, image: tex_a, sampler },
            ResourceBinding::SampledImage { binding: 1, image: tex_b, sampler },
        ],
        ..triangle(vbo, target)
    };
    let a = ctx.pipeline(&first).unwrap();

    let samplers = ctx.caches().image_bindings.get(ctx.get_pipeline(a).unwrap().image_bindings()).samplers().to_vec();
    assert_eq!(samplers.len(), 2);
    assert_eq!(samplers[0], samplers[1]);
    let shared = samplers[0];
    assert_eq!(ctx.caches().samplers.len(), 1);
    assert_eq!(ctx.caches().samplers.use_count(shared), Some(2));
    assert_eq!(ctx.backend().created(NativeObjectKind::Sampler), 1);

    // A different image-binding set with the same parameters adds a use.
    let second = PipelineDescriptor {
        resources: vec![ResourceBinding::SampledImage { binding: 0, image: tex_c, sampler }],
        ..first.clone()
    };
    let b = ctx.pipeline(&second).unwrap();
    assert_eq!(ctx.caches().image_bindings.len(), 2);
    assert_eq!(ctx.caches().samplers.use_count(shared), Some(3));

    ctx.release(a);
    assert_eq!(ctx.caches().samplers.use_count(shared), Some(1));
    assert_eq!(ctx.backend().live_count(NativeObjectKind::Sampler), 1);

    ctx.release(b);
    assert!(ctx.caches().samplers.is_empty());
    assert_eq!(ctx.backend().live_count(NativeObjectKind::Sampler), 0);
}

#[test]
fn different_sampler_params_get_separate_samplers() {
    let mut ctx = context();
    let vbo = vertex_buffer(&mut ctx);
    let target = color_target(&mut ctx);
    let tex = texture(&mut ctx);

    let desc = PipelineDescriptor {
        fragment_shader: TEXTURED_FRAGMENT.to_string(),
        resources: vec![
            ResourceBinding::SampledImage { binding: 0, image: tex, sampler: SamplerParams::default() },
            ResourceBinding::SampledImage {
                binding: 1,
                image: tex,
                sampler: SamplerParams { lod_bias: 0.5, ..Default::default() },
            },
        ],
        ..triangle(vbo, target)
    };
    ctx.pipeline(&desc).unwrap();
    assert_eq!(ctx.caches().samplers.len(), 2);
}

// ============================================================================
// Program Keys
// ============================================================================

#[test]
fn program_key_uses_resolved_source() {
    let mut ctx = context();
    let vbo = vertex_buffer(&mut ctx);
    let target = color_target(&mut ctx);
    ctx.set_include("attributes", "layout (location = 0) in vec3 in_vertex;");

    let inline = PipelineDescriptor {
        vertex_shader: "#version 330 core\nlayout (location = 0) in vec3 in_vertex;\nvoid main() {\n}\n".to_string(),
        ..triangle(vbo, target)
    };
    let included = PipelineDescriptor {
        vertex_shader: "#version 330 core\n#include \"attributes\"\nvoid main() {\n}\n".to_string(),
        ..inline.clone()
    };

    let a = ctx.pipeline(&inline).unwrap();
    let b = ctx.pipeline(&included).unwrap();
    assert_eq!(ctx.get_pipeline(a).unwrap().program(), ctx.get_pipeline(b).unwrap().program());
    assert_eq!(ctx.backend().created(NativeObjectKind::Program), 1);
}

#[test]
fn missing_include_is_reported_before_compiling() {
    let mut ctx = context();
    let vbo = vertex_buffer(&mut ctx);
    let target = color_target(&mut ctx);
    let desc = PipelineDescriptor {
        vertex_shader: "#version 330 core\n#include \"nowhere\"\n".to_string(),
        ..triangle(vbo, target)
    };

    let err = ctx.pipeline(&desc).unwrap_err();
    assert!(matches!(err, myth_gl::GlError::MissingInclude(name) if name == "nowhere"));
    assert_eq!(ctx.backend().created(NativeObjectKind::Shader), 0);
}

// ============================================================================
// Global-State Normalization
// ============================================================================

#[test]
fn depth_state_is_ignored_without_depth_attachment() {
    let mut ctx = context();
    let vbo = vertex_buffer(&mut ctx);
    let target = color_target(&mut ctx);
    let with_depth_test = triangle(vbo, target);
    let without_depth_test = PipelineDescriptor { depth: None, ..with_depth_test.clone() };

    let a = ctx.pipeline(&with_depth_test).unwrap();
    let b = ctx.pipeline(&without_depth_test).unwrap();
    assert_eq!(ctx.get_pipeline(a).unwrap().global_settings(), ctx.get_pipeline(b).unwrap().global_settings());
    assert_eq!(ctx.caches().global_settings.len(), 1);
}

#[test]
fn depth_state_distinguishes_blocks_with_depth_attachment() {
    let mut ctx = context();
    let vbo = vertex_buffer(&mut ctx);
    let target = color_target(&mut ctx);
    let depth = ctx.image(&ImageDescriptor::new(64, 64, ImageFormat::Depth24Plus)).unwrap();
    let with_depth_test = PipelineDescriptor { framebuffer: vec![target, depth], ..triangle(vbo, target) };
    let without_depth_test = PipelineDescriptor { depth: None, ..with_depth_test.clone() };

    ctx.pipeline(&with_depth_test).unwrap();
    ctx.pipeline(&without_depth_test).unwrap();
    assert_eq!(ctx.caches().global_settings.len(), 2);
    // Both pipelines draw into the same color + depth pair.
    assert_eq!(ctx.caches().framebuffers.len(), 3);
}
