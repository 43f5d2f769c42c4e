//! Lifecycle Tests
//!
//! Tests for:
//! - Release cascades (pipeline → binding sets → samplers, program → shaders)
//! - Use-count balance across create/release sequences
//! - Rollback of partially acquired pipelines on compile, link and
//!   reflection failures
//! - Validation failures issuing no native calls
//! - Binder slots forgotten when their object is destroyed

use myth_gl::{
    BufferDescriptor, BufferId, Context, ContextSettings, GlCall, GlError, ImageDescriptor, ImageFormat, ImageId,
    LayoutBinding, NativeObjectKind, PipelineDescriptor, RecordingBackend, ResourceBinding, SamplerParams, ShaderStage,
    StepMode, VertexAttribute, VertexBufferLayout, VertexFormat,
};

const VERTEX: &str = "#version 330 core
layout (location = 0) in vec3 in_vertex;
void main() {
    gl_Position = vec4(in_vertex, 1.0);
}
";

const FRAGMENT: &str = "#version 330 core
layout (std140) uniform Common {
    mat4 mvp;
};
uniform sampler2D Texture;
out vec4 out_color;
void main() {
    out_color = texture(Texture, vec2(0.0));
}
";

const BROKEN: &str = "#version 330 core
#error unfinished
void main() {
}
";

fn context() -> Context<RecordingBackend> {
    let _ = env_logger::builder().is_test(true).try_init();
    Context::new(RecordingBackend::new(), ContextSettings::default()).unwrap()
}

struct Scene {
    vertex_buffer: BufferId,
    uniform_buffer: BufferId,
    target: ImageId,
    texture: ImageId,
}

fn scene(ctx: &mut Context<RecordingBackend>) -> Scene {
    Scene {
        vertex_buffer: ctx.buffer(&BufferDescriptor::with_data(&[0; 36])).unwrap(),
        uniform_buffer: ctx.buffer(&BufferDescriptor::with_size(64)).unwrap(),
        target: ctx.image(&ImageDescriptor::new(32, 32, ImageFormat::Rgba8Unorm)).unwrap(),
        texture: ctx.image(&ImageDescriptor::new(8, 8, ImageFormat::Rgba8Unorm)).unwrap(),
    }
}

fn textured(scene: &Scene) -> PipelineDescriptor {
    PipelineDescriptor {
        vertex_shader: VERTEX.to_string(),
        fragment_shader: FRAGMENT.to_string(),
        layout: vec![LayoutBinding::new("Common", 0), LayoutBinding::new("Texture", 0)],
        resources: vec![
            ResourceBinding::UniformBuffer { binding: 0, buffer: scene.uniform_buffer, offset: 0, size: None },
            ResourceBinding::SampledImage { binding: 0, image: scene.texture, sampler: SamplerParams::default() },
        ],
        framebuffer: vec![scene.target],
        vertex_buffers: vec![VertexBufferLayout {
            buffer: scene.vertex_buffer,
            stride: 12,
            step_mode: StepMode::Vertex,
            attributes: vec![VertexAttribute { location: 0, offset: 0, format: VertexFormat::Float32x3 }],
        }],
        vertex_count: 3,
        ..Default::default()
    }
}

/// Cache entries owned by the images of `scene` alone: one framebuffer each.
const IMAGE_ENTRIES: usize = 2;

// ============================================================================
// Release Cascades
// ============================================================================

#[test]
fn releasing_the_last_pipeline_empties_its_caches() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let pipeline = ctx.pipeline(&textured(&scene)).unwrap();
    assert!(ctx.caches().total_entries() > IMAGE_ENTRIES);

    ctx.release(pipeline);

    let caches = ctx.caches();
    assert!(caches.programs.is_empty());
    assert!(caches.shaders.is_empty());
    assert!(caches.vertex_arrays.is_empty());
    assert!(caches.samplers.is_empty());
    assert!(caches.buffer_bindings.is_empty());
    assert!(caches.image_bindings.is_empty());
    assert!(caches.global_settings.is_empty());
    assert_eq!(caches.total_entries(), IMAGE_ENTRIES);

    let own = ctx.get_image(scene.target).unwrap().framebuffer().unwrap();
    assert_eq!(ctx.caches().framebuffers.use_count(own), Some(1));

    let gl = ctx.backend();
    assert_eq!(gl.live_count(NativeObjectKind::Program), 0);
    assert_eq!(gl.live_count(NativeObjectKind::Shader), 0);
    assert_eq!(gl.live_count(NativeObjectKind::Sampler), 0);
    assert_eq!(gl.live_count(NativeObjectKind::VertexArray), 0);
    assert_eq!(gl.live_count(NativeObjectKind::Framebuffer), IMAGE_ENTRIES);
}

#[test]
fn releasing_one_of_two_sharers_drops_one_use() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let desc = textured(&scene);
    let a = ctx.pipeline(&desc).unwrap();
    let b = ctx.pipeline(&desc).unwrap();
    let shared = *ctx.get_pipeline(b).unwrap();

    ctx.release(a);

    let caches = ctx.caches();
    assert_eq!(caches.programs.use_count(shared.program()), Some(1));
    assert_eq!(caches.framebuffers.use_count(shared.framebuffer()), Some(2));
    assert_eq!(caches.vertex_arrays.use_count(shared.vertex_array()), Some(1));
    assert_eq!(caches.image_bindings.use_count(shared.image_bindings()), Some(1));
    assert_eq!(ctx.backend().deleted(NativeObjectKind::Program), 0);

    ctx.render(b).unwrap();
}

#[test]
fn use_counts_balance_over_mixed_pipelines() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let base = textured(&scene);
    let variants = [
        base.clone(),
        PipelineDescriptor { cull_face: myth_gl::CullFace::Back, ..base.clone() },
        PipelineDescriptor { fragment_shader: FRAGMENT.replace("vec2(0.0)", "vec2(0.5)"), ..base.clone() },
        PipelineDescriptor { framebuffer: vec![scene.texture], ..base.clone() },
        base,
    ];

    let pipelines: Vec<_> = variants.iter().map(|desc| ctx.pipeline(desc).unwrap()).collect();
    for id in pipelines.into_iter().rev() {
        ctx.release(id);
    }

    assert_eq!(ctx.caches().total_entries(), IMAGE_ENTRIES);
    let gl = ctx.backend();
    for kind in [NativeObjectKind::Program, NativeObjectKind::Shader, NativeObjectKind::Sampler] {
        assert_eq!(gl.created(kind), gl.deleted(kind), "{kind:?} leaked");
    }
}

#[test]
#[should_panic(expected = "released a pipeline that is not live")]
fn double_release_panics() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let pipeline = ctx.pipeline(&textured(&scene)).unwrap();
    ctx.release(pipeline);
    ctx.release(pipeline);
}

#[test]
fn released_pipeline_cannot_render() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let pipeline = ctx.pipeline(&textured(&scene)).unwrap();
    ctx.release(pipeline);

    assert!(matches!(ctx.render(pipeline), Err(GlError::InvalidHandle { kind: "pipeline" })));
    assert!(ctx.get_pipeline(pipeline).is_none());
}

#[test]
fn image_release_keeps_framebuffers_of_live_pipelines() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let pipeline = ctx.pipeline(&textured(&scene)).unwrap();
    let framebuffer = ctx.get_pipeline(pipeline).unwrap().framebuffer();

    ctx.release(scene.target);
    assert_eq!(ctx.caches().framebuffers.use_count(framebuffer), Some(1));
    assert_eq!(ctx.backend().deleted(NativeObjectKind::Framebuffer), 0);

    ctx.release(pipeline);
    assert!(!ctx.caches().framebuffers.contains(framebuffer));
    assert_eq!(ctx.backend().deleted(NativeObjectKind::Framebuffer), 1);
}

#[test]
fn buffer_release_deletes_native_buffer() {
    let mut ctx = context();
    let buffer = ctx.buffer(&BufferDescriptor::with_size(16)).unwrap();
    ctx.release(buffer);

    assert_eq!(ctx.backend().live_count(NativeObjectKind::Buffer), 0);
    assert_eq!(ctx.live_objects(), (0, 0, 0));
}

// ============================================================================
// Rollback
// ============================================================================

#[test]
fn compile_failure_leaves_no_entries_and_retries() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let broken = PipelineDescriptor { vertex_shader: BROKEN.to_string(), ..textured(&scene) };

    for attempt in 1..=2 {
        let err = ctx.pipeline(&broken).unwrap_err();
        assert!(matches!(err, GlError::ShaderCompile { stage: ShaderStage::Vertex, .. }));
        assert_eq!(ctx.caches().total_entries(), IMAGE_ENTRIES);
        assert_eq!(ctx.backend().count(|call| matches!(call, GlCall::CompileShader(_))), attempt);
    }
    assert_eq!(ctx.backend().live_count(NativeObjectKind::Shader), 0);
}

#[test]
fn fragment_failure_releases_the_vertex_shader() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let broken = PipelineDescriptor { fragment_shader: BROKEN.to_string(), ..textured(&scene) };

    let err = ctx.pipeline(&broken).unwrap_err();
    assert!(matches!(err, GlError::ShaderCompile { stage: ShaderStage::Fragment, .. }));
    assert!(err.to_string().starts_with("Fragment Shader Error"));

    assert!(ctx.caches().shaders.is_empty());
    assert_eq!(ctx.backend().created(NativeObjectKind::Shader), 2);
    assert_eq!(ctx.backend().live_count(NativeObjectKind::Shader), 0);
}

#[test]
fn fragment_failure_keeps_a_shared_vertex_shader() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let good = ctx.pipeline(&textured(&scene)).unwrap();
    let broken = PipelineDescriptor { fragment_shader: BROKEN.to_string(), ..textured(&scene) };

    ctx.pipeline(&broken).unwrap_err();

    let [vertex, _] = ctx.caches().programs.get(ctx.get_pipeline(good).unwrap().program()).shaders();
    assert_eq!(ctx.caches().shaders.use_count(vertex), Some(1));
    assert_eq!(ctx.caches().shaders.len(), 2);
}

#[test]
fn link_failure_rolls_back_and_retries() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let desc = textured(&scene);

    ctx.backend_mut().set_link_error(Some("varying mismatch".to_string()));
    let err = ctx.pipeline(&desc).unwrap_err();
    assert!(matches!(&err, GlError::ProgramLink { log } if log.contains("varying mismatch")));
    assert_eq!(ctx.caches().total_entries(), IMAGE_ENTRIES);
    assert_eq!(ctx.backend().live_count(NativeObjectKind::Program), 0);
    assert_eq!(ctx.backend().live_count(NativeObjectKind::Shader), 0);

    ctx.backend_mut().set_link_error(None);
    ctx.pipeline(&desc).unwrap();
    assert_eq!(ctx.backend().count(|call| matches!(call, GlCall::CompileShader(_))), 4);
    assert_eq!(ctx.backend().live_count(NativeObjectKind::Program), 1);
}

#[test]
fn unfed_attribute_rolls_back_the_program() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let desc = PipelineDescriptor {
        vertex_shader: VERTEX.replace(
            "layout (location = 0) in vec3 in_vertex;",
            "layout (location = 0) in vec3 in_vertex;\nlayout (location = 1) in vec2 in_uv;",
        ),
        ..textured(&scene)
    };

    let err = ctx.pipeline(&desc).unwrap_err();
    assert!(matches!(err, GlError::InvalidParameter(message) if message.contains("in_uv")));
    assert_eq!(ctx.caches().total_entries(), IMAGE_ENTRIES);
    assert_eq!(ctx.backend().live_count(NativeObjectKind::Program), 0);
    assert_eq!(ctx.backend().live_count(NativeObjectKind::Shader), 0);
}

#[test]
fn unknown_layout_name_rolls_back_the_program() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let mut desc = textured(&scene);
    desc.layout.push(LayoutBinding::new("Missing", 3));

    assert!(matches!(ctx.pipeline(&desc), Err(GlError::InvalidParameter(_))));
    assert!(ctx.caches().programs.is_empty());
    assert_eq!(ctx.live_objects().2, 0);
}

#[test]
fn validation_failure_issues_no_native_calls() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    ctx.backend_mut().clear_calls();

    let too_many = PipelineDescriptor { vertex_count: u32::MAX, ..textured(&scene) };
    assert!(ctx.pipeline(&too_many).is_err());

    let mut duplicated = textured(&scene);
    duplicated.resources.push(ResourceBinding::UniformBuffer {
        binding: 0,
        buffer: scene.uniform_buffer,
        offset: 0,
        size: None,
    });
    assert!(ctx.pipeline(&duplicated).is_err());

    let no_target = PipelineDescriptor { framebuffer: Vec::new(), ..textured(&scene) };
    assert!(ctx.pipeline(&no_target).is_err());

    ctx.set_include("unused", "");
    let missing = PipelineDescriptor { vertex_shader: "#include \"absent\"\n".to_string(), ..textured(&scene) };
    assert!(matches!(ctx.pipeline(&missing), Err(GlError::MissingInclude(_))));

    assert!(ctx.backend().calls().is_empty());
}

#[test]
fn released_buffer_is_rejected_by_new_pipelines() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    ctx.release(scene.vertex_buffer);
    ctx.backend_mut().clear_calls();

    let err = ctx.pipeline(&textured(&scene)).unwrap_err();
    assert!(matches!(err, GlError::InvalidHandle { kind: "buffer" }));
    assert!(ctx.backend().calls().is_empty());
}

// ============================================================================
// Binder Invalidation
// ============================================================================

#[test]
fn destroyed_objects_are_forgotten_by_the_binder() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let pipeline = ctx.pipeline(&textured(&scene)).unwrap();
    ctx.render(pipeline).unwrap();
    assert!(ctx.binder().current_program().is_some());
    assert!(ctx.binder().current_global_settings().is_some());

    ctx.release(pipeline);

    let binder = ctx.binder();
    assert_eq!(binder.current_program(), None);
    assert_eq!(binder.current_vertex_array(), None);
    assert_eq!(binder.current_global_settings(), None);
    // The target image still owns the framebuffer, so it stays bound.
    assert!(binder.current_framebuffer().is_some());
}

#[test]
fn recreated_pipeline_rebinds_everything() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let desc = textured(&scene);
    let first = ctx.pipeline(&desc).unwrap();
    ctx.render(first).unwrap();
    ctx.release(first);

    let second = ctx.pipeline(&desc).unwrap();
    ctx.backend_mut().clear_calls();
    ctx.render(second).unwrap();

    // Program and vertex array were left bound while the pipeline was built.
    let gl = ctx.backend();
    assert_eq!(gl.count(|call| matches!(call, GlCall::DepthFunc(_))), 1);
    assert_eq!(gl.count(|call| matches!(call, GlCall::BindSampler { .. })), 1);
    assert_eq!(gl.count(|call| matches!(call, GlCall::BindBufferRange { .. })), 1);
}

#[test]
fn shaders_are_recompiled_after_their_last_program_is_released() {
    let mut ctx = context();
    let scene = scene(&mut ctx);
    let desc = textured(&scene);
    let first = ctx.pipeline(&desc).unwrap();
    ctx.release(first);
    assert!(ctx.caches().shaders.is_empty());

    ctx.backend_mut().clear_calls();
    ctx.pipeline(&desc).unwrap();
    assert_eq!(ctx.backend().count(|call| matches!(call, GlCall::CompileShader(_))), 2);
}
