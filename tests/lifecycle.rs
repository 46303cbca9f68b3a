use std::sync::Arc;

use shader_engine::{
    HeadlessContext, PixelShaderBlock, ShaderError, ShaderProgram, StageKind, UniformBlockId,
    VertexAttribute,
};

const VERTEX_SRC: &str = "void main() { gl_Position = vec4(0.0); }";
const FRAGMENT_SRC: &str = "void main() { gl_FragColor = vec4(1.0); }";

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn context() -> Arc<HeadlessContext> {
    init_logs();
    Arc::new(HeadlessContext::new())
}

// ---------------------------------------------------------------------------
// Compile → link happy path
// ---------------------------------------------------------------------------

#[test]
fn compile_then_link_succeeds() {
    let ctx = context();
    let mut shader = ShaderProgram::new(ctx.clone(), "happy");

    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    shader
        .compile_stage(FRAGMENT_SRC, StageKind::Fragment)
        .unwrap();
    assert!(shader.has_stage(StageKind::Vertex));
    assert!(shader.has_stage(StageKind::Fragment));

    shader.link().unwrap();

    // Stage handles are transient: the linked program owns the compiled
    // result, so both slots are empty and the stages are freed.
    assert!(shader.is_linked());
    assert!(!shader.has_stage(StageKind::Vertex));
    assert!(!shader.has_stage(StageKind::Fragment));
    assert_eq!(ctx.live_stages(), 0);
    assert_eq!(ctx.live_programs(), 1);
    assert_eq!(ctx.live_buffers(), 1);
    assert_eq!(shader.ps_block_buffer().is_some(), shader.is_linked());
}

#[test]
fn attributes_are_bound_before_linking() {
    let ctx = context();
    let mut shader = ShaderProgram::new(ctx.clone(), "attributes");
    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    shader
        .compile_stage(FRAGMENT_SRC, StageKind::Fragment)
        .unwrap();
    shader.link().unwrap();

    let program = shader.program_handle().unwrap();
    let bound = ctx.bound_attributes(program);
    assert_eq!(bound.len(), VertexAttribute::ALL.len());
    assert_eq!(bound[0], VertexAttribute::Position);
    assert_eq!(bound[13], VertexAttribute::SkinWeights);
}

// ---------------------------------------------------------------------------
// Usage errors and failure modes
// ---------------------------------------------------------------------------

#[test]
#[should_panic(expected = "fragment is missing")]
fn link_without_fragment_stage_is_fatal() {
    let ctx = context();
    let mut shader = ShaderProgram::new(ctx, "incomplete");
    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    let _ = shader.link();
}

#[test]
fn failed_compile_is_reported_and_superseded() {
    let ctx = context();
    let mut shader = ShaderProgram::new(ctx.clone(), "recompile");

    ctx.set_fail_compiles(true);
    let err = shader
        .compile_stage("not a shader", StageKind::Vertex)
        .unwrap_err();
    match err {
        ShaderError::Compile { stage, log } => {
            assert_eq!(stage, StageKind::Vertex);
            assert!(!log.is_empty());
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
    // The failed handle stays allocated until superseded or torn down.
    assert!(!shader.is_linked());
    assert_eq!(ctx.live_stages(), 1);
    assert_eq!(ctx.live_programs(), 0);

    // A valid recompile for the same kind replaces the failed stage
    // without leaking it.
    ctx.set_fail_compiles(false);
    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    assert_eq!(ctx.live_stages(), 1);

    shader.release();
    assert_eq!(ctx.live_stages(), 0);
}

#[test]
fn failed_link_retains_stages_and_leaks_nothing() {
    let ctx = context();
    let mut shader = ShaderProgram::new(ctx.clone(), "badlink");
    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    shader
        .compile_stage(FRAGMENT_SRC, StageKind::Fragment)
        .unwrap();

    ctx.set_fail_links(true);
    let err = shader.link().unwrap_err();
    match err {
        ShaderError::Link { log } => assert!(!log.is_empty()),
        other => panic!("expected a link error, got {other:?}"),
    }

    // State machine: HasBoth unchanged, no leaked intermediate program.
    assert!(!shader.is_linked());
    assert!(shader.has_stage(StageKind::Vertex));
    assert!(shader.has_stage(StageKind::Fragment));
    assert_eq!(ctx.live_programs(), 0);
    assert_eq!(ctx.live_buffers(), 0);

    // The retained stages can be relinked once the linker cooperates.
    ctx.set_fail_links(false);
    shader.link().unwrap();
    assert!(shader.is_linked());
}

#[test]
fn failed_buffer_allocation_leaves_the_instance_unlinked() {
    let ctx = context();
    let mut shader = ShaderProgram::new(ctx.clone(), "nobuffer");
    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    shader
        .compile_stage(FRAGMENT_SRC, StageKind::Fragment)
        .unwrap();

    ctx.set_fail_buffer_allocations(true);
    let err = shader.link().unwrap_err();
    assert!(matches!(err, ShaderError::Context(_)));

    // A link that errors must not leave a half-linked instance behind:
    // no program, no buffer, and the pending stages stay usable.
    assert!(!shader.is_linked());
    assert_eq!(shader.ps_block_buffer(), None);
    assert!(shader.has_stage(StageKind::Vertex));
    assert!(shader.has_stage(StageKind::Fragment));
    assert_eq!(ctx.live_programs(), 0);
    assert_eq!(ctx.live_buffers(), 0);

    ctx.set_fail_buffer_allocations(false);
    shader.link().unwrap();
    assert!(shader.is_linked());
    assert_eq!(shader.ps_block_buffer().is_some(), shader.is_linked());
    assert_eq!(ctx.live_buffers(), 1);
}

// ---------------------------------------------------------------------------
// Uniform resolution
// ---------------------------------------------------------------------------

#[test]
fn declared_blocks_resolve_and_get_their_fixed_binding() {
    let ctx = context();
    ctx.declare_uniform_block("LightBlock");
    ctx.declare_uniform_block("PixelShaderBlock");

    let mut shader = ShaderProgram::new(ctx.clone(), "blocks");
    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    shader
        .compile_stage(FRAGMENT_SRC, StageKind::Fragment)
        .unwrap();
    shader.link().unwrap();

    let light = shader.uniform_block_binding(UniformBlockId::LightBlock).unwrap();
    let ps = shader
        .uniform_block_binding(UniformBlockId::PixelShaderBlock)
        .unwrap();
    assert_ne!(light, ps);

    let program = shader.program_handle().unwrap();
    assert_eq!(
        ctx.block_binding_slot(program, light),
        Some(UniformBlockId::LightBlock.binding())
    );
    assert_eq!(
        ctx.block_binding_slot(program, ps),
        Some(UniformBlockId::PixelShaderBlock.binding())
    );
}

#[test]
fn absent_block_resolves_to_none_without_failing_the_link() {
    let ctx = context();
    // The shader declares neither well-known block.
    let mut shader = ShaderProgram::new(ctx, "noblocks");
    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    shader
        .compile_stage(FRAGMENT_SRC, StageKind::Fragment)
        .unwrap();
    shader.link().unwrap();

    assert!(shader.is_linked());
    assert_eq!(shader.uniform_block_binding(UniformBlockId::LightBlock), None);
    assert_eq!(
        shader.uniform_block_binding(UniformBlockId::PixelShaderBlock),
        None
    );
}

#[test]
fn texture_samplers_resolve_per_unit() {
    let ctx = context();
    ctx.declare_uniform("Texture[0]");
    ctx.declare_uniform("Texture[3]");

    let mut shader = ShaderProgram::new(ctx, "samplers");
    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    shader
        .compile_stage(FRAGMENT_SRC, StageKind::Fragment)
        .unwrap();
    shader.link().unwrap();

    assert!(shader.texture_sampler(0).is_some());
    assert!(shader.texture_sampler(3).is_some());
    assert!(shader.texture_sampler(1).is_none());
    assert!(shader.texture_sampler(7).is_none());
    assert!(shader.texture_sampler(8).is_none());
}

// ---------------------------------------------------------------------------
// Relinking
// ---------------------------------------------------------------------------

#[test]
fn relink_replaces_the_old_program_and_recomputes_bindings() {
    let ctx = context();
    ctx.declare_uniform_block("LightBlock");

    let mut shader = ShaderProgram::new(ctx.clone(), "relink");
    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    shader
        .compile_stage(FRAGMENT_SRC, StageKind::Fragment)
        .unwrap();
    shader.link().unwrap();
    let first = shader.program_handle().unwrap();
    assert_eq!(
        shader.uniform_block_binding(UniformBlockId::PixelShaderBlock),
        None
    );

    // The recompiled shader now also declares the pixel-shader block.
    ctx.declare_uniform_block("PixelShaderBlock");
    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    shader
        .compile_stage(FRAGMENT_SRC, StageKind::Fragment)
        .unwrap();
    shader.link().unwrap();

    let second = shader.program_handle().unwrap();
    assert_ne!(first, second);
    // Tables are recomputed, not inherited.
    assert!(shader
        .uniform_block_binding(UniformBlockId::PixelShaderBlock)
        .is_some());

    // Exactly one program and one per-program buffer are alive.
    assert_eq!(ctx.live_programs(), 1);
    assert_eq!(ctx.live_buffers(), 1);
    assert_eq!(ctx.live_stages(), 0);
}

// ---------------------------------------------------------------------------
// Bind policy
// ---------------------------------------------------------------------------

#[test]
fn bind_before_link_fails_loudly() {
    let ctx = context();
    let shader = ShaderProgram::new(ctx.clone(), "unbound");
    assert!(matches!(shader.bind(), Err(ShaderError::NotLinked)));
    assert_eq!(ctx.active_program(), None);
}

#[test]
fn bind_activates_the_linked_program() {
    let ctx = context();
    let mut shader = ShaderProgram::new(ctx.clone(), "bound");
    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    shader
        .compile_stage(FRAGMENT_SRC, StageKind::Fragment)
        .unwrap();
    shader.link().unwrap();

    shader.bind().unwrap();
    assert_eq!(ctx.active_program(), shader.program_handle());
}

// ---------------------------------------------------------------------------
// Uniform buffer upload
// ---------------------------------------------------------------------------

#[test]
fn ps_block_payload_round_trips_into_the_buffer() {
    let ctx = context();
    let mut shader = ShaderProgram::new(ctx.clone(), "upload");
    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    shader
        .compile_stage(FRAGMENT_SRC, StageKind::Fragment)
        .unwrap();

    let payload = PixelShaderBlock::default();
    assert!(matches!(
        shader.write_ps_block(&payload),
        Err(ShaderError::NotLinked)
    ));

    shader.link().unwrap();
    shader.write_ps_block(&payload).unwrap();

    let buffer = shader.ps_block_buffer().unwrap();
    assert_eq!(
        ctx.buffer_contents(buffer).as_deref(),
        Some(bytemuck::bytes_of(&payload))
    );
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

#[test]
fn release_is_idempotent() {
    let ctx = context();
    let mut shader = ShaderProgram::new(ctx.clone(), "released");
    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    shader
        .compile_stage(FRAGMENT_SRC, StageKind::Fragment)
        .unwrap();
    shader.link().unwrap();

    shader.release();
    assert!(shader.is_disposed());
    assert!(!shader.is_linked());
    assert_eq!(ctx.live_stages(), 0);
    assert_eq!(ctx.live_programs(), 0);
    assert_eq!(ctx.live_buffers(), 0);

    shader.release();
    assert!(shader.is_disposed());
}

#[test]
fn release_after_failed_compile_frees_the_pending_handle() {
    let ctx = context();
    let mut shader = ShaderProgram::new(ctx.clone(), "partial");
    ctx.set_fail_compiles(true);
    let _ = shader.compile_stage("not a shader", StageKind::Fragment);
    assert_eq!(ctx.live_stages(), 1);

    shader.release();
    shader.release();
    assert_eq!(ctx.live_stages(), 0);
}

#[test]
fn drop_runs_the_same_cleanup_as_release() {
    let ctx = context();
    {
        let mut shader = ShaderProgram::new(ctx.clone(), "abandoned");
        shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
        shader
            .compile_stage(FRAGMENT_SRC, StageKind::Fragment)
            .unwrap();
        shader.link().unwrap();
        shader.bind().unwrap();
    }
    assert_eq!(ctx.live_stages(), 0);
    assert_eq!(ctx.live_programs(), 0);
    assert_eq!(ctx.live_buffers(), 0);
    assert_eq!(ctx.active_program(), None);
}

// ---------------------------------------------------------------------------
// End to end
// ---------------------------------------------------------------------------

#[test]
fn basic_end_to_end() {
    let ctx = context();
    ctx.declare_uniform_block("LightBlock");
    ctx.declare_uniform_block("PixelShaderBlock");
    for unit in 0..8 {
        ctx.declare_uniform(&format!("Texture[{unit}]"));
    }

    let mut shader = ShaderProgram::new(ctx.clone(), "Basic");
    assert_eq!(shader.name(), "Basic");
    assert_eq!(shader.to_string(), "Basic");

    shader.compile_stage(VERTEX_SRC, StageKind::Vertex).unwrap();
    shader
        .compile_stage(FRAGMENT_SRC, StageKind::Fragment)
        .unwrap();
    shader.link().unwrap();
    shader.bind().unwrap();

    assert_eq!(ctx.active_program(), shader.program_handle());
    for unit in 0..8 {
        assert!(shader.texture_sampler(unit).is_some());
    }

    shader.release();
    assert!(shader.is_disposed());
    assert_eq!(shader.program_handle(), None);
    assert_eq!(shader.texture_sampler(0), None);
    assert_eq!(shader.uniform_block_binding(UniformBlockId::LightBlock), None);

    // Second release is a no-op.
    shader.release();
    assert_eq!(ctx.live_stages() + ctx.live_programs() + ctx.live_buffers(), 0);
}
