//! In-memory graphics context
//!
//! [`HeadlessContext`] implements [`GraphicsContext`] without a driver.
//! It keeps the same per-resource handle tables a real backend keeps, and
//! adds two things a driver cannot give you:
//!
//! - **scripting**: compile/link outcomes and the uniforms a "compiled"
//!   program exposes are declared up front, so failure paths are
//!   reproducible;
//! - **accounting**: live-handle counts, the active-program slot and
//!   buffer contents are observable, so tests can assert that every
//!   allocated handle was released.

use crate::context::traits::{ContextError, ContextResult, GraphicsContext};
use crate::context::types::*;
use parking_lot::Mutex;
use std::collections::HashMap;

struct StageRecord {
    kind: StageKind,
    source: String,
    compile_ok: bool,
}

struct ProgramRecord {
    attached: Vec<StageHandle>,
    bound_attributes: Vec<VertexAttribute>,
    link_ok: bool,
    block_indices: HashMap<String, u32>,
    block_bindings: HashMap<u32, u32>,
    uniform_locations: HashMap<String, UniformLocation>,
}

#[derive(Default)]
struct HeadlessState {
    next_id: u64,
    stages: HashMap<u64, StageRecord>,
    programs: HashMap<u64, ProgramRecord>,
    buffers: HashMap<u64, Vec<u8>>,
    active_program: Option<ProgramHandle>,
    fail_compiles: bool,
    fail_links: bool,
    fail_buffer_allocations: bool,
    declared_blocks: Vec<String>,
    declared_uniforms: Vec<String>,
}

impl HeadlessState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Driver-less [`GraphicsContext`] for tests, CI and headless tooling
#[derive(Default)]
pub struct HeadlessContext {
    state: Mutex<HeadlessState>,
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::default()
    }

    // Scripting

    /// Make every subsequent compile fail (until cleared)
    pub fn set_fail_compiles(&self, fail: bool) {
        self.state.lock().fail_compiles = fail;
    }

    /// Make every subsequent link fail (until cleared)
    pub fn set_fail_links(&self, fail: bool) {
        self.state.lock().fail_links = fail;
    }

    /// Make every subsequent buffer allocation fail (until cleared)
    pub fn set_fail_buffer_allocations(&self, fail: bool) {
        self.state.lock().fail_buffer_allocations = fail;
    }

    /// Declare a uniform block that subsequently linked programs expose
    pub fn declare_uniform_block(&self, name: &str) {
        self.state.lock().declared_blocks.push(name.to_string());
    }

    /// Declare a uniform that subsequently linked programs expose
    pub fn declare_uniform(&self, name: &str) {
        self.state.lock().declared_uniforms.push(name.to_string());
    }

    // Accounting

    pub fn live_stages(&self) -> usize {
        self.state.lock().stages.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.lock().programs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.lock().buffers.len()
    }

    pub fn active_program(&self) -> Option<ProgramHandle> {
        self.state.lock().active_program
    }

    /// Current contents of a live buffer
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.state.lock().buffers.get(&buffer.0).cloned()
    }

    /// Source last submitted to a live stage
    pub fn stage_source_text(&self, stage: StageHandle) -> Option<String> {
        self.state
            .lock()
            .stages
            .get(&stage.0)
            .map(|record| record.source.clone())
    }

    /// Binding slot assigned to a resolved block index, if any
    pub fn block_binding_slot(&self, program: ProgramHandle, block_index: u32) -> Option<u32> {
        self.state
            .lock()
            .programs
            .get(&program.0)
            .and_then(|record| record.block_bindings.get(&block_index).copied())
    }

    /// Attribute locations bound to a program before its link
    pub fn bound_attributes(&self, program: ProgramHandle) -> Vec<VertexAttribute> {
        self.state
            .lock()
            .programs
            .get(&program.0)
            .map(|record| record.bound_attributes.clone())
            .unwrap_or_default()
    }
}

impl GraphicsContext for HeadlessContext {
    fn create_stage(&self, kind: StageKind) -> ContextResult<StageHandle> {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.stages.insert(
            id,
            StageRecord {
                kind,
                source: String::new(),
                compile_ok: false,
            },
        );
        Ok(StageHandle(id))
    }

    fn stage_source(&self, stage: StageHandle, source: &str) {
        if let Some(record) = self.state.lock().stages.get_mut(&stage.0) {
            record.source = source.to_string();
        }
    }

    fn compile_stage(&self, stage: StageHandle) {
        let mut state = self.state.lock();
        let fail = state.fail_compiles;
        if let Some(record) = state.stages.get_mut(&stage.0) {
            record.compile_ok = !fail;
        }
    }

    fn stage_compile_status(&self, stage: StageHandle) -> bool {
        self.state
            .lock()
            .stages
            .get(&stage.0)
            .map(|record| record.compile_ok)
            .unwrap_or(false)
    }

    fn stage_compile_log(&self, stage: StageHandle) -> String {
        let state = self.state.lock();
        match state.stages.get(&stage.0) {
            Some(record) if !record.compile_ok => {
                format!("{} stage rejected (scripted failure)", record.kind)
            }
            _ => String::new(),
        }
    }

    fn delete_stage(&self, stage: StageHandle) {
        self.state.lock().stages.remove(&stage.0);
    }

    fn create_program(&self) -> ContextResult<ProgramHandle> {
        let mut state = self.state.lock();
        let id = state.next_id();
        state.programs.insert(
            id,
            ProgramRecord {
                attached: Vec::new(),
                bound_attributes: Vec::new(),
                link_ok: false,
                block_indices: HashMap::new(),
                block_bindings: HashMap::new(),
                uniform_locations: HashMap::new(),
            },
        );
        Ok(ProgramHandle(id))
    }

    fn attach_stage(&self, program: ProgramHandle, stage: StageHandle) {
        let mut state = self.state.lock();
        if !state.stages.contains_key(&stage.0) {
            return;
        }
        if let Some(record) = state.programs.get_mut(&program.0) {
            record.attached.push(stage);
        }
    }

    fn bind_attribute_location(&self, program: ProgramHandle, attribute: VertexAttribute) {
        if let Some(record) = self.state.lock().programs.get_mut(&program.0) {
            record.bound_attributes.push(attribute);
        }
    }

    fn link_program(&self, program: ProgramHandle) {
        let mut state = self.state.lock();
        let fail = state.fail_links;
        let blocks = state.declared_blocks.clone();
        let uniforms = state.declared_uniforms.clone();

        // A link needs an attached stage of each required kind whose last
        // compile succeeded, mirroring what a driver enforces.
        let stages_ok = |record: &ProgramRecord, kind: StageKind| {
            record.attached.iter().any(|stage| {
                state
                    .stages
                    .get(&stage.0)
                    .map(|s| s.kind == kind && s.compile_ok)
                    .unwrap_or(false)
            })
        };

        let link_ok = match state.programs.get(&program.0) {
            Some(record) => {
                !fail && stages_ok(record, StageKind::Vertex) && stages_ok(record, StageKind::Fragment)
            }
            None => return,
        };

        let mut interned: Vec<(String, UniformLocation)> = Vec::new();
        if link_ok {
            for name in &uniforms {
                let id = state.next_id();
                interned.push((name.clone(), UniformLocation(id)));
            }
        }

        let record = match state.programs.get_mut(&program.0) {
            Some(record) => record,
            None => return,
        };
        record.link_ok = link_ok;
        record.block_indices.clear();
        record.uniform_locations.clear();
        if link_ok {
            for (index, name) in blocks.iter().enumerate() {
                record.block_indices.insert(name.clone(), index as u32);
            }
            for (name, location) in interned {
                record.uniform_locations.insert(name, location);
            }
        }
    }

    fn program_link_status(&self, program: ProgramHandle) -> bool {
        self.state
            .lock()
            .programs
            .get(&program.0)
            .map(|record| record.link_ok)
            .unwrap_or(false)
    }

    fn program_link_log(&self, program: ProgramHandle) -> String {
        let state = self.state.lock();
        match state.programs.get(&program.0) {
            Some(record) if !record.link_ok => "link rejected (scripted failure)".to_string(),
            _ => String::new(),
        }
    }

    fn delete_program(&self, program: ProgramHandle) {
        let mut state = self.state.lock();
        state.programs.remove(&program.0);
        if state.active_program == Some(program) {
            state.active_program = None;
        }
    }

    fn uniform_block_index(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.state
            .lock()
            .programs
            .get(&program.0)
            .and_then(|record| record.block_indices.get(name).copied())
    }

    fn set_uniform_block_binding(&self, program: ProgramHandle, block_index: u32, binding: u32) {
        if let Some(record) = self.state.lock().programs.get_mut(&program.0) {
            record.block_bindings.insert(block_index, binding);
        }
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.state
            .lock()
            .programs
            .get(&program.0)
            .and_then(|record| record.uniform_locations.get(name).copied())
    }

    fn create_buffer(&self) -> ContextResult<BufferHandle> {
        let mut state = self.state.lock();
        if state.fail_buffer_allocations {
            return Err(ContextError::BufferCreationFailed(
                "allocation rejected (scripted failure)".to_string(),
            ));
        }
        let id = state.next_id();
        state.buffers.insert(id, Vec::new());
        Ok(BufferHandle(id))
    }

    fn write_buffer(&self, buffer: BufferHandle, data: &[u8]) {
        if let Some(contents) = self.state.lock().buffers.get_mut(&buffer.0) {
            *contents = data.to_vec();
        }
    }

    fn delete_buffer(&self, buffer: BufferHandle) {
        self.state.lock().buffers.remove(&buffer.0);
    }

    fn set_active_program(&self, program: Option<ProgramHandle>) {
        let mut state = self.state.lock();
        state.active_program = match program {
            Some(handle) if state.programs.contains_key(&handle.0) => Some(handle),
            _ => None,
        };
    }
}
