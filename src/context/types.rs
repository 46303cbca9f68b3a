//! Common types shared between graphics-context backends

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

/// Handle to a compiled shader stage object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageHandle(pub(crate) u64);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub(crate) u64);

/// Handle to a GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u64);

/// Handle to a resolved uniform location within a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub(crate) u64);

/// Shader pipeline stage kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageKind::Vertex => write!(f, "vertex"),
            StageKind::Fragment => write!(f, "fragment"),
        }
    }
}

/// Well-known uniform blocks with fixed binding slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformBlockId {
    LightBlock = 0,
    PixelShaderBlock = 1,
}

impl UniformBlockId {
    pub const ALL: [UniformBlockId; 2] =
        [UniformBlockId::LightBlock, UniformBlockId::PixelShaderBlock];

    /// Block name as declared in shader source
    pub fn name(&self) -> &'static str {
        match self {
            UniformBlockId::LightBlock => "LightBlock",
            UniformBlockId::PixelShaderBlock => "PixelShaderBlock",
        }
    }

    /// Fixed binding slot assigned to the block after linking
    pub fn binding(&self) -> u32 {
        *self as u32
    }
}

/// Vertex attributes with fixed locations, bound to every program before
/// linking so all programs share one vertex layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Position = 0,
    Normal = 1,
    Color0 = 2,
    Color1 = 3,
    Tex0 = 4,
    Tex1 = 5,
    Tex2 = 6,
    Tex3 = 7,
    Tex4 = 8,
    Tex5 = 9,
    Tex6 = 10,
    Tex7 = 11,
    SkinIndices = 12,
    SkinWeights = 13,
}

impl VertexAttribute {
    pub const ALL: [VertexAttribute; 14] = [
        VertexAttribute::Position,
        VertexAttribute::Normal,
        VertexAttribute::Color0,
        VertexAttribute::Color1,
        VertexAttribute::Tex0,
        VertexAttribute::Tex1,
        VertexAttribute::Tex2,
        VertexAttribute::Tex3,
        VertexAttribute::Tex4,
        VertexAttribute::Tex5,
        VertexAttribute::Tex6,
        VertexAttribute::Tex7,
        VertexAttribute::SkinIndices,
        VertexAttribute::SkinWeights,
    ];

    pub fn location(&self) -> u32 {
        *self as u32
    }

    /// Attribute name as declared in shader source
    pub fn gl_name(&self) -> &'static str {
        match self {
            VertexAttribute::Position => "Position",
            VertexAttribute::Normal => "Normal",
            VertexAttribute::Color0 => "Color0",
            VertexAttribute::Color1 => "Color1",
            VertexAttribute::Tex0 => "Tex0",
            VertexAttribute::Tex1 => "Tex1",
            VertexAttribute::Tex2 => "Tex2",
            VertexAttribute::Tex3 => "Tex3",
            VertexAttribute::Tex4 => "Tex4",
            VertexAttribute::Tex5 => "Tex5",
            VertexAttribute::Tex6 => "Tex6",
            VertexAttribute::Tex7 => "Tex7",
            VertexAttribute::SkinIndices => "SkinIndices",
            VertexAttribute::SkinWeights => "SkinWeights",
        }
    }
}

/// Number of texture sampler uniforms resolved per program
pub const TEXTURE_SAMPLER_COUNT: usize = 8;

/// Maximum number of lights in a [`LightBlock`]
pub const MAX_LIGHTS: usize = 8;

/// Uniform name of the sampler for a texture unit (`Texture[0]`..`Texture[7]`)
pub fn texture_sampler_name(unit: usize) -> String {
    format!("Texture[{unit}]")
}

/// One hardware light, std140 layout
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Light {
    pub position: Vec4,
    pub direction: Vec4,
    pub color: Vec4,
    pub cos_atten: Vec4,
    pub dist_atten: Vec4,
}

/// Payload of the `LightBlock` uniform block
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct LightBlock {
    pub lights: [Light; MAX_LIGHTS],
}

impl Default for LightBlock {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

/// Payload of the `PixelShaderBlock` uniform block, backed by the
/// per-program uniform buffer
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PixelShaderBlock {
    pub color_registers: [Vec4; 4],
    pub konst_colors: [Vec4; 4],
}

impl Default for PixelShaderBlock {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}
