//! Compiled subprograms stored in decompressed [Segment](crate::blob::Segment) data.
//!
//! | Type | Description |
//! | --- | --- |
//! | u32 | date stamp |
//! | u32 | shader type id |
//! | 3 or 4 x u32 | reserved, see [HeaderLayout] |
//! | u32 | keyword count |
//! | keyword count x (u32, bytes) | keywords padded to 4 bytes |
//! | u32 | bytecode length |
//! | bytes | bytecode |
use std::{fmt::Display, io::Cursor};

use binrw::{args, binread, BinRead, BinResult};

use crate::error::UnsupportedShaderType;

/// The number of reserved values in the subprogram header.
/// Newer serialized versions add an extra value.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum HeaderLayout {
    /// Three reserved values.
    Legacy,
    /// Four reserved values.
    #[default]
    Current,
}

impl HeaderLayout {
    pub fn reserved_field_count(self) -> usize {
        match self {
            HeaderLayout::Legacy => 3,
            HeaderLayout::Current => 4,
        }
    }
}

#[binread]
#[derive(Debug, PartialEq, Eq, Clone)]
#[br(import { layout: HeaderLayout })]
pub struct SubProgram {
    /// A date or version stamp shared by subprograms from the same compiler.
    pub date_stamp: u32,
    /// An entry in the shader type table. See [ShaderType::from_id].
    pub shader_type_id: u32,

    #[br(count = layout.reserved_field_count())]
    pub reserved: Vec<u32>,

    #[br(temp)]
    keyword_count: u32,

    /// Preprocessor keywords enabled for this variant.
    #[br(count = keyword_count, map = |k: Vec<Keyword>| k.into_iter().map(|k| k.text).collect())]
    pub keywords: Vec<String>,

    #[br(temp)]
    bytecode_length: u32,

    #[br(count = bytecode_length)]
    pub bytecode: Vec<u8>,
}

#[binread]
#[derive(Debug)]
struct Keyword {
    #[br(temp)]
    length: u32,

    // Padding is relative to the start of the subprogram.
    #[br(count = length, map = |b: Vec<u8>| String::from_utf8_lossy(&b).into_owned())]
    #[br(align_after = 4)]
    text: String,
}

/// The leading fields shared by subprograms for every graphics API.
/// The remaining layout is only known for D3D9, so check [SubProgramHeader::eligible] first.
#[derive(Debug, PartialEq, Eq, Clone, Copy, BinRead)]
pub struct SubProgramHeader {
    pub date_stamp: u32,
    pub shader_type_id: u32,
}

impl SubProgramHeader {
    pub fn read(bytes: &[u8]) -> BinResult<Self> {
        Self::read_le(&mut Cursor::new(bytes))
    }

    pub fn shader_type(&self) -> Option<ShaderType> {
        ShaderType::from_id(self.shader_type_id)
    }

    /// Returns the shader type if the subprogram contains D3D9 bytecode.
    pub fn eligible(&self) -> Result<ShaderType, UnsupportedShaderType> {
        eligible(self.shader_type_id)
    }
}

impl SubProgram {
    /// Read a subprogram from the bytes for a single [SubProgramRange](crate::blob::SubProgramRange).
    pub fn read(bytes: &[u8], layout: HeaderLayout) -> BinResult<Self> {
        Self::read_le_args(&mut Cursor::new(bytes), args! { layout })
    }

    pub fn shader_type(&self) -> Option<ShaderType> {
        ShaderType::from_id(self.shader_type_id)
    }

    /// Returns the shader type if this subprogram contains D3D9 bytecode.
    pub fn eligible(&self) -> Result<ShaderType, UnsupportedShaderType> {
        eligible(self.shader_type_id)
    }
}

fn eligible(id: u32) -> Result<ShaderType, UnsupportedShaderType> {
    match ShaderType::from_id(id) {
        Some(shader_type) if shader_type.api == Api::D3D9 => Ok(shader_type),
        shader_type => Err(UnsupportedShaderType { id, shader_type }),
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    /// The GLSL file extension for this stage.
    pub fn extension(self) -> &'static str {
        match self {
            Stage::Vertex => "vert",
            Stage::Fragment => "frag",
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Api {
    D3D9,
    D3D11,
    OpenGl,
}

impl Display for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Api::D3D9 => write!(f, "d3d9"),
            Api::D3D11 => write!(f, "d3d11"),
            Api::OpenGl => write!(f, "opengl"),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ShaderType {
    pub stage: Stage,
    pub api: Api,
    /// The shader model version.
    pub version: f32,
}

impl ShaderType {
    pub fn from_id(id: u32) -> Option<Self> {
        let (stage, api, version) = match id {
            9 => (Stage::Vertex, Api::D3D9, 2.0),
            10 => (Stage::Vertex, Api::D3D9, 3.0),
            11 => (Stage::Fragment, Api::D3D9, 2.0),
            12 => (Stage::Fragment, Api::D3D9, 3.0),
            15 => (Stage::Vertex, Api::D3D11, 4.0),
            16 => (Stage::Vertex, Api::D3D11, 5.0),
            17 => (Stage::Fragment, Api::D3D11, 4.0),
            18 => (Stage::Fragment, Api::D3D11, 5.0),
            _ => return None,
        };
        Some(Self {
            stage,
            api,
            version,
        })
    }
}
