//! Converting D3D9 bytecode to GLSL and register metadata.
//!
//! There isn't Rust code for disassembling D3D9 bytecode,
//! so [ProcessDisassembler] runs an external executable and reads JSON from stdout.
use std::{
    path::{Path, PathBuf},
    process::Command,
};

use log::trace;
use serde::Deserialize;
use strum::{Display, EnumString};
use thiserror::Error;

/// The GLSL dialect produced by the disassembler.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, EnumString, Display)]
pub enum Profile {
    #[strum(serialize = "glsl")]
    Glsl,
    #[strum(serialize = "glsl120")]
    Glsl120,
    #[default]
    #[strum(serialize = "glsles")]
    GlslEs,
}

/// The output of the disassembler for a single subprogram.
#[derive(Debug, PartialEq, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DisassembledProgram {
    /// The constant table with semantic names.
    pub symbols: Vec<Symbol>,
    pub attributes: Vec<Attribute>,
    pub uniforms: Vec<Uniform>,
    pub constants: Vec<Constant>,
    pub outputs: Vec<Output>,
    pub text: String,
}

/// A constant table entry like `_MainTex` in sampler register 0.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub register_set: RegisterSet,
    pub register_index: u32,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegisterSet {
    Bool,
    Int4,
    Float4,
    Sampler,
}

/// A vertex input like `vs_v0`.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub usage: Usage,
    pub index: u32,
}

/// A register used by the program like `vs_c4` or `ps_s0`.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct Uniform {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: UniformType,
    pub array_count: u32,
    pub index: u32,
    pub constant_slot: i32,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UniformType {
    Float,
    Int,
    Bool,
}

/// A value defined in the bytecode with `def`.
#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct Constant {
    #[serde(rename = "type")]
    pub ty: UniformType,
    pub index: u32,
    pub value: [f32; 4],
}

#[derive(Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct Output {
    pub name: String,
    pub usage: Usage,
    pub index: u32,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Usage {
    Position,
    BlendWeight,
    BlendIndices,
    Normal,
    PointSize,
    TexCoord,
    Tangent,
    Binormal,
    TessFactor,
    PositionT,
    Color,
    Fog,
    Depth,
    Sample,
}

#[derive(Debug, Error)]
pub enum DisassembleError {
    #[error("error running disassembler: {0}")]
    Io(#[from] std::io::Error),

    #[error("error reading disassembler output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("disassembly failed: {}", errors.join("; "))]
    ParseFailure { errors: Vec<String> },
}

pub trait Disassembler {
    fn disassemble(
        &self,
        bytecode: &[u8],
        profile: Profile,
    ) -> Result<DisassembledProgram, DisassembleError>;
}

/// Run `<executable> <bytecode file> <profile>` and read the JSON [DisassembledProgram] from stdout.
#[derive(Debug, Clone)]
pub struct ProcessDisassembler {
    pub executable: PathBuf,
    /// The file used to pass bytecode to the executable.
    pub bytecode_path: PathBuf,
}

impl ProcessDisassembler {
    pub fn new<P: AsRef<Path>>(executable: P) -> Self {
        let bytecode_path =
            std::env::temp_dir().join(format!("shaderlab_{}.co", std::process::id()));
        Self {
            executable: executable.as_ref().to_owned(),
            bytecode_path,
        }
    }
}

impl Disassembler for ProcessDisassembler {
    fn disassemble(
        &self,
        bytecode: &[u8],
        profile: Profile,
    ) -> Result<DisassembledProgram, DisassembleError> {
        std::fs::write(&self.bytecode_path, bytecode)?;

        trace!("{:?} {:?} {profile}", self.executable, self.bytecode_path);
        let output = Command::new(&self.executable)
            .arg(&self.bytecode_path)
            .arg(profile.to_string())
            .output();

        // Remove the temporary file even if the process failed to start.
        std::fs::remove_file(&self.bytecode_path)?;
        let output = output?;

        if !output.status.success() {
            let errors = String::from_utf8_lossy(&output.stderr)
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(|l| l.to_string())
                .collect();
            return Err(DisassembleError::ParseFailure { errors });
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}
