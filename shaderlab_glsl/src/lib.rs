//! Normalize disassembled D3D9 shaders from Unity shader assets into WebGL compatible GLSL.
//!
//! The disassembler output uses register names like `vs_c4` or `ps_s0`
//! with the actual names stored separately in the bytecode's constant table.
//! Normalizing replaces the register names with their semantic names and rebuilds the text
//! with consistent formatting, so the same bytecode always produces the same GLSL.
//!
//! # Getting Started
//! ```rust no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use shaderlab_glsl::extract::normalize_glsl;
//! use shaderlab_glsl::disassembler::DisassembledProgram;
//! use shaderlab_lib::subprogram::Stage;
//!
//! let json = std::fs::read_to_string("program.json")?;
//! let disassembled: DisassembledProgram = serde_json::from_str(&json)?;
//! let glsl = normalize_glsl(&disassembled, Stage::Fragment, &[], None)?;
//! println!("{glsl}");
//! # Ok(())
//! # }
//! ```
pub mod ast;
pub mod disassembler;
pub mod extract;
pub mod parse;
pub mod remap;
pub mod render;
pub mod rewrite;
pub mod validate;
