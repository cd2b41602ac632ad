//! A library for reading compiled Shaderlab subprograms from Unity shader assets.
//!
//! # Getting Started
//! A [ShaderAsset](crate::blob::ShaderAsset) stores its subprograms in LZ4 compressed segments.
//! Decompress the segments first and then read each subprogram using its byte range.
//!
//! ```rust no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use shaderlab_lib::blob::ShaderAsset;
//! use shaderlab_lib::subprogram::{HeaderLayout, SubProgram};
//!
//! # let asset: ShaderAsset = todo!();
//! for segment in asset.segments()? {
//!     for range in &segment.subprograms {
//!         let subprogram = SubProgram::read(segment.subprogram_bytes(range), HeaderLayout::Current)?;
//!         println!("{:?}", subprogram.shader_type());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! Binary structures are Rust types with binrw attribute annotations.
//! The container arithmetic is validated up front,
//! so corrupted assets are rejected before any decompression takes place.
//! Subprograms are only decoded and never written back.
pub mod blob;
pub mod error;
pub mod subprogram;
pub mod vector;
