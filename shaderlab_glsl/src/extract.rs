use std::{collections::BTreeMap, ops::AddAssign, path::Path};

use log::{debug, error, info, warn};
use shaderlab_lib::{
    blob::ShaderAsset,
    error::ContainerCorrupt,
    subprogram::{HeaderLayout, Stage, SubProgram, SubProgramHeader},
    vector::{FixedPrecision, PropertyValue},
};
use thiserror::Error;

use crate::{
    ast::Program,
    disassembler::{DisassembleError, DisassembledProgram, Disassembler, Profile},
    parse::ParseError,
    remap::{RemapError, SymbolMapping},
    render::BuildOptions,
};

/// Settings shared by all subprograms in an extraction.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub layout: HeaderLayout,
    pub profile: Profile,
    pub version_override: Option<u32>,
    /// Also save the keywords, subprogram bytes, and bytecode for each subprogram.
    pub save_raw: bool,
}

/// Subprogram counts for one or more extracted assets.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct ExtractSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl AddAssign for ExtractSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.processed += rhs.processed;
        self.skipped += rhs.skipped;
        self.failed += rhs.failed;
    }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("error disassembling bytecode: {0}")]
    Disassemble(#[from] DisassembleError),

    #[error("error mapping registers: {0}")]
    Remap(#[from] RemapError),

    #[error("error parsing disassembled GLSL: {0}")]
    Parse(#[from] ParseError),
}

#[derive(Debug, Error)]
pub enum ExtractShaderError {
    #[error("error decoding shader blob: {0}")]
    Container(#[from] ContainerCorrupt),

    #[error("error writing output files: {0}")]
    Io(#[from] std::io::Error),

    #[error("error serializing properties: {0}")]
    Json(#[from] serde_json::Error),
}

/// Normalize each D3D9 subprogram in `asset` to a GLSL file in `output_folder`.
///
/// Subprograms for other graphics APIs are skipped.
/// Errors for individual subprograms are logged and counted as failed.
/// Without a `disassembler`, only the bytecode is saved.
pub fn extract_shader<P: AsRef<Path>>(
    asset: &ShaderAsset,
    output_folder: P,
    disassembler: Option<&dyn Disassembler>,
    options: &ExtractOptions,
) -> Result<ExtractSummary, ExtractShaderError> {
    let output_folder = output_folder.as_ref();
    let name = asset.name.replace('/', "_");

    let mut summary = ExtractSummary::default();

    for segment in asset.segments()? {
        for range in &segment.subprograms {
            let bytes = segment.subprogram_bytes(range);

            // Check the type first since only the D3D9 layout is known.
            let shader_type = match SubProgramHeader::read(bytes).map(|h| h.eligible()) {
                Ok(Ok(shader_type)) => shader_type,
                Ok(Err(e)) => {
                    info!(
                        "Skipping {} subprogram at offset {}: {e}",
                        asset.name, range.offset
                    );
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!(
                        "Error reading {} subprogram at offset {}: {e}",
                        asset.name, range.offset
                    );
                    summary.failed += 1;
                    continue;
                }
            };

            let subprogram = match SubProgram::read(bytes, options.layout) {
                Ok(subprogram) => subprogram,
                Err(e) => {
                    error!(
                        "Error reading {} subprogram at offset {}: {e}",
                        asset.name, range.offset
                    );
                    summary.failed += 1;
                    continue;
                }
            };

            let file_name = format!("{name}-{}-{}", shader_type.api, range.offset);
            let output_path =
                |extension: &str| output_folder.join(format!("{file_name}.{extension}"));

            if options.save_raw {
                if !subprogram.keywords.is_empty() {
                    write_file(&output_path("tags"), subprogram.keywords.join("\n"))?;
                }
                write_file(&output_path("bin"), bytes)?;
                write_file(&output_path("co"), &subprogram.bytecode)?;
            }

            match disassembler {
                Some(disassembler) => {
                    match normalize_subprogram(&subprogram, shader_type.stage, disassembler, options)
                    {
                        Ok(glsl) => {
                            write_file(&output_path(shader_type.stage.extension()), glsl)?;
                            summary.processed += 1;
                        }
                        Err(e) => {
                            error!(
                                "Error normalizing {} subprogram at offset {}: {e}",
                                asset.name, range.offset
                            );
                            if !options.save_raw {
                                write_file(&output_path("co"), &subprogram.bytecode)?;
                            }
                            summary.failed += 1;
                        }
                    }
                }
                None => {
                    if !options.save_raw {
                        write_file(&output_path("co"), &subprogram.bytecode)?;
                    }
                    summary.processed += 1;
                }
            }
        }
    }

    Ok(summary)
}

/// Disassemble and normalize the bytecode for a single D3D9 subprogram.
pub fn normalize_subprogram(
    subprogram: &SubProgram,
    stage: Stage,
    disassembler: &dyn Disassembler,
    options: &ExtractOptions,
) -> Result<String, NormalizeError> {
    let disassembled = disassembler.disassemble(&subprogram.bytecode, options.profile)?;
    normalize_glsl(
        &disassembled,
        stage,
        &subprogram.keywords,
        options.version_override,
    )
}

/// Replace register names in the disassembled GLSL and rebuild the text.
pub fn normalize_glsl(
    disassembled: &DisassembledProgram,
    stage: Stage,
    keywords: &[String],
    version_override: Option<u32>,
) -> Result<String, NormalizeError> {
    let mut mapping = SymbolMapping::from_program(disassembled, stage)?;
    let mut program = Program::parse(&disassembled.text)?;
    program.apply_mapping(&mut mapping)?;

    Ok(program.to_glsl(&BuildOptions {
        version_override,
        keywords,
    }))
}

/// Convert material property components like `{"r": 1.0, "g": 0.5, "b": 0.0, "a": 1.0}`
/// to vectors and colors. Other properties are skipped.
pub fn property_values(
    properties: &BTreeMap<String, BTreeMap<String, f32>>,
) -> BTreeMap<String, PropertyValue> {
    properties
        .iter()
        .filter_map(|(name, components)| match PropertyValue::from_components(components) {
            Some(value) => {
                debug!("{name} = {}", value.fixed_text());
                Some((name.clone(), value))
            }
            None => {
                warn!("Skipping property {name} with components {components:?}");
                None
            }
        })
        .collect()
}

/// Save the vector and color `properties` for the asset `name` as JSON in `output_folder`.
/// Returns the number of saved properties.
pub fn extract_properties<P: AsRef<Path>>(
    name: &str,
    properties: &BTreeMap<String, BTreeMap<String, f32>>,
    output_folder: P,
) -> Result<usize, ExtractShaderError> {
    let values = property_values(properties);
    if !values.is_empty() {
        let path = output_folder
            .as_ref()
            .join(format!("{}-properties.json", name.replace('/', "_")));
        write_file(&path, serde_json::to_string_pretty(&values)?)?;
    }
    Ok(values.len())
}

fn write_file<C: AsRef<[u8]>>(path: &Path, contents: C) -> std::io::Result<()> {
    if path.exists() {
        warn!("Overwriting existing file {path:?}");
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}
