use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use log::error;
use serde::Deserialize;
use shaderlab_glsl::{
    ast::Program,
    disassembler::{Disassembler, ProcessDisassembler, Profile},
    extract::{ExtractOptions, ExtractSummary, extract_properties, extract_shader},
    render::BuildOptions,
};
use shaderlab_lib::{blob::ShaderAsset, subprogram::HeaderLayout};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Decrease logging output. Repeat for fewer messages.
    #[arg(short, action = clap::ArgAction::Count, global = true)]
    quiet: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and normalize the D3D9 subprograms for each asset manifest.
    /// Each manifest "name.json" needs the compressed data in "name.blob" in the same folder.
    /// Vector and color material properties in the manifest are saved as JSON.
    ExtractShaders {
        /// The folder containing asset manifests.
        input_folder: String,
        /// The output folder for the normalized GLSL.
        output_folder: String,
        /// The path to the disassembler executable.
        /// Only the bytecode is saved if not specified.
        #[arg(long)]
        disassembler: Option<String>,
        /// The GLSL dialect for the disassembler.
        #[arg(long, default_value_t = Profile::GlslEs)]
        profile: Profile,
        /// The number of reserved values in each subprogram header.
        #[arg(long, value_enum, default_value_t = Layout::Current)]
        layout: Layout,
        /// Replace the version directive in the output.
        #[arg(long)]
        version_override: Option<u32>,
        /// Also save the keywords, subprogram bytes, and bytecode.
        #[arg(long)]
        raw: bool,
    },
    /// Parse a GLSL file and print the rebuilt text.
    Normalize {
        /// The disassembled GLSL file.
        file: String,
        /// Replace the version directive in the output.
        #[arg(long)]
        version_override: Option<u32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Layout {
    Legacy,
    Current,
}

impl From<Layout> for HeaderLayout {
    fn from(value: Layout) -> Self {
        match value {
            Layout::Legacy => HeaderLayout::Legacy,
            Layout::Current => HeaderLayout::Current,
        }
    }
}

/// The JSON metadata stored next to each compressed blob.
#[derive(Deserialize)]
struct AssetManifest {
    name: String,
    compressed_sizes: Vec<u32>,
    decompressed_sizes: Vec<u32>,
    compressed_offsets: Vec<u32>,
    /// Material property components like `{"_Color": {"r": 1.0, "g": 1.0, "b": 1.0, "a": 1.0}}`.
    #[serde(default)]
    properties: BTreeMap<String, BTreeMap<String, f32>>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.quiet {
        0 => log::LevelFilter::Debug,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Warn,
    };
    simple_logger::SimpleLogger::new().with_level(level).init()?;

    let start = std::time::Instant::now();

    match cli.command {
        Commands::ExtractShaders {
            input_folder,
            output_folder,
            disassembler,
            profile,
            layout,
            version_override,
            raw,
        } => {
            let options = ExtractOptions {
                layout: layout.into(),
                profile,
                version_override,
                save_raw: raw,
            };
            let disassembler = disassembler.map(ProcessDisassembler::new);
            let summary = extract_shaders(
                &input_folder,
                &output_folder,
                disassembler.as_ref().map(|d| d as &dyn Disassembler),
                &options,
            )?;
            println!(
                "{} processed | {} skipped | {} failed",
                summary.processed, summary.skipped, summary.failed
            );
        }
        Commands::Normalize {
            file,
            version_override,
        } => {
            let text = std::fs::read_to_string(&file).with_context(|| format!("{file:?}"))?;
            match Program::parse(&text) {
                Ok(program) => print!(
                    "{}",
                    program.to_glsl(&BuildOptions {
                        version_override,
                        keywords: &[],
                    })
                ),
                Err(e) => error!("Error parsing {file:?}: {e}"),
            }
        }
    }

    println!("Finished in {:?}", start.elapsed());
    Ok(())
}

fn extract_shaders(
    input: &str,
    output: &str,
    disassembler: Option<&dyn Disassembler>,
    options: &ExtractOptions,
) -> anyhow::Result<ExtractSummary> {
    let mut paths: Vec<PathBuf> = globwalk::GlobWalkerBuilder::from_patterns(input, &["*.json"])
        .build()?
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_owned())
        .collect();
    // Process assets in a consistent order.
    paths.sort();

    let mut summary = ExtractSummary::default();
    for path in paths {
        let (asset, properties) = match load_asset(&path) {
            Ok(loaded) => loaded,
            Err(e) => {
                error!("Error reading {path:?}: {e:?}");
                continue;
            }
        };

        match extract_shader(&asset, output, disassembler, options) {
            Ok(asset_summary) => summary += asset_summary,
            Err(e) => error!("Error extracting {path:?}: {e}"),
        }

        if let Err(e) = extract_properties(&asset.name, &properties, output) {
            error!("Error extracting properties for {path:?}: {e}");
        }
    }

    Ok(summary)
}

fn load_asset(
    path: &Path,
) -> anyhow::Result<(ShaderAsset, BTreeMap<String, BTreeMap<String, f32>>)> {
    let json = std::fs::read_to_string(path)?;
    let manifest: AssetManifest =
        serde_json::from_str(&json).with_context(|| format!("invalid manifest {path:?}"))?;

    let blob_path = path.with_extension("blob");
    let blob = std::fs::read(&blob_path).with_context(|| format!("missing blob {blob_path:?}"))?;

    let asset = ShaderAsset {
        name: manifest.name,
        blob,
        compressed_sizes: manifest.compressed_sizes,
        decompressed_sizes: manifest.decompressed_sizes,
        compressed_offsets: manifest.compressed_offsets,
    };
    Ok((asset, manifest.properties))
}
