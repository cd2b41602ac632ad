use std::path::Path;

use clap::Parser;
use log::error;
use shaderlab_glsl::validate::check_round_trip;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The folder containing normalized .vert and .frag files.
    folder: String,
    /// File names to skip like "Hidden_Internal-Colored-d3d9-128.frag".
    #[arg(long, num_args = 1..)]
    exclude: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .init()
        .unwrap();

    let start = std::time::Instant::now();

    let mut total = 0;
    let mut failed = 0;
    for entry in globwalk::GlobWalkerBuilder::from_patterns(&cli.folder, &["*.{vert,frag}"])
        .build()
        .unwrap()
    {
        let path = entry.as_ref().unwrap().path();
        if is_excluded(path, &cli.exclude) {
            continue;
        }

        total += 1;
        let text = std::fs::read_to_string(path).unwrap();
        if let Err(e) = check_round_trip(&text) {
            error!("{path:?}: {e}");
            failed += 1;
        }
    }

    println!("{total} files | {failed} failed");
    println!("Finished in {:?}", start.elapsed());
}

fn is_excluded(path: &Path, exclude: &[String]) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| exclude.iter().any(|e| e == n))
}
