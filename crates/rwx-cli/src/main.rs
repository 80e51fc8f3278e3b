//! rwx CLI - convert RWX models to Three.js JSON or glTF

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use rwx::export::{export_gltf, export_three, GltfOptions, ThreeJsOptions};
use rwx::{Clump, ReaderSettings};

#[derive(Parser)]
#[command(name = "rwx")]
#[command(about = "Convert RWX models to Three.js JSON or glTF", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a model to another format
    Convert {
        /// Input .rwx file
        input: PathBuf,
        /// Output file (format determined by extension: .json, .gltf, .glb)
        output: PathBuf,
        /// TOML file with reader settings
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write JSON without indentation
        #[arg(long)]
        compact: bool,
    },
    /// Display information about a model
    Info {
        /// Input .rwx file
        input: PathBuf,
        /// TOML file with reader settings
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the parsed scene graph as JSON
        #[arg(long)]
        dump: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    env_logger::init();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            config,
            compact,
        } => load_settings(config.as_deref())
            .and_then(|settings| convert(&input, &output, &settings, compact)),
        Commands::Info {
            input,
            config,
            dump,
        } => load_settings(config.as_deref())
            .and_then(|settings| show_info(&input, &settings, dump)),
    };

    if let Err(e) = result {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

fn load_settings(path: Option<&Path>) -> Result<ReaderSettings> {
    let Some(path) = path else {
        return Ok(ReaderSettings::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let settings: ReaderSettings = toml::from_str(&text)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    settings.validate().map_err(anyhow::Error::msg)?;
    Ok(settings)
}

fn read_model(input: &Path, settings: &ReaderSettings) -> Result<Clump> {
    let model = rwx::read_rwx_with_settings(input, settings)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    log::info!(
        "read {}: {} clumps, {} vertices, {} triangles",
        input.display(),
        model.clump_count(),
        model.vertex_count(),
        model.triangle_count()
    );
    Ok(model)
}

fn convert(input: &Path, output: &Path, settings: &ReaderSettings, compact: bool) -> Result<()> {
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if !matches!(ext.as_str(), "json" | "gltf" | "glb") {
        anyhow::bail!("Unknown output format: {}", ext);
    }

    let model = read_model(input, settings)?;

    // encoders create the file only after the model resolved and encoded
    let exported = if ext == "json" {
        let options = ThreeJsOptions {
            compact,
            ..Default::default()
        };
        export_three(&model, &options).and_then(|three| three.export(output, options.compact))
    } else {
        export_gltf(&model, &GltfOptions::default()).and_then(|gltf| gltf.export(output))
    };
    exported.with_context(|| format!("Failed to export {}", output.display()))?;

    println!("Exported {} to {}", ext.to_uppercase(), output.display());
    Ok(())
}

fn show_info(input: &Path, settings: &ReaderSettings, dump: bool) -> Result<()> {
    let model = read_model(input, settings)?;
    if dump {
        println!("{}", model.to_json()?);
        return Ok(());
    }
    let scene = rwx::resolve(&model)?;

    println!("File: {}", input.display());
    println!("Clumps: {}", model.clump_count());
    println!("Vertices: {}", model.vertex_count());
    println!("Triangles: {}", model.triangle_count());
    println!("Materials: {}", scene.materials.len());
    if model.tag != 0 {
        println!("Tag: {}", model.tag);
    }
    Ok(())
}
