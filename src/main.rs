//! Training samples CLI.
//!
//! Generate random training sample polygons from a single-band
//! classified raster.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use training_samples::algorithm::parameters::OUTPUT;
use training_samples::algorithm::{Parameters, TrainingSampleGenerator, ALGORITHM_INFO};
use training_samples::config::GeneratorConfig;
use training_samples::pipeline::LogFeedback;
use training_samples::raster::Raster;
use training_samples::vector::{Destination, LayerRef};

/// Random training sample generator for raster classification.
#[derive(Parser)]
#[command(name = "training-samples")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate training sample polygons from a classified raster.
    Generate {
        /// Input raster (GeoTIFF, or a single-band image with a world file).
        #[arg(short, long)]
        input: PathBuf,

        /// Output destination: a .geojson file, or "memory:" to print a summary only.
        #[arg(short, long)]
        output: Destination,

        /// Minimum distance between points, in raster units.
        #[arg(short, long, default_value = "0.1")]
        distance: f64,

        /// Number of points to generate.
        #[arg(short = 'n', long, default_value = "100")]
        points: u32,

        /// Random seed for reproducible sampling.
        #[arg(short, long)]
        seed: Option<u64>,

        /// TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for intermediate files.
        #[arg(long)]
        work_dir: Option<PathBuf>,
    },

    /// Display information about a raster.
    Info {
        /// Input raster.
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Describe the algorithm and its parameters.
    Describe,

    /// Print an example configuration file.
    ExampleConfig,
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Generate {
            input,
            output,
            distance,
            points,
            seed,
            config,
            work_dir,
        } => run_generate(input, output, distance, points, seed, config.as_deref(), work_dir),
        Commands::Info { input } => run_info(&input),
        Commands::Describe => {
            run_describe();
            Ok(())
        }
        Commands::ExampleConfig => {
            let text = GeneratorConfig::example()
                .to_toml()
                .context("Failed to serialize example configuration")?;
            print!("{}", text);
            Ok(())
        }
    }
}

fn run_generate(
    input: PathBuf,
    output: Destination,
    distance: f64,
    points: u32,
    seed: Option<u64>,
    config_path: Option<&Path>,
    work_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => GeneratorConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => GeneratorConfig::default(),
    };
    if seed.is_some() {
        config.sampling.seed = seed;
    }
    if work_dir.is_some() {
        config.work_dir = work_dir;
    }

    println!("{}", ALGORITHM_INFO.display_name);
    println!("==========================");
    println!("Input: {}", input.display());
    println!("Output: {}", output);
    println!("Points: {} (min distance {})", points, distance);
    match config.sampling.seed {
        Some(seed) => println!("Seed: {}", seed),
        None => println!("Seed: random"),
    }
    println!(
        "Buffer: {} units, {} segments per quarter",
        config.buffer.distance, config.buffer.segments
    );

    let params = Parameters::new(input, output)
        .with_distance(distance)
        .with_points(points);
    let generator = TrainingSampleGenerator::new(config);
    let feedback = LogFeedback::default();

    println!("\nRunning generation pipeline...");
    let start = Instant::now();
    let results = generator
        .process_with_callbacks(
            &params,
            &feedback,
            |name, i, total| println!("  [{}/{}] Starting: {}", i + 1, total, name),
            |name, i, total| println!("  [{}/{}] Completed: {}", i + 1, total, name),
        )
        .context("Training sample generation failed")?;
    let elapsed = start.elapsed();

    match results.get(OUTPUT) {
        Some(layer) => {
            println!("Generation completed in {:.2?}", elapsed);
            print_output_summary(layer);
        }
        None => println!("Generation cancelled after {:.2?}", elapsed),
    }
    Ok(())
}

fn print_output_summary(layer: &LayerRef) {
    match layer {
        LayerRef::Memory(layer) => {
            println!("\nOutput layer '{}' (in memory)", layer.name());
            println!("  Features: {}", layer.len());
            let fields: Vec<&str> = layer.fields().iter().map(|f| f.name.as_str()).collect();
            println!("  Fields: {}", fields.join(", "));
            if let Some(extent) = layer.extent() {
                println!(
                    "  Extent: [{:.4}, {:.4}] - [{:.4}, {:.4}]",
                    extent.min_x, extent.min_y, extent.max_x, extent.max_y
                );
            }
        }
        LayerRef::File(path) => println!("\nOutput written to {}", path.display()),
    }
}

fn run_info(input: &Path) -> Result<()> {
    let raster = Raster::open(input).with_context(|| format!("Failed to open raster {:?}", input))?;
    let extent = raster.extent();
    let transform = raster.transform();

    println!("Raster: {}", raster.name());
    println!("================");
    println!("Size: {} x {} pixels", raster.width(), raster.height());
    println!(
        "Pixel size: {} x {}",
        transform.pixel_width, transform.pixel_height
    );
    println!(
        "Extent: [{:.4}, {:.4}] - [{:.4}, {:.4}]",
        extent.min_x, extent.min_y, extent.max_x, extent.max_y
    );
    println!("Spatial reference: {}", raster.spatial_ref());
    match raster.nodata() {
        Some(nodata) => println!("No-data value: {}", nodata),
        None => println!("No-data value: none"),
    }

    let counts = raster.class_counts();
    let total: usize = counts.values().sum();
    println!("\nClasses: {}", counts.len());
    for (class, count) in counts.iter().take(32) {
        println!(
            "  {:>6}: {:>10} ({:.2}%)",
            class,
            count,
            *count as f64 / total.max(1) as f64 * 100.0
        );
    }
    if counts.len() > 32 {
        println!("  ... {} more", counts.len() - 32);
    }
    Ok(())
}

fn run_describe() {
    let generator = TrainingSampleGenerator::default();
    let info = generator.info();

    println!("{} ({})", info.display_name, info.name);
    println!("Group: {} ({})", info.group, info.group_id);
    println!("\n{}", info.short_help);
    println!("\nParameters:");
    for def in generator.parameter_definitions() {
        let required = if def.optional { "optional" } else { "required" };
        println!("  {:<24} {} [{}, {}]", def.name, def.description, def.kind, required);
    }
}
