//! colonygrid CLI — command-line interface for plate phenotyping.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use colonygrid::{
    PhenotypeConfig, Phenotyper, PlateImage, PredefinedRegion, Profile, Tile,
    UniformGridSegmenter,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "colonygrid")]
#[command(about = "Detect and quantify microbial colonies on gridded plate images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grid a plate image and analyze every cell.
    Analyze(CliAnalyzeArgs),

    /// Analyze a single tile image.
    Tile(CliTileArgs),

    /// Print a preset configuration as JSON.
    Config {
        #[arg(long, value_enum, default_value_t = ProfileArg::Basic)]
        profile: ProfileArg,
    },
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    /// JSON configuration file; missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Analysis profile. Selects the preset, or overrides the profile of
    /// a configuration file.
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,
}

#[derive(Debug, Clone, Args)]
struct CliAnalyzeArgs {
    /// Path to the plate image.
    #[arg(long)]
    image: PathBuf,

    /// Number of grid rows.
    #[arg(long)]
    rows: usize,

    /// Number of grid columns.
    #[arg(long)]
    cols: usize,

    /// Path to write the result matrix (JSON).
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    /// Grow (positive) or shrink (negative) every cell by this many pixels.
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    breathing: i32,

    /// JSON array with one user-defined region (or null) per cell, row-major.
    #[arg(long)]
    rois: Option<PathBuf>,

    /// Path to write the annotated plate image (PNG). Always rendered when given.
    #[arg(long)]
    diagnostic: Option<PathBuf>,

    /// Analyze tiles one after another instead of on the thread pool.
    #[arg(long)]
    sequential: bool,
}

#[derive(Debug, Clone, Args)]
struct CliTileArgs {
    /// Path to the tile image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the tile result (JSON).
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileArg {
    Basic,
    Color,
    Morphology,
    InAgar,
}

impl ProfileArg {
    fn to_core(self) -> Profile {
        match self {
            Self::Basic => Profile::Basic,
            Self::Color => Profile::Color,
            Self::Morphology => Profile::Morphology,
            Self::InAgar => Profile::InAgar,
        }
    }
}

impl ConfigArgs {
    fn load(&self) -> CliResult<PhenotypeConfig> {
        let mut config = match &self.config {
            Some(path) => PhenotypeConfig::from_json_file(path).map_err(|e| -> CliError {
                format!("Failed to load config {}: {}", path.display(), e).into()
            })?,
            None => PhenotypeConfig::for_profile(
                self.profile.map_or(Profile::Basic, ProfileArg::to_core),
            ),
        };
        if let (Some(_), Some(p)) = (&self.config, self.profile) {
            config.profile = p.to_core();
        }
        Ok(config)
    }
}

fn open_image(path: &Path) -> CliResult<PlateImage> {
    PlateImage::open(path).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", path.display(), e).into()
    })
}

fn load_rois(path: &Path) -> CliResult<Vec<Option<PredefinedRegion>>> {
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => run_analyze(&args),
        Commands::Tile(args) => run_tile(&args),
        Commands::Config { profile } => run_config(profile),
    }
}

// ── analyze ───────────────────────────────────────────────────────────

fn run_analyze(args: &CliAnalyzeArgs) -> CliResult<()> {
    tracing::info!("Loading image: {}", args.image.display());
    let plate = open_image(&args.image)?;
    tracing::info!(
        "Image size: {}x{} ({})",
        plate.width(),
        plate.height(),
        if plate.color.is_some() { "color" } else { "grayscale" }
    );

    let mut config = args.config.load()?;
    config.parallel = !args.sequential;
    config.render_diagnostic |= args.diagnostic.is_some();
    let profile = config.profile;

    let rois = match &args.rois {
        Some(path) => load_rois(path)?,
        None => Vec::new(),
    };

    let phenotyper = Phenotyper::new(config);
    let segmenter = UniformGridSegmenter::new(args.breathing);
    let report = phenotyper.analyze_plate(&plate, args.rows, args.cols, &segmenter, &rois)?;

    match report.matrix() {
        Some(m) => tracing::info!(
            "Measured {} of {} cells",
            m.measured_count(),
            args.rows * args.cols
        ),
        None => tracing::warn!("Gridding failed; no plate data written"),
    }

    let json = serde_json::json!({
        "image": args.image.display().to_string(),
        "profile": profile,
        "rows": args.rows,
        "cols": args.cols,
        "aborted": report.matrix().is_none(),
        "quality": report.quality,
        "results": report.matrix(),
    });
    std::fs::write(&args.out, serde_json::to_string_pretty(&json)?)?;
    tracing::info!("Results written to {}", args.out.display());

    match (&report.diagnostic, &args.diagnostic) {
        (Some(img), Some(path)) => {
            img.save(path)?;
            tracing::info!("Diagnostic image written to {}", path.display());
        }
        (Some(_), None) => {
            tracing::warn!("Grid check failed; pass --diagnostic to save the annotated plate")
        }
        _ => {}
    }

    Ok(())
}

// ── tile ──────────────────────────────────────────────────────────────

fn run_tile(args: &CliTileArgs) -> CliResult<()> {
    let image = open_image(&args.image)?;
    let tile = match image.color {
        Some(color) => Tile::from_color(0, 0, color),
        None => Tile::new(0, 0, image.gray),
    };

    let phenotyper = Phenotyper::new(args.config.load()?);
    let outcome = phenotyper.analyze_tile(&tile);
    tracing::info!("Tile outcome: {}", outcome.code());

    let result = outcome.into_result(0, 0);
    std::fs::write(&args.out, serde_json::to_string_pretty(&result)?)?;
    tracing::info!("Result written to {}", args.out.display());
    Ok(())
}

// ── config ────────────────────────────────────────────────────────────

fn run_config(profile: ProfileArg) -> CliResult<()> {
    let config = PhenotypeConfig::for_profile(profile.to_core());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
