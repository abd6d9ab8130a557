//! Command-line renderer: loads a dataset and writes one image.

#![allow(clippy::cast_precision_loss)]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use ptint::{
    headless, BackendKind, Decomposition, DatasetFormat, GridOptions, IlluminationControl,
    MeshStore, Pipeline, ProjectionKind, RenderConfig, SortMethod, TransferFunction,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Off,
    GradientOff,
    Geo,
    Bin8,
    Bin16le,
    Bin16be,
    Multi8,
    Multi16le,
    Multi16be,
    Pnm,
}

impl From<FormatArg> for DatasetFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Off => Self::Off,
            FormatArg::GradientOff => Self::GradientOff,
            FormatArg::Geo => Self::Geo,
            FormatArg::Bin8 => Self::Bin8,
            FormatArg::Bin16le => Self::Bin16Le,
            FormatArg::Bin16be => Self::Bin16Be,
            FormatArg::Multi8 => Self::MultiRaw8,
            FormatArg::Multi16le => Self::MultiRaw16Le,
            FormatArg::Multi16be => Self::MultiRaw16Be,
            FormatArg::Pnm => Self::Pnm8,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Cpu,
    Gpu,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    None,
    Centroid,
    Bucket,
}

impl From<SortArg> for SortMethod {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::None => Self::None,
            SortArg::Centroid => Self::Centroid,
            SortArg::Bucket => Self::Bucket,
        }
    }
}

/// Projected tetrahedra volume renderer with partial pre-integration.
#[derive(Debug, Parser)]
#[command(name = "ptint", version, about)]
struct Args {
    /// Dataset file (or base name of a slice stack)
    dataset: PathBuf,

    /// Dataset format; guessed from the extension when omitted
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Voxel counts of a grid dataset
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"])]
    dims: Option<Vec<u32>>,

    /// Sampling step in x and y for grid datasets
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    step_xy: u32,

    /// Sampling step in z for grid datasets
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    step_z: u32,

    /// Split grid cells into six tetrahedra instead of five
    #[arg(long)]
    six_tets: bool,

    /// Output image (PNG or JPEG by extension)
    #[arg(short, long, default_value = "ptint.png")]
    output: PathBuf,

    /// JSON render configuration; command-line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Sort used for still frames
    #[arg(long, value_enum)]
    still_sort: Option<SortArg>,

    /// Sort used while rotating
    #[arg(long, value_enum)]
    rotating_sort: Option<SortArg>,

    /// Use averaged attenuation instead of the pre-integration table
    #[arg(long)]
    no_integrate: bool,

    /// Shade with vertex gradients (gradient datasets only)
    #[arg(long)]
    shading: bool,

    #[arg(long)]
    perspective: bool,

    /// Transfer function file
    #[arg(long)]
    tf: Option<PathBuf>,

    /// Illumination control file
    #[arg(long)]
    illumination: Option<PathBuf>,

    /// Camera rotation about the vertical axis, in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    rotate_y: f32,

    /// Camera rotation about the horizontal axis, in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    rotate_x: f32,

    /// Spread the rotation over this many interactive frames before the still frame
    #[arg(long, default_value_t = 0)]
    frames: u32,
}

impl Args {
    fn render_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path)
                .with_context(|| format!("failed to read config {}", path.display()))?,
            None => RenderConfig::default(),
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(backend) = self.backend {
            config.backend = match backend {
                BackendArg::Cpu => BackendKind::Cpu,
                BackendArg::Gpu => BackendKind::Gpu,
            };
        }
        if let Some(sort) = self.still_sort {
            config.still_sort = sort.into();
        }
        if let Some(sort) = self.rotating_sort {
            config.rotating_sort = sort.into();
        }
        if self.no_integrate {
            config.integrating = false;
        }
        if self.shading {
            config.shading = true;
        }
        if self.perspective {
            config.projection = ProjectionKind::Perspective;
        }
        if config.width == 0 || config.height == 0 {
            bail!("image size must be positive, got {}x{}", config.width, config.height);
        }
        Ok(config)
    }

    fn dataset_format(&self) -> Result<DatasetFormat> {
        match self.format {
            Some(format) => Ok(format.into()),
            None => DatasetFormat::from_extension(&self.dataset).with_context(|| {
                format!(
                    "cannot guess the format of {}, pass --format",
                    self.dataset.display()
                )
            }),
        }
    }

    fn grid_options(&self, format: DatasetFormat) -> Result<GridOptions> {
        let mut grid = GridOptions::default();
        match &self.dims {
            Some(dims) => grid.dims = [dims[0], dims[1], dims[2]],
            None if format.is_grid() => bail!("{format:?} datasets need --dims X Y Z"),
            None => {}
        }
        grid.step_xy = self.step_xy;
        grid.step_z = self.step_z;
        if self.six_tets {
            grid.decomposition = Decomposition::Six;
        }
        Ok(grid)
    }
}

fn main() -> Result<()> {
    ptint::init_logging();
    let args = Args::parse();

    let config = args.render_config()?;
    let format = args.dataset_format()?;
    let grid = args.grid_options(format)?;
    let mesh = MeshStore::load(&args.dataset, format, &grid)
        .with_context(|| format!("failed to load {}", args.dataset.display()))?;
    if config.shading && !mesh.has_gradients() {
        log::warn!("--shading needs a gradient dataset, rendering unshaded");
    }

    let mut pipeline = Pipeline::new(mesh, config).context("failed to create the pipeline")?;
    if let Some(path) = &args.tf {
        let tf = TransferFunction::read(path)
            .with_context(|| format!("failed to read transfer function {}", path.display()))?;
        pipeline.set_transfer_function(tf)?;
    }
    if let Some(path) = &args.illumination {
        let illumination = IlluminationControl::read(path)
            .with_context(|| format!("failed to read illumination {}", path.display()))?;
        pipeline.set_illumination(illumination);
    }

    let (dx, dy) = (args.rotate_y.to_radians(), args.rotate_x.to_radians());
    let rendered = if args.frames > 0 {
        let n = args.frames as f32;
        headless::render_orbit_to_file(&mut pipeline, args.frames, (dx / n, dy / n), &args.output)
    } else {
        pipeline.camera_mut().orbit(dx, dy);
        headless::render_to_file(&mut pipeline, &args.output)
    };
    rendered.with_context(|| format!("failed to render {}", args.output.display()))?;

    log::info!(
        "rendered {} of {} tetrahedra to {}",
        pipeline.cur_tets(),
        pipeline.num_tets(),
        args.output.display()
    );
    Ok(())
}
