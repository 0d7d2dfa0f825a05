use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::GrayImage;
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use voxel_regions::{
    Component, ExtractionConfig, ExtractionMode, FeatureRow, Resolution, SeriesExtraction,
    SortOrder, Volume, extract_series, feature_row, relabel_sorted,
};

#[derive(Parser, Debug)]
#[command(name = "vx_gallery")]
#[command(about = "Label volumetric images and export per-component shape descriptors")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Label a volume and write the labeled slices plus a feature table.
    #[command(name = "label")]
    Label(LabelArgs),
    /// Print the full descriptor set of every component as JSON.
    #[command(name = "descriptors")]
    Descriptors(LabelArgs),
}

#[derive(Args, Debug, Clone)]
struct LabelArgs {
    /// Grayscale PNG slices forming one volume, in z order.
    #[arg(long, num_args = 1.., conflicts_with = "synthetic")]
    slices: Vec<PathBuf>,

    /// Generate a synthetic two-ball test volume instead of reading input.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    #[arg(long, value_enum, default_value_t = ModeArg::Background)]
    mode: ModeArg,

    /// Reference value (background or exact value, depending on the mode).
    #[arg(long, default_value_t = 0.0)]
    value: f64,

    #[arg(long, default_value_t = 1)]
    min_size: usize,

    #[arg(long, default_value_t = usize::MAX)]
    max_size: usize,

    #[arg(long, default_value_t = false)]
    no_edge_x: bool,
    #[arg(long, default_value_t = false)]
    no_edge_y: bool,
    #[arg(long, default_value_t = false)]
    no_edge_z: bool,

    #[arg(long, value_enum, default_value_t = SortArg::Arbitrary)]
    sort: SortArg,

    /// Pixel sizes and frame interval as x:y:z:dt.
    #[arg(long, default_value = "1:1:1:1")]
    resolution: String,

    #[arg(long, default_value = "out")]
    out: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ModeArg {
    Background,
    BackgroundLabeled,
    Value,
    Roi,
}

impl From<ModeArg> for ExtractionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Background => ExtractionMode::BackgroundAll,
            ModeArg::BackgroundLabeled => ExtractionMode::BackgroundLabeled,
            ModeArg::Value => ExtractionMode::ExactValue,
            ModeArg::Roi => ExtractionMode::RegionOfInterest,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum SortArg {
    Arbitrary,
    DepthAsc,
    DepthDesc,
}

impl From<SortArg> for SortOrder {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Arbitrary => SortOrder::Arbitrary,
            SortArg::DepthAsc => SortOrder::DepthAscending,
            SortArg::DepthDesc => SortOrder::DepthDescending,
        }
    }
}

#[derive(Debug, Serialize)]
struct Meta {
    mode: String,
    value: f64,
    min_size: usize,
    max_size: usize,
    no_edge: [bool; 3],
    dims: [usize; 3],
    components: usize,
}

#[derive(Debug, Serialize)]
struct DescriptorReport {
    id: usize,
    t: usize,
    size: usize,
    is_2d: bool,
    on_edge: [bool; 3],
    bounding_box: ([i32; 3], [i32; 3]),
    mass_center: [f64; 3],
    bounding_sphere_radius: f64,
    row: FeatureRow,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Label(args) => run_label(args),
        Command::Descriptors(args) => run_descriptors(args),
    }
}

fn run_label(args: LabelArgs) -> Result<()> {
    let resolution = parse_resolution(&args.resolution)?;
    let volume = load_volume(&args)?;
    let mut extraction = extract(&volume, &args)?;
    relabel_sorted(&mut extraction, args.sort.into());

    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating output directory {}", args.out.display()))?;

    let labels = &extraction.labeled[0];
    let max_id = extraction.frames[0].len() as u32;
    for z in 0..labels.depth() {
        save_label_slice(
            args.out.join(format!("labels_z{z:03}.png")),
            labels,
            z,
            max_id,
        )?;
    }

    write_feature_csv(
        args.out.join("components.csv"),
        &extraction.frames[0],
        &resolution,
    )?;

    write_json(
        args.out.join("meta.json"),
        &Meta {
            mode: format!("{:?}", args.mode),
            value: args.value,
            min_size: args.min_size,
            max_size: args.max_size,
            no_edge: [args.no_edge_x, args.no_edge_y, args.no_edge_z],
            dims: [volume.width(), volume.height(), volume.depth()],
            components: extraction.total_components(),
        },
    )?;

    println!(
        "{} components written to {}",
        extraction.total_components(),
        args.out.display()
    );
    Ok(())
}

fn run_descriptors(args: LabelArgs) -> Result<()> {
    let resolution = parse_resolution(&args.resolution)?;
    let volume = load_volume(&args)?;
    let mut extraction = extract(&volume, &args)?;
    relabel_sorted(&mut extraction, args.sort.into());

    let mut reports = Vec::new();
    for (i, cc) in extraction.frames[0].iter().enumerate() {
        let (min, max) = cc.bounding_box();
        let center = cc.mass_center();
        let (_, radius) = cc.bounding_sphere();
        reports.push(DescriptorReport {
            id: i + 1,
            t: cc.t(),
            size: cc.size(),
            is_2d: cc.is_2d(),
            on_edge: [cc.on_edge_x(), cc.on_edge_y(), cc.on_edge_z()],
            bounding_box: ([min.x, min.y, min.z], [max.x, max.y, max.z]),
            mass_center: [center.x, center.y, center.z],
            bounding_sphere_radius: radius,
            row: feature_row(cc, i + 1, &resolution),
        });
    }

    let json = serde_json::to_string_pretty(&reports).context("serializing descriptors")?;
    println!("{json}");
    Ok(())
}

fn extract(volume: &Volume<u8>, args: &LabelArgs) -> Result<SeriesExtraction> {
    let cfg = ExtractionConfig {
        mode: args.mode.into(),
        value: args.value,
        min_size: args.min_size,
        max_size: args.max_size,
        no_edge_x: args.no_edge_x,
        no_edge_y: args.no_edge_y,
        no_edge_z: args.no_edge_z,
    };

    extract_series(std::slice::from_ref(volume), &cfg).context("extracting connected components")
}

fn load_volume(args: &LabelArgs) -> Result<Volume<u8>> {
    if args.synthetic {
        return Ok(synthetic_volume(48, 48, 24));
    }
    if args.slices.is_empty() {
        bail!("either --slices or --synthetic is required");
    }

    let mut slices = Vec::with_capacity(args.slices.len());
    let mut dims: Option<(usize, usize)> = None;
    for path in &args.slices {
        let gray = image::open(path)
            .with_context(|| format!("opening slice {}", path.display()))?
            .into_luma8();
        let (w, h) = (gray.width() as usize, gray.height() as usize);
        match dims {
            None => dims = Some((w, h)),
            Some(expected) if expected != (w, h) => {
                bail!(
                    "slice {} is {}x{}, expected {}x{}",
                    path.display(),
                    w,
                    h,
                    expected.0,
                    expected.1
                );
            }
            Some(_) => {}
        }
        slices.push(gray.into_raw());
    }

    let (w, h) = dims.expect("at least one slice");
    let mut data = Vec::with_capacity(w * h * slices.len());
    for slice in &slices {
        data.extend_from_slice(slice);
    }
    Volume::from_vec(w, h, slices.len(), data).context("assembling volume from slices")
}

/// Two solid balls, one clear of the border and one touching it.
fn synthetic_volume(w: usize, h: usize, d: usize) -> Volume<u8> {
    let mut vol = Volume::new_fill(w, h, d, 0u8);
    let balls = [
        ((w / 3) as f64, (h / 3) as f64, (d / 2) as f64, 6.0),
        ((w - 2) as f64, (2 * h / 3) as f64, (d / 2) as f64, 5.0),
    ];
    for z in 0..d {
        for y in 0..h {
            for x in 0..w {
                for &(cx, cy, cz, r) in &balls {
                    let (dx, dy, dz) = (x as f64 - cx, y as f64 - cy, z as f64 - cz);
                    if dx * dx + dy * dy + dz * dz <= r * r {
                        *vol.get_mut(x, y, z).expect("in bounds") = 255;
                    }
                }
            }
        }
    }
    vol
}

fn parse_resolution(text: &str) -> Result<Resolution> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != 4 {
        bail!("resolution must be x:y:z:dt, got '{text}'");
    }
    let mut values = [0.0f64; 4];
    for (value, part) in values.iter_mut().zip(&parts) {
        *value = part
            .parse()
            .with_context(|| format!("parsing resolution component '{part}'"))?;
    }
    Ok(Resolution {
        x: values[0],
        y: values[1],
        z: values[2],
        dt: values[3],
    })
}

fn save_label_slice(path: PathBuf, labels: &Volume<u32>, z: usize, max_id: u32) -> Result<()> {
    let (w, h) = (labels.width(), labels.height());
    let mut pixels = Vec::with_capacity(w * h);
    for &id in labels.slice(z) {
        pixels.push(if id == 0 || max_id == 0 {
            0u8
        } else {
            // Spread ids over the gray range, keeping 0 for background.
            (55 + (id as u64 * 200 / max_id as u64) as u8).min(255)
        });
    }

    let gray = GrayImage::from_raw(w as u32, h as u32, pixels)
        .context("constructing label image from raw bytes")?;
    gray.save(&path)
        .with_context(|| format!("saving image {}", path.display()))
}

fn write_feature_csv(path: PathBuf, components: &[Component], res: &Resolution) -> Result<()> {
    let mut file =
        fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    writeln!(file, "{}", FeatureRow::HEADER.join(",")).context("writing csv header")?;

    for (i, cc) in components.iter().enumerate() {
        let row = feature_row(cc, i + 1, res);
        let cells: Vec<String> = vec![
            row.index.to_string(),
            fmt(row.time),
            fmt(row.center_x),
            fmt(row.center_y),
            fmt(row.center_z),
            fmt(row.perimeter),
            fmt(row.area),
            fmt(row.sphericity),
            fmt(row.major_axis),
            fmt(row.minor_axis),
            fmt(row.minor_z_axis),
            fmt(row.eccentricity),
            fmt(row.hull_fill_ratio),
            fmt(row.m100),
            fmt(row.m010),
            fmt_opt(row.m001),
            fmt(row.m110),
            fmt_opt(row.m101),
            fmt_opt(row.m011),
            fmt_opt(row.m111),
            fmt(row.m200),
            fmt(row.m020),
            fmt_opt(row.m002),
            fmt(row.m220),
            fmt_opt(row.m202),
            fmt_opt(row.m022),
            fmt_opt(row.m222),
            fmt(row.convex_perimeter),
            fmt(row.convex_volume),
        ];
        writeln!(file, "{}", cells.join(",")).context("writing csv row")?;
    }
    Ok(())
}

fn fmt(value: f64) -> String {
    format!("{value:.6}")
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(fmt).unwrap_or_default()
}

fn write_json(path: PathBuf, value: &impl Serialize) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).context("serializing json")?;
    fs::write(&path, bytes).with_context(|| format!("writing json {}", path.display()))
}
