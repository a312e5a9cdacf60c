use clap::Parser;
use glob::glob;
use kiss_icp_config::{
    io::{load_config, write_config},
    point3d::{self, Point3, PointXyz},
    preprocessing::correct_kitti_scan,
    preprocessor::Preprocessor,
    voxel_util::voxel_downsample,
};
use nalgebra as na;
use std::{error::Error, fs, io::Write, path::PathBuf};

#[cfg(feature = "viz")]
mod viz {
    use nalgebra as na;

    pub fn get_colors_for_ranges(
        points: &[na::Vector3<f64>],
        max_range: f64,
        alpha: u8,
    ) -> Vec<(u8, u8, u8, u8)> {
        let g = colorous::TURBO;
        points
            .iter()
            .map(|p| {
                let c = g.eval_continuous((p.norm() / max_range).clamp(0.0, 1.0));
                (c.r, c.g, c.b, alpha)
            })
            .collect()
    }

    pub fn log_frame(
        recording: &rerun::RecordingStream,
        frame_idx: usize,
        points: &[na::Vector3<f64>],
        max_range: f64,
    ) -> rerun::RecordingStreamResult<()> {
        recording.set_time_sequence("frame", frame_idx as i64);
        recording.log(
            "preprocessed",
            &rerun::Points3D::new(points.iter().map(|p| (p.x as f32, p.y as f32, p.z as f32)))
                .with_radii([0.05])
                .with_colors(get_colors_for_ranges(points, max_range, 255)),
        )
    }
}

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct KissIcpCli {
    /// glob of input PCD files, e.g. "./pcd/*.pcd"
    pcd_glob: String,

    /// YAML config overriding the defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// write the resolved config to this file
    #[arg(long)]
    dump_config: Option<PathBuf>,

    #[arg(long, default_value_t = 0)]
    start: usize,

    /// apply the KITTI vertical angle correction before preprocessing
    #[arg(long)]
    kitti: bool,

    /// downsample each frame with mapping.voxel_size
    #[arg(long)]
    voxelize: bool,

    /// stream frames to a rerun viewer
    #[cfg(feature = "viz")]
    #[arg(long)]
    visualize: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    let cli = KissIcpCli::parse();
    let config = load_config(cli.config.as_deref())?;
    if let Some(path) = &cli.dump_config {
        write_config(&config, path)?;
        log::info!("Wrote config to {}", path.display());
    }

    let preprocessor: Preprocessor = Preprocessor::build(&config)?;
    let out_dir = PathBuf::from(&config.out_dir);
    fs::create_dir_all(&out_dir)?;

    #[cfg(feature = "viz")]
    let recording = if cli.visualize {
        Some(rerun::RecordingStreamBuilder::new("kiss icp preprocessing").spawn()?)
    } else {
        None
    };

    let mut paths: Vec<PathBuf> = glob(&cli.pcd_glob)?.collect::<Result<_, _>>()?;
    paths.sort();
    for (i, path) in paths.iter().enumerate().skip(cli.start) {
        let points = point3d::read_pcd_to_points(path)?;
        let mut frame: Vec<na::Vector3<f64>> = points
            .iter()
            .map(|p| p.xyz().to_na_vec_f64())
            .collect();
        if cli.kitti {
            frame = correct_kitti_scan(&frame);
        }

        // no per-point stamps in plain PCD files, so nothing to deskew against
        let mut processed =
            preprocessor.preprocess(&frame, Vec::<f64>::new(), &na::Isometry3::identity())?;
        if cli.voxelize {
            processed = voxel_downsample(&processed, config.voxel_size());
        }
        log::info!(
            "{}: {} -> {} points",
            path.display(),
            points.len(),
            processed.len()
        );

        #[cfg(feature = "viz")]
        if let Some(recording) = &recording {
            viz::log_frame(recording, i, &processed, config.data.max_range)?;
        }

        let stem = path.file_stem().unwrap_or_default().to_string_lossy();
        let out_path = out_dir.join(format!("{}.pcd", stem));
        let xyz: Vec<PointXyz> = processed
            .iter()
            .map(|p| PointXyz::from(<[f32; 3]>::from_na_vec_f64(p)))
            .collect();
        point3d::write_points_to_pcd(&out_path, &xyz)?;
        log::debug!("frame {} written to {}", i, out_path.display());
    }
    Ok(())
}
