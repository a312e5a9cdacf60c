use std::{fs, path::Path, process::Command};

const PCD: &str = "VERSION 0.7\n\
                   FIELDS x y z intensity\n\
                   SIZE 4 4 4 4\n\
                   TYPE F F F F\n\
                   COUNT 1 1 1 1\n\
                   WIDTH 3\n\
                   HEIGHT 1\n\
                   VIEWPOINT 0 0 0 1 0 0 0\n\
                   POINTS 3\n\
                   DATA ascii\n\
                   0.5 0.0 0.0 1.0\n\
                   5.0 0.0 0.0 1.0\n\
                   0.0 20.0 0.0 1.0\n";

fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_kiss_icp_cli"));
    cmd.current_dir(dir)
        .env_remove("KISS_ICP_OUT_DIR")
        .env_remove("KISS_ICP_DATA__MAX_RANGE")
        .env_remove("KISS_ICP_DATA__MIN_RANGE");
    cmd
}

#[cfg(not(feature = "yaml"))]
#[test]
fn config_file_without_yaml_support_exits_with_status_1() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("frame.pcd"), PCD).unwrap();
    fs::write(dir.path().join("cfg.yaml"), "data:\n  min_range: 1.0\n").unwrap();

    let output = cli(dir.path())
        .args(["--config", "cfg.yaml", "*.pcd"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("YAML support is not compiled in"), "{stderr}");
    assert!(!dir.path().join("results").exists());
}

#[cfg(not(feature = "yaml"))]
#[test]
fn defaults_run_without_yaml_support() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("frame.pcd"), PCD).unwrap();

    let output = cli(dir.path()).arg("*.pcd").output().unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(dir.path().join("results/frame.pcd").exists());
}

#[cfg(feature = "yaml")]
#[test]
fn config_file_drives_output() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("frame.pcd"), PCD).unwrap();
    fs::write(
        dir.path().join("cfg.yaml"),
        "out_dir: clipped\ndata:\n  min_range: 1.0\n  max_range: 10.0\n",
    )
    .unwrap();

    let output = cli(dir.path())
        .args(["--config", "cfg.yaml", "--dump-config", "dump.yaml", "*.pcd"])
        .output()
        .unwrap();

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let written = fs::read_to_string(dir.path().join("clipped/frame.pcd")).unwrap();
    let data: Vec<&str> = written
        .lines()
        .skip_while(|line| !line.starts_with("DATA"))
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .collect();
    // only the 5 m return lies strictly inside (1, 10)
    assert_eq!(data.len(), 1, "{written}");
    assert!(data[0].starts_with('5'), "{written}");
    let dump = fs::read_to_string(dir.path().join("dump.yaml")).unwrap();
    assert!(dump.contains("voxel_size: 0.1"), "{dump}");
}
