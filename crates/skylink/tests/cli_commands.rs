#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

const ADCS: &str = "\
name: adcs
listen:
  - board: eps
    packets: [battery]
packets:
  - segment: 0x10
    packets:
      - name: imu
        data:
          - { name: x, type: int16 }
          - { name: y, type: float32 }
";

const EPS: &str = "\
name: eps
packets:
  - segment: 0x05
    packets:
      - name: battery
        data:
          - { name: volts, type: uint16 }
";

const COMMS: &str = "\
name: comms
packets:
  - segment: 0x05
    packets:
      - name: beacon
";

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/skylink-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn write_definitions(dir: &Path, files: &[(&str, &str)]) -> Vec<PathBuf> {
    files
        .iter()
        .map(|(name, contents)| {
            let path = dir.join(name);
            std::fs::write(&path, contents).expect("definition should be writable");
            path
        })
        .collect()
}

fn skylink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_skylink"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("skylink should run")
}

fn file_args(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .flat_map(|p| ["--file".to_string(), p.display().to_string()])
        .collect()
}

#[test]
fn generate_writes_sources_and_catalog() {
    let dir = unique_temp_dir("generate");
    let files = write_definitions(&dir, &[("adcs.yaml", ADCS), ("eps.yaml", EPS)]);
    let out = dir.join("out");
    let dest = format!("{}/", out.display());

    let mut args = vec!["--format".to_string(), "json".to_string(), "generate".to_string()];
    args.extend(["--board".to_string(), "adcs".to_string()]);
    args.extend(file_args(&files));
    args.extend(["--dest".to_string(), dest]);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = skylink(&args);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    for name in [
        "skylink_encode.h",
        "skylink_encode.c",
        "skylink_dispatch.h",
        "skylink_dispatch.c",
        "packets.json",
        "packets.js",
    ] {
        assert!(out.join(name).is_file(), "{name} should be written");
    }

    let dispatch = std::fs::read_to_string(out.join("skylink_dispatch.c")).unwrap();
    assert!(dispatch.contains("case 0x5:"));
    assert!(dispatch.contains("skylink_on_eps_battery"));

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["board"], "adcs");
    assert_eq!(summary["boards"], 2);
    assert_eq!(summary["artifacts"].as_array().unwrap().len(), 6);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn address_collision_exits_data_invalid() {
    let dir = unique_temp_dir("collision");
    let files = write_definitions(&dir, &[("eps.yaml", EPS), ("comms.yaml", COMMS)]);

    let mut args = vec!["--format".to_string(), "json".to_string(), "catalog".to_string()];
    args.extend(file_args(&files));
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = skylink(&args);
    assert_eq!(output.status.code(), Some(60));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("eps_battery"), "stderr: {stderr}");
    assert!(stderr.contains("comms_beacon"), "stderr: {stderr}");
    assert!(stderr.contains("0x5"), "stderr: {stderr}");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn missing_definition_exits_not_found() {
    let output = skylink(&["catalog", "--file", "/nonexistent/skylink/board.yaml"]);
    assert_eq!(output.status.code(), Some(51));
}

#[test]
fn encode_prints_wire_bytes() {
    let output = skylink(&[
        "--format", "pretty", "encode", "--address", "5", "--payload", "010203",
    ]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "7e 00 a3 01 02 03 a9");
}

#[test]
fn encode_rejects_oversized_payload() {
    let output = skylink(&[
        "encode",
        "--address",
        "5",
        "--payload",
        "00112233445566778899aabbccddeeff",
    ]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn catalog_to_stdout() {
    let dir = unique_temp_dir("catalog");
    let files = write_definitions(&dir, &[("adcs.yaml", ADCS), ("eps.yaml", EPS)]);

    let mut args = vec!["catalog".to_string()];
    args.extend(file_args(&files));
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = skylink(&args);
    assert!(output.status.success());
    let catalog: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = catalog
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["battery", "imu"]);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn decode_capture_against_catalog() {
    let dir = unique_temp_dir("decode");
    let files = write_definitions(&dir, &[("adcs.yaml", ADCS), ("eps.yaml", EPS)]);
    let catalog = dir.join("packets.json");

    let mut args = vec!["catalog".to_string()];
    args.extend(file_args(&files));
    args.extend(["--out".to_string(), catalog.display().to_string()]);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    assert!(skylink(&args).status.success());

    // Line noise, eps_battery volts=0x1234, then one frame with a bad checksum.
    let capture = dir.join("capture.bin");
    std::fs::write(
        &capture,
        [
            0xAA, 0x55, //
            0x7E, 0x00, 0xA2, 0x34, 0x12, 0xE8, //
            0x7E, 0x00, 0xA2, 0x34, 0x12, 0x00,
        ],
    )
    .unwrap();

    let catalog_arg = catalog.display().to_string();
    let capture_arg = capture.display().to_string();
    let output = skylink(&[
        "--format",
        "json",
        "decode",
        "--catalog",
        &catalog_arg,
        &capture_arg,
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let records: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["board"], "eps");
    assert_eq!(records[0]["name"], "battery");
    assert_eq!(records[0]["address"], 5);
    assert_eq!(records[0]["data"]["volts"], 0x1234);

    let output = skylink(&[
        "--format",
        "json",
        "decode",
        "--no-verify",
        "--catalog",
        &catalog_arg,
        &capture_arg,
    ]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).lines().count(), 2);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn monitor_drains_file_streams() {
    let dir = unique_temp_dir("monitor");
    let catalog = dir.join("packets.json");
    std::fs::write(
        &catalog,
        r#"[{"name": "battery", "board": "eps", "address": 5,
             "data": [{"name": "volts", "type": "uint16"}]}]"#,
    )
    .unwrap();
    let capture = dir.join("ttyFAKE");
    std::fs::write(
        &capture,
        [0x7E, 0x00, 0xA2, 0x34, 0x12, 0xE8, 0x7E, 0x00, 0xA2, 0x01, 0x00, 0xA3],
    )
    .unwrap();

    let catalog_arg = catalog.display().to_string();
    let capture_arg = capture.display().to_string();
    let output = skylink(&[
        "--format",
        "json",
        "monitor",
        "--catalog",
        &catalog_arg,
        &capture_arg,
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let volts: Vec<u64> = stdout
        .lines()
        .map(|line| {
            let record: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(record["source"], capture_arg.as_str());
            record["data"]["volts"].as_u64().unwrap()
        })
        .collect();
    assert_eq!(volts, vec![0x1234, 1]);

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn monitor_exits_on_interrupt_while_quiet() {
    let dir = unique_temp_dir("monitor-quiet");
    let catalog = dir.join("packets.json");
    std::fs::write(&catalog, "[]").unwrap();
    let fifo = dir.join("ttyQUIET");
    let made = Command::new("mkfifo").arg(&fifo).status().expect("mkfifo should run");
    assert!(made.success());

    let mut child = Command::new(env!("CARGO_BIN_EXE_skylink"))
        .args(["--log-level", "error", "--format", "json", "monitor", "--catalog"])
        .arg(&catalog)
        .arg(&fifo)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("monitor should start");

    std::thread::sleep(Duration::from_millis(500));
    assert!(child.try_wait().unwrap().is_none(), "monitor exited early");

    let signalled = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("kill should run");
    assert!(signalled.success());

    let deadline = Instant::now() + Duration::from_secs(3);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("monitor did not exit after SIGINT on a quiet device");
        }
        std::thread::sleep(Duration::from_millis(20));
    };
    assert!(status.success(), "status: {status:?}");

    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn version_prints_name() {
    let output = skylink(&["version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("skylink "));
}
