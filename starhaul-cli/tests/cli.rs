use std::hash::Hasher;
use std::process::Command;
use twox_hash::XxHash64;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "starhaul-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let exe = env!("CARGO_BIN_EXE_starhaul");
    let output = Command::new(exe)
        .args(["--report", "json", "--start-ms", "0"])
        .args(args)
        .output()
        .expect("run cli");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json report")
}

#[test]
fn cli_console_report_writes_output() {
    let exe = env!("CARGO_BIN_EXE_starhaul");
    let output_path = temp_path("console");
    let status = Command::new(exe)
        .args(["--minutes", "5", "--start-ms", "0", "--save-dir"])
        .arg(temp_path("console-saves"))
        .arg("--output")
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Run Summary"));
    assert!(content.contains("Hangar"));
}

#[test]
fn cli_json_runs_are_deterministic() {
    let digest = |value: &serde_json::Value| {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(value.to_string().as_bytes());
        hasher.finish()
    };
    let args = ["--seed", "99", "--minutes", "20", "--autopilot-modules", "1"];
    let first = run_json(&args);
    let second = run_json(&args);
    assert_eq!(digest(&first), digest(&second));
    assert_eq!(first["seed"], 99);
    assert_eq!(first["ticks"], 1_200);
    assert!(first["autopilotTrips"].as_u64().unwrap() > 0);
}

#[test]
fn cli_save_then_load_replays_offline_autopilot() {
    let saves = temp_path("saves");
    let saves_arg = saves.to_string_lossy().to_string();
    let saved = run_json(&[
        "--minutes",
        "2",
        "--autopilot-modules",
        "1",
        "--save",
        "slot",
        "--save-dir",
        &saves_arg,
    ]);
    assert_eq!(saved["savedTo"], "slot");
    assert!(saves.join("slot.json").exists());

    let exe = env!("CARGO_BIN_EXE_starhaul");
    let output = Command::new(exe)
        .args(["--report", "json", "--minutes", "0", "--load", "slot", "--start-ms"])
        .arg((4 * 3_600_000_u64).to_string())
        .arg("--save-dir")
        .arg(&saves)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let resumed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json report");
    let offline = &resumed["offline"];
    assert!(offline["trips"].as_u64().unwrap() > 0);
    assert!(offline["simulatedMs"].as_u64().unwrap() <= 3_600_000);
    assert_eq!(resumed["ticks"], 0);
    let _ = std::fs::remove_dir_all(saves);
}

#[test]
fn cli_rejects_missing_save_and_bad_route() {
    let exe = env!("CARGO_BIN_EXE_starhaul");
    let output = Command::new(exe)
        .args(["--load", "ghost", "--save-dir"])
        .arg(temp_path("ghost"))
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no save named `ghost`"));

    let output = Command::new(exe)
        .args(["--route", "1,nowhere"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("`nowhere`"));
}
