use assert_cmd::prelude::*;
use predicates::str::contains;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut tmp = NamedTempFile::new().expect("temp config");
    tmp.write_all(contents.as_bytes()).expect("write config");
    tmp
}

#[test]
fn headless_run_prints_summary() {
    let mut cmd = Command::cargo_bin("shadow-lab").expect("binary exists");
    cmd.args(["--headless", "--frames", "10", "--shadow-map-size", "64"]);
    cmd.assert()
        .success()
        .stdout(contains("frames = 10"))
        .stdout(contains("hazards = 0"))
        .stdout(contains("behavior = \"orbiting\""))
        .stdout(contains("behavior = \"pulsing\""));
}

#[test]
fn scripted_press_toggles_wiggle_off() {
    let mut cmd = Command::cargo_bin("shadow-lab").expect("binary exists");
    cmd.args(["--headless", "--frames", "5", "--press", "2:4"]);
    cmd.assert()
        .success()
        .stdout(contains("wiggle = false"))
        .stdout(contains("wiggle_phase = 0.0"));
}

#[test]
fn config_file_values_are_applied() {
    let config = write_config(
        r#"
[rendering]
shadow_map_size = 128

[keys]
toggle_wiggle = "W"
"#,
    );
    let mut cmd = Command::cargo_bin("shadow-lab").expect("binary exists");
    cmd.arg("--config")
        .arg(config.path())
        .args(["--headless", "--frames", "3", "--press", "1:W"]);
    cmd.assert().success().stdout(contains("wiggle = false"));
}

#[test]
fn invalid_cone_angle_is_rejected() {
    let mut cmd = Command::cargo_bin("shadow-lab").expect("binary exists");
    cmd.args(["--headless", "--cone-angle", "180"]);
    cmd.assert()
        .failure()
        .stderr(contains("cone angle must lie strictly between 0 and 180"));
}

#[test]
fn unknown_key_binding_is_rejected() {
    let config = write_config(
        r#"
[keys]
quit = "Hyper"
"#,
    );
    let mut cmd = Command::cargo_bin("shadow-lab").expect("binary exists");
    cmd.arg("--config").arg(config.path()).arg("--headless");
    cmd.assert()
        .failure()
        .stderr(contains("unknown key name \"Hyper\" bound to quit"));
}

#[test]
fn malformed_press_is_rejected() {
    let mut cmd = Command::cargo_bin("shadow-lab").expect("binary exists");
    cmd.args(["--headless", "--press", "soon"]);
    cmd.assert()
        .failure()
        .stderr(contains("expected FRAME:KEY"));
}

#[test]
fn negative_time_step_is_rejected() {
    let mut cmd = Command::cargo_bin("shadow-lab").expect("binary exists");
    cmd.args(["--headless", "--frames", "200", "--dt=-1"]);
    cmd.assert()
        .failure()
        .stderr(contains("time step must be a finite, non-negative number"));
}
