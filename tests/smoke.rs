use std::process::Command;

use turnkit_core::PlayerId;
use turnkit_testkit::{sample_planet, sample_ship, ResultFileBuilder};

fn turnkit(dir: &std::path::Path, args: &[&str]) -> serde_json::Value {
    let output = Command::new(env!("CARGO_BIN_EXE_turnkit"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("can run turnkit");
    assert!(
        output.status.success(),
        "turnkit {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json output")
}

#[test]
fn unpack_status_and_resave() {
    let dir = tempfile::tempdir().expect("tempdir");
    let player = PlayerId::new(5).expect("valid player");
    ResultFileBuilder::new(player, 31)
        .extended(1)
        .ship(sample_ship(12, 5))
        .planet(sample_planet(100, 5))
        .write_to(dir.path())
        .expect("write result");

    let sections = turnkit(dir.path(), &["sections", "player5.rst"]);
    assert_eq!(sections["version"], 1);

    let report = turnkit(dir.path(), &["unpack", "player5.rst", "game", "--player", "5"]);
    assert_eq!(report["turn"], 31);
    assert_eq!(report["ships"], 1);
    assert_eq!(report["dialect"], "format-b");

    let status = turnkit(dir.path(), &["status", "game"]);
    assert_eq!(status["5"]["playable"], true);
    assert!(status.get("4").is_none());

    let saved = turnkit(dir.path(), &["resave", "game", "--player", "5"]);
    assert_eq!(saved["changed"].as_array().map(Vec::len), Some(0));
    assert_eq!(saved["ships_written"], 1);
}

#[test]
fn init_config_writes_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let written = turnkit(
        dir.path(),
        &["init-config", "--config", "settings/turnkit.toml"],
    );
    assert_eq!(written["unpack"]["checksum_mode"], "strict");

    let text = std::fs::read_to_string(dir.path().join("settings/turnkit.toml"))
        .expect("config file written");
    assert!(text.contains("target_cap = 50"), "{text}");
}
