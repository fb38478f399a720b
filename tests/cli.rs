use std::fs;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::tempdir;

fn worldhost(config: &Path, args: &[&str]) -> Output {
    let bin = env!("CARGO_BIN_EXE_worldhost");
    Command::new(bin)
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "warn")
        .stdin(Stdio::null())
        .output()
        .expect("spawn worldhost")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn admin_commands_manage_worlds_between_runs() {
    let dir = tempdir().unwrap();
    let saves = dir.path().join("saves");
    let events = dir.path().join("logs/events.jsonl");
    let config = dir.path().join("worldhost.toml");
    fs::write(
        &config,
        format!(
            "saves_root = {:?}\nevent_log = {:?}\ntick_rate = 1000\nautosave_interval_ticks = 2\n",
            saves.display().to_string(),
            events.display().to_string()
        ),
    )
    .unwrap();

    let created = worldhost(&config, &["create", "alpha", "--seed", "7"]);
    assert!(created.status.success(), "{created:?}");
    assert!(stdout(&created).contains("created alpha (dimension 2"));

    let ran = worldhost(&config, &["run", "--ticks", "3"]);
    assert!(ran.status.success(), "{ran:?}");
    for folder in ["world", "DIM-1", "DIM1", "alpha"] {
        assert!(saves.join(folder).join("level.wh").is_file(), "{folder} was not saved");
    }
    let recorded = fs::read_to_string(&events).unwrap();
    let kinds: Vec<String> = recorded
        .lines()
        .map(|line| {
            let record: Value = serde_json::from_str(line).expect("event line is json");
            record["kind"].as_str().expect("kind").to_string()
        })
        .collect();
    assert_eq!(kinds.iter().filter(|kind| *kind == "loaded").count(), 4);
    assert_eq!(kinds.iter().filter(|kind| *kind == "unloaded").count(), 4);

    let renamed = worldhost(&config, &["rename", "alpha", "beta"]);
    assert!(renamed.status.success(), "{renamed:?}");
    let listed = stdout(&worldhost(&config, &["list"]));
    assert!(listed.contains("beta\tdimension 2"), "{listed}");
    assert!(!listed.contains("alpha"));

    let refused = worldhost(&config, &["rename", "beta", "world"]);
    assert!(!refused.status.success());
    assert!(String::from_utf8_lossy(&refused.stderr).contains("already_exists"));

    let deleted = worldhost(&config, &["delete", "beta"]);
    assert!(deleted.status.success(), "{deleted:?}");
    assert!(!saves.join("beta").exists());
}
