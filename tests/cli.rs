use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Binary with HOME and config pointed into a scratch dir
fn pymirror(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pymirror").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("PYMIRROR_CONFIG", home.join("mirror.json"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn no_subcommand_prints_usage() {
    let home = TempDir::new().unwrap();
    pymirror(home.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("set-default"));
}

#[test]
fn list_shows_builtin_mirrors() {
    let home = TempDir::new().unwrap();
    pymirror(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tsinghua"))
        .stdout(predicate::str::contains("https://mirrors.aliyun.com/pypi/simple/"))
        .stdout(predicate::str::contains("Tencent"));
}

#[cfg(target_os = "linux")]
#[test]
fn local_mirror_list_replaces_builtin() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join(".config").join("pymirror");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("mirrors.json"),
        r#"[{"name": "Corp", "url": "https://pypi.corp.example/simple/"}]"#,
    )
    .unwrap();

    pymirror(home.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Corp"))
        .stdout(predicate::str::contains("Tsinghua").not());
}

#[test]
fn default_mirror_lifecycle() {
    let home = TempDir::new().unwrap();

    pymirror(home.path())
        .arg("show-default")
        .assert()
        .success()
        .stdout(predicate::str::contains("No default mirror set."));

    pymirror(home.path())
        .args(["set-default", "--mirror", "aliyun"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Default mirror set to Aliyun"));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(home.path().join("mirror.json")).unwrap()).unwrap();
    assert_eq!(saved["default_mirror"]["name"], "Aliyun");
    assert_eq!(saved["default_mirror"]["url"], "https://mirrors.aliyun.com/pypi/simple/");

    pymirror(home.path())
        .arg("show-default")
        .assert()
        .success()
        .stdout(predicate::str::contains("Default mirror: Aliyun"));

    pymirror(home.path())
        .arg("unset-default")
        .assert()
        .success()
        .stdout(predicate::str::contains("Default mirror Aliyun removed."));

    pymirror(home.path())
        .arg("unset-default")
        .assert()
        .success()
        .stdout(predicate::str::contains("No default mirror was set."));

    pymirror(home.path())
        .arg("show-default")
        .assert()
        .success()
        .stdout(predicate::str::contains("No default mirror set."));
}

#[test]
fn custom_url_is_saved_with_warning() {
    let home = TempDir::new().unwrap();
    pymirror(home.path())
        .args(["set-default", "--mirror", "Internal", "--url", "https://pypi.internal/simple/"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning"));

    pymirror(home.path())
        .arg("show-default")
        .assert()
        .success()
        .stdout(predicate::str::contains("Internal (https://pypi.internal/simple/)"));
}

#[test]
fn unknown_mirror_fails_before_running_pip() {
    let home = TempDir::new().unwrap();
    pymirror(home.path())
        .args(["install", "requests", "--mirror", "Nowhere"])
        .env("PYMIRROR_PYTHON", home.path().join("no-such-python"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Mirror 'Nowhere' not found"));
}

#[test]
fn broken_config_file_is_not_fatal() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("mirror.json"), "{ broken").unwrap();
    pymirror(home.path())
        .arg("show-default")
        .assert()
        .success()
        .stdout(predicate::str::contains("No default mirror set."));
}

#[test]
fn url_without_scheme_is_refused() {
    let home = TempDir::new().unwrap();
    pymirror(home.path())
        .args(["set-default", "--mirror", "Internal", "--url", "pypi.corp/simple"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot extract host"));

    assert!(!home.path().join("mirror.json").exists());
}
