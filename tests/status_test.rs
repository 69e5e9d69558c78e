use std::fs;
use tempfile::tempdir;

#[test]
fn status_reports_resolved_configuration() {
    let tmp = tempdir().expect("tempdir");
    fs::create_dir_all(tmp.path().join("store")).expect("mkdir store");

    assert_cmd::cargo::cargo_bin_cmd!("kiroku")
        .current_dir(tmp.path())
        .env("KIROKU_STORE_BACKEND", "dir")
        .env("KIROKU_STORE_DIR", tmp.path().join("store"))
        .env("KIROKU_STATE_DIR", tmp.path().join("state"))
        .env("KIROKU_CONFIG_PATH", tmp.path().join("no-config.toml"))
        .arg("status")
        .assert()
        .success()
        .stdout(predicates::str::contains("store.backend=dir"))
        .stdout(predicates::str::contains("undo slot: empty"));
}

#[test]
fn status_flags_misspelled_environment_variables() {
    let tmp = tempdir().expect("tempdir");
    fs::create_dir_all(tmp.path().join("store")).expect("mkdir store");

    assert_cmd::cargo::cargo_bin_cmd!("kiroku")
        .current_dir(tmp.path())
        .env("KIROKU_STORE_BACKEND", "dir")
        .env("KIROKU_STORE_DIR", tmp.path().join("store"))
        .env("KIROKU_STATE_DIR", tmp.path().join("state"))
        .env("KIROKU_CONFIG_PATH", tmp.path().join("no-config.toml"))
        .env("KIROKU_STOER_BACKEND", "dir")
        .arg("status")
        .assert()
        .failure();
}
