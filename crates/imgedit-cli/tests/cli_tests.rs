//! CLI integration tests for imgedit
//!
//! Runs the binary end-to-end with an isolated config directory.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const ENV_KEYS: &[&str] = &[
    "IMGEDIT_API_BASE_URL",
    "IMGEDIT_IMAGE_BASE_URL",
    "IMGEDIT_DEFAULT_PROMPT_PREFIX",
    "IMGEDIT_IMAGE_MAX_WIDTH",
    "IMGEDIT_IMAGE_MAX_HEIGHT",
    "IMGEDIT_IMAGE_FORMAT",
    "IMGEDIT_TIMEOUT_SECS",
    "IMGEDIT_UPLOAD_TIMEOUT_SECS",
    "IMGEDIT_DOWNLOAD_DIR",
];

/// Command running in `dir` with its config directory inside it
#[allow(deprecated)]
fn imgedit_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("imgedit").unwrap();
    for key in ENV_KEYS {
        cmd.env_remove(key);
    }
    cmd.current_dir(dir.path());
    cmd.env("IMGEDIT_CONFIG_DIR", dir.path().join("config"));
    cmd
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/api", port)
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();

    imgedit_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("chat"));
}

#[test]
fn test_url_resolves_against_image_base() {
    let dir = TempDir::new().unwrap();

    imgedit_cmd(&dir)
        .env("IMGEDIT_IMAGE_BASE_URL", "http://images.test")
        .args(["url", "uploads/cat.png"])
        .assert()
        .success()
        .stdout("http://images.test/static/uploads/cat.png\n");

    imgedit_cmd(&dir)
        .env("IMGEDIT_IMAGE_BASE_URL", "http://images.test/")
        .args(["url", "/static/generated_images/a.jpg"])
        .assert()
        .success()
        .stdout("http://images.test/static/generated_images/a.jpg\n");

    imgedit_cmd(&dir)
        .args(["url", "https://cdn.test/a.png"])
        .assert()
        .success()
        .stdout("https://cdn.test/a.png\n");
}

#[test]
fn test_config_get_defaults() {
    let dir = TempDir::new().unwrap();

    imgedit_cmd(&dir)
        .args(["config", "get", "image.format"])
        .assert()
        .success()
        .stdout("jpeg\n");

    imgedit_cmd(&dir)
        .args(["config", "get", "api_base_url"])
        .assert()
        .success()
        .stdout("http://localhost:8000/api\n");
}

#[test]
fn test_config_file_and_env_precedence() {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "timeout_secs = 15\n\n[image]\nmax_width = 640\n",
    )
    .unwrap();

    imgedit_cmd(&dir)
        .args(["config", "get", "image.max_width"])
        .assert()
        .success()
        .stdout("640\n");

    imgedit_cmd(&dir)
        .env("IMGEDIT_TIMEOUT_SECS", "30")
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("timeout_secs = 30"))
        .stdout(predicate::str::contains("image.max_width = 640"));
}

#[test]
fn test_config_path_uses_config_dir() {
    let dir = TempDir::new().unwrap();

    imgedit_cmd(&dir)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_unknown_config_key_fails() {
    let dir = TempDir::new().unwrap();

    imgedit_cmd(&dir)
        .args(["config", "get", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_invalid_image_format_is_rejected() {
    let dir = TempDir::new().unwrap();

    imgedit_cmd(&dir)
        .env("IMGEDIT_IMAGE_FORMAT", "bmp")
        .args(["config", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported image format"));
}

#[test]
fn test_generate_without_backend_reports_no_response() {
    let dir = TempDir::new().unwrap();

    imgedit_cmd(&dir)
        .env("IMGEDIT_API_BASE_URL", closed_port_url())
        .env("RUST_LOG", "off")
        .args(["generate", "a red fox"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No response from server"))
        .stderr(predicate::str::contains("Hint:"));
}

#[test]
fn test_download_data_uri_into_download_dir() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");

    imgedit_cmd(&dir)
        .env("IMGEDIT_DOWNLOAD_DIR", &out)
        .args(["download", "data:image/png;base64,iVBORw==", "-o", "tiny.png"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tiny.png"));

    let bytes = std::fs::read(out.join("tiny.png")).unwrap();
    assert_eq!(bytes, vec![0x89, 0x50, 0x4E, 0x47]);
}

#[test]
fn test_upload_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    imgedit_cmd(&dir)
        .args(["upload", "does-not-exist.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}
