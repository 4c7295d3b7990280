// tests/config_env.rs
use std::{env, fs};

use youtube_sauce::config::{FileConfig, LogFormat};
use youtube_sauce::storage::StorageKind;
use youtube_sauce::Config;

const VARS: &[&str] = &[
    "SAUCE_CONFIG_PATH",
    "PORT",
    "ALLOWED_ORIGINS",
    "RATE_LIMIT_WINDOW_MS",
    "RATE_LIMIT_MAX_REQUESTS",
    "STORAGE_BACKEND",
    "LOG_FORMAT",
    "METRICS_ENABLED",
];

fn clear_env() {
    for v in VARS {
        env::remove_var(v);
    }
}

#[serial_test::serial]
#[test]
fn file_then_env_precedence() {
    clear_env();
    // keep a repo-level config/sauce.toml out of the picture
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    // 1) nothing at all: defaults
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.port, 3000);
    assert_eq!(cfg.storage, StorageKind::Memory);

    // 2) fallback file under ./config/
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config").join("sauce.toml"),
        r#"
port = 4000
storage = "discard"
log_format = "compact"
allowed_origins = ["https://www.youtube.com/"]

[rate_limit]
window_ms = 60000
max_requests = 10
"#,
    )
    .unwrap();
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.port, 4000);
    assert_eq!(cfg.storage, StorageKind::Discard);
    assert_eq!(cfg.log_format, LogFormat::Compact);
    assert_eq!(cfg.allowed_origins, vec!["https://www.youtube.com"]);
    assert_eq!(cfg.rate_limit.max_requests, 10);

    // 3) env wins over the file
    env::set_var("PORT", "5000");
    env::set_var("METRICS_ENABLED", "true");
    let cfg = Config::load().unwrap();
    assert_eq!(cfg.port, 5000);
    assert!(cfg.metrics_enabled);

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn explicit_path_must_exist() {
    clear_env();
    let tmp = tempfile::tempdir().unwrap();

    env::set_var("SAUCE_CONFIG_PATH", tmp.path().join("missing.toml"));
    let err = FileConfig::load_default().unwrap_err();
    assert!(err.to_string().contains("SAUCE_CONFIG_PATH"), "{err}");

    let p = tmp.path().join("custom.toml");
    fs::write(&p, "port = 8081\n").unwrap();
    env::set_var("SAUCE_CONFIG_PATH", &p);
    assert_eq!(Config::load().unwrap().port, 8081);

    env::set_var("STORAGE_BACKEND", "sqlite");
    assert!(Config::load().is_err());

    clear_env();
}
