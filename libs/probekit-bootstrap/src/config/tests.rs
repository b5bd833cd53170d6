use super::*;
use std::io::Write;

#[test]
fn defaults_are_sane() {
    let cfg = AppConfig::default();
    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.server.port, 50051);
    assert!(cfg.logging.is_some());
    assert!(cfg.modules.is_empty());
}

#[test]
fn listen_addr_resolves() {
    let cfg = ServerConfig {
        host: "0.0.0.0".to_string(),
        port: 9000,
    };
    let addr = cfg.listen_addr().expect("address should parse");
    assert_eq!(addr.port(), 9000);
}

#[test]
fn listen_addr_rejects_garbage() {
    let cfg = ServerConfig {
        host: "not a host".to_string(),
        port: 9000,
    };
    assert!(cfg.listen_addr().is_err());
}

#[test]
fn yaml_file_overrides_defaults() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"
server:
  host: "0.0.0.0"
  port: 6000
modules:
  host_info:
    expose_ping: false
"#
    )
    .expect("write yaml");

    let cfg = AppConfig::load_layered(file.path()).expect("load should succeed");
    assert_eq!(cfg.server.host, "0.0.0.0");
    assert_eq!(cfg.server.port, 6000);
    // Logging stays None unless the file provides it.
    assert!(cfg.logging.is_none());
    assert_eq!(
        cfg.modules["host_info"]["expose_ping"],
        serde_json::json!(false)
    );
}

#[test]
fn missing_file_keeps_defaults() {
    let cfg = AppConfig::load_layered("/nonexistent/probehost.yaml").expect("load should succeed");
    assert_eq!(cfg.server.port, 50051);
}

#[test]
fn cli_port_override_wins() {
    let mut cfg = AppConfig::default();
    let args = CliArgs {
        port: Some(7777),
        ..Default::default()
    };
    cfg.apply_cli_overrides(&args);
    assert_eq!(cfg.server.port, 7777);
}

#[test]
fn verbose_flags_raise_console_level() {
    let mut cfg = AppConfig {
        logging: None,
        ..Default::default()
    };
    let args = CliArgs {
        verbose: 2,
        ..Default::default()
    };
    cfg.apply_cli_overrides(&args);
    assert_eq!(
        cfg.logging.expect("logging section created").console_level,
        "trace"
    );
}

#[test]
fn verbose_zero_keeps_configured_level() {
    let mut cfg = AppConfig::default();
    cfg.logging.as_mut().unwrap().console_level = "warn".to_string();
    cfg.apply_cli_overrides(&CliArgs::default());
    assert_eq!(cfg.logging.unwrap().console_level, "warn");
}

#[test]
fn to_yaml_round_trips() {
    let cfg = AppConfig::default();
    let yaml = cfg.to_yaml().expect("serialize");
    let back: AppConfig = serde_yaml::from_str(&yaml).expect("deserialize");
    assert_eq!(back.server.port, cfg.server.port);
    assert_eq!(back.server.host, cfg.server.host);
}
