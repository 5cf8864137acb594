//! Layered configuration feeding the producer registry and transport.

use nbtelemetry::config::{ConfigLoader, NbTelemetryConfig};
use nbtelemetry::telemetry::events::EventKind;
use nbtelemetry::telemetry::producers::ProducerRegistry;
use nbtelemetry::transport::HttpTransport;

use super::test_utils::with_isolated_env;

#[test]
fn workspace_config_disables_producers() {
    with_isolated_env(|temp| {
        let config_dir = temp.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            r#"
[producers]
disabled = ["NotebookScrollEvent", "ClipboardCopyEvent"]
"#,
        )
        .unwrap();

        let config = ConfigLoader::load(temp.path()).unwrap();
        let registry = ProducerRegistry::standard(&config.producers);
        let kinds = registry.kinds();
        assert_eq!(kinds.len(), EventKind::ALL.len() - 2);
        assert!(!kinds.contains(&EventKind::DocumentScroll));
        assert!(!kinds.contains(&EventKind::ClipboardCopy));
    });
}

#[test]
fn environment_overrides_service_url() {
    with_isolated_env(|temp| {
        std::env::set_var(
            "NBTELEMETRY__SERVICE__BASE_URL",
            "http://127.0.0.1:9999/telemetry-producer/",
        );
        let config = ConfigLoader::load(temp.path()).unwrap();
        let transport = HttpTransport::new(&config.service).unwrap();
        assert_eq!(transport.base_url(), "http://127.0.0.1:9999/telemetry-producer");
    });
}

#[test]
fn global_file_is_read_from_xdg_config_home() {
    with_isolated_env(|temp| {
        let global = temp.path().join("xdg").join("nbtelemetry");
        std::fs::create_dir_all(&global).unwrap();
        std::fs::write(
            global.join("config.toml"),
            "[logging]\nlevel = \"debug\"\n\n[producers]\nscroll_debounce_ms = 300\n",
        )
        .unwrap();

        let config = ConfigLoader::load(&temp.path().join("workspace")).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.producers.scroll_debounce_ms, 300);
    });
}

#[test]
fn invalid_values_are_reported_together() {
    with_isolated_env(|temp| {
        let config_dir = temp.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("config.toml"),
            "[service]\nconnect_timeout_ms = 0\n\n[producers]\ndisabled = [\"CellMoveEvent\"]\n",
        )
        .unwrap();

        let err = ConfigLoader::load(temp.path()).unwrap_err().to_string();
        assert!(err.contains("connect_timeout_ms"));
        assert!(err.contains("CellMoveEvent"));
    });
}

#[test]
fn defaults_validate() {
    assert!(NbTelemetryConfig::default().validate().is_ok());
}
