use quickpick_core::commit::CommitMode;
use quickpick_core::config::{self, Config, ConfigError};
use quickpick_core::keymap::MAX_SLOT_KEYS;

#[test]
fn accepts_default_config() {
    let cfg = Config::default();
    assert_eq!(cfg.list_limit, 10);
    assert_eq!(cfg.page_size, 6);
    assert!(cfg.db_path.to_string_lossy().contains("quickpick"));
    assert!(cfg.config_path.to_string_lossy().contains("quickpick"));
    assert!(config::validate(&cfg).is_ok());
}

#[test]
fn rejects_out_of_range_values() {
    let cases = [
        Config {
            list_limit: 0,
            ..Default::default()
        },
        Config {
            page_size: 10,
            ..Default::default()
        },
        Config {
            match_threshold: 0.0,
            ..Default::default()
        },
        Config {
            tie_epsilon: 0.5,
            ..Default::default()
        },
        Config {
            stats_limit: 11,
            ..Default::default()
        },
    ];
    for cfg in cases {
        assert!(matches!(config::validate(&cfg), Err(ConfigError::Invalid(_))));
    }
}

#[test]
fn page_size_is_bounded_by_digit_keys() {
    let largest = Config {
        page_size: MAX_SLOT_KEYS,
        ..Default::default()
    };
    assert!(config::validate(&largest).is_ok());

    let too_large = Config {
        page_size: MAX_SLOT_KEYS + 1,
        ..Default::default()
    };
    assert!(matches!(config::validate(&too_large), Err(ConfigError::Invalid(_))));
}

#[test]
fn missing_file_yields_defaults_at_that_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let cfg = config::load(Some(&path)).unwrap();
    assert_eq!(cfg.config_path, path);
    assert_eq!(cfg.list_limit, 10);
}

#[test]
fn loads_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "page_size = 4\ncommit_mode = \"injection\"\n").unwrap();

    let cfg = config::load(Some(&path)).unwrap();
    assert_eq!(cfg.page_size, 4);
    assert_eq!(cfg.commit_mode, CommitMode::Injection);
    assert_eq!(cfg.list_limit, 10);
}

#[test]
fn loads_json5_with_comments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json5");
    std::fs::write(&path, "{\n  // fewer rows\n  list_limit: 5,\n}\n").unwrap();

    let cfg = config::load(Some(&path)).unwrap();
    assert_eq!(cfg.list_limit, 5);
}

#[test]
fn invalid_file_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "list_limit = 500\n").unwrap();
    assert!(matches!(config::load(Some(&path)), Err(ConfigError::Invalid(_))));

    std::fs::write(&path, "list_limit = \"many\"\n").unwrap();
    assert!(matches!(config::load(Some(&path)), Err(ConfigError::Parse { .. })));
}

#[test]
fn save_then_load_preserves_values() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config {
        page_size: 8,
        native_fallback: false,
        config_path: dir.path().join("sub").join("config.toml"),
        ..Default::default()
    };
    config::save(&cfg).unwrap();

    let loaded = config::load(Some(&cfg.config_path)).unwrap();
    assert_eq!(loaded, cfg);
}
