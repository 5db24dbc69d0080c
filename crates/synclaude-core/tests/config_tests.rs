//! Configuration management tests
//!
//! Tests for ConfigManager persistence and the TOML layout.

use std::fs;

use synclaude_core::config::{Config, ConfigManager, DEFAULT_MODELS_API_URL};
use synclaude_core::launcher::Tier;
use tempfile::TempDir;

/// Create a temp directory for config tests
fn setup_config_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

mod config_manager_tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = setup_config_dir();
        let manager = ConfigManager::with_path(dir.path().join("config.toml")).unwrap();

        assert_eq!(manager.config(), &Config::default());
        assert!(!manager.config_path().exists());
        assert_eq!(manager.cache_path(), dir.path().join("models_cache.json"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = setup_config_dir();
        let path = dir.path().join("nested").join("config.toml");

        let mut manager = ConfigManager::with_path(path.clone()).unwrap();
        manager.set_api_key("syn_saved".to_string());
        manager.set_selected_model(Some("hf:zai-org/GLM-4.6".to_string()));
        manager.config_mut().set_value("tiers.opus", "hf:big").unwrap();
        manager.config_mut().cache_duration_hours = 12;
        manager.mark_first_run_completed();
        manager.save().unwrap();

        let reloaded = ConfigManager::with_path(path).unwrap();
        let config = reloaded.config();
        assert_eq!(config.api_key.as_deref(), Some("syn_saved"));
        assert_eq!(config.selected_model.as_deref(), Some("hf:zai-org/GLM-4.6"));
        assert_eq!(config.tiers.get(Tier::Opus), Some("hf:big"));
        assert_eq!(config.cache_duration_hours, 12);
        assert!(config.first_run_completed);
        assert!(reloaded.has_api_key());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = setup_config_dir();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_key = \"k\"\nselected_model = \"hf:m\"\n\n[tiers]\nhaiku = \"hf:small\"\n",
        )
        .unwrap();

        let manager = ConfigManager::with_path(path).unwrap();
        let config = manager.config();
        assert_eq!(config.models_api_url, DEFAULT_MODELS_API_URL);
        assert_eq!(config.cache_duration_hours, 24);
        let tiers = config.tier_selection();
        assert_eq!(tiers.get(Tier::Default), Some("hf:m"));
        assert_eq!(tiers.get(Tier::Haiku), Some("hf:small"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = setup_config_dir();
        let path = dir.path().join("config.toml");

        fs::write(&path, "this is = = not toml").unwrap();
        assert!(ConfigManager::with_path(path.clone()).is_err());

        fs::write(&path, "cache_duration_hours = 500\n").unwrap();
        assert!(ConfigManager::with_path(path).is_err());
    }

    #[test]
    fn test_reset_keeps_api_key() {
        let dir = setup_config_dir();
        let mut manager = ConfigManager::with_path(dir.path().join("config.toml")).unwrap();
        manager.set_api_key("keep-me".to_string());
        manager.set_selected_model(Some("hf:m".to_string()));
        manager.config_mut().cache_duration_hours = 2;

        manager.reset();
        assert_eq!(manager.config().api_key.as_deref(), Some("keep-me"));
        assert!(manager.config().selected_model.is_none());
        assert_eq!(manager.config().cache_duration_hours, 24);
    }
}
