//! Integration tests for layered configuration loading.
//!
//! Builds a project directory with a root configuration file and overlays for
//! all hosts, one host and one user, then checks the merged view and the
//! resolved ordered items.

use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use strata::config::{
    ConfigError, ConfigLoader, ConfigPaths, ConfigTier, Configuration, default_context,
};
use strata::template::PlaceholderRenderer;
use tempfile::TempDir;

const HOST: &str = "buildhost";
const USER: &str = "builder";

fn base_yaml() -> &'static str {
    r#"
general:
  compression: xz
  use_case: strata_uc_base

bootstrap:
  architecture: amd64
  repository: deb http://ftp.ch.debian.org/debian/ jessie main

playbooks:
  10_base_system:
    path: playbooks/base_system.yml
    parameters:
      kernel_package: linux-image-amd64
      message: some message
  20_networking:
    path: playbooks/networking.yml
"#
}

fn all_yaml() -> &'static str {
    r#"
general:
  compression: bz2

bootstrap:
  repository_key: https://ftp-master.debian.org/keys/archive-key-8.asc

playbooks:
  30_foo:
    path: playbooks/foo.yml
  20_networking:
    path: playbooks/foo.yml
"#
}

fn host_yaml() -> &'static str {
    r#"
bootstrap:
  architecture: i386

playbooks:
  10_base_system:
    parameters:
      kernel_package: linux-image-amd64-rt
"#
}

fn user_yaml() -> &'static str {
    r#"
general:
  compression: gz
  use_case: strata_uc_test
"#
}

/// Write a project with all four layers and return the root file.
fn write_project(dir: &Path) -> PathBuf {
    let overlay = dir.join("overlay");
    fs::create_dir_all(&overlay).unwrap();
    let root = dir.join("sample.yml");
    fs::write(&root, base_yaml()).unwrap();
    fs::write(overlay.join("all.yml"), all_yaml()).unwrap();
    fs::write(overlay.join(format!("{}.yml", HOST)), host_yaml()).unwrap();
    fs::write(overlay.join(format!("{}.yml", USER)), user_yaml()).unwrap();
    root
}

fn load(root: &Path) -> Result<Configuration, ConfigError> {
    let paths = ConfigPaths::with_names(root, HOST, USER)?;
    ConfigLoader::new(paths, &PlaceholderRenderer).load()
}

#[test]
fn test_configuration_name_and_project_name() {
    let dir = TempDir::new().unwrap();
    let config = load(&write_project(dir.path())).unwrap();
    assert_eq!(config.configuration_name(), "sample");
    assert_eq!(config.project_name(), "sample");
}

#[test]
fn test_all_layers_contribute_in_order() {
    let dir = TempDir::new().unwrap();
    let config = load(&write_project(dir.path())).unwrap();
    let tiers: Vec<_> = config.sources().iter().map(|s| s.tier).collect();
    assert_eq!(
        tiers,
        vec![
            ConfigTier::Defaults,
            ConfigTier::Base,
            ConfigTier::Global,
            ConfigTier::Host,
            ConfigTier::User
        ]
    );
}

#[test]
fn test_user_overlay_wins() {
    let dir = TempDir::new().unwrap();
    let config = load(&write_project(dir.path())).unwrap();
    assert_eq!(config.compression().unwrap(), "gz");
    assert_eq!(config.use_case().unwrap(), "strata_uc_test");
}

#[test]
fn test_bootstrap_overlay() {
    let dir = TempDir::new().unwrap();
    let config = load(&write_project(dir.path())).unwrap();

    // host overlay wins
    assert_eq!(config.architecture().unwrap(), "i386");
    // only the global overlay provides the key
    assert_eq!(
        config.bootstrap_repository_key().unwrap(),
        "https://ftp-master.debian.org/keys/archive-key-8.asc"
    );
    assert_eq!(config.bootstrap_uri().unwrap(), "http://ftp.ch.debian.org/debian/");
    assert_eq!(config.distribution().unwrap(), "jessie");
    assert!(config.bootstrap_components().unwrap().contains(&"main".to_string()));
    // built-in default
    assert_eq!(config.bootstrap_tool().unwrap(), "debootstrap");
}

#[test]
fn test_playbooks_overlay() {
    let dir = TempDir::new().unwrap();
    let config = load(&write_project(dir.path())).unwrap();
    let playbooks = config.ordered_items("playbooks").unwrap();

    let names: Vec<_> = playbooks.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["10_base_system", "20_networking", "30_foo"]);

    let base = &playbooks[0];
    assert_eq!(
        base.variables,
        json!({"kernel_package": "linux-image-amd64-rt", "message": "some message"})
    );
    assert_eq!(base.defining_path.as_deref(), Some("playbooks/base_system.yml"));

    let networking = &playbooks[1];
    assert!(networking.defining_path.as_deref().unwrap().ends_with("playbooks/foo.yml"));
}

#[test]
fn test_first_introduction_order_across_layers() {
    let dir = TempDir::new().unwrap();
    let overlay = dir.path().join("overlay");
    fs::create_dir_all(&overlay).unwrap();
    let root = dir.path().join("sample.yml");
    fs::write(
        &root,
        "playbooks:\n  10_base_system:\n    parameters:\n      message: some message\n",
    )
    .unwrap();
    fs::write(
        overlay.join("all.yml"),
        "playbooks:\n  30_foo: {}\n  20_networking: {}\n",
    )
    .unwrap();
    fs::write(
        overlay.join(format!("{}.yml", USER)),
        "playbooks:\n  20_networking: {}\n  10_base_system:\n    parameters:\n      kernel_package: linux-image-amd64-rt\n",
    )
    .unwrap();

    let config = load(&root).unwrap();
    let playbooks = config.ordered_items("playbooks").unwrap();
    let names: Vec<_> = playbooks.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["10_base_system", "30_foo", "20_networking"]);
    assert_eq!(
        playbooks[0].variables,
        json!({"message": "some message", "kernel_package": "linux-image-amd64-rt"})
    );
}

#[test]
fn test_missing_overlays_are_skipped() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("minimal.yml");
    fs::write(&root, "bootstrap:\n  architecture: arm64\n").unwrap();

    let config = load(&root).unwrap();
    assert_eq!(config.sources().len(), 2);
    assert_eq!(config.architecture().unwrap(), "arm64");
    assert_eq!(config.compression().unwrap(), "xz");
    assert!(config.ordered_items("playbooks").unwrap().is_empty());
    assert!(config.bootstrap_repository_key().is_err());
}

#[test]
fn test_malformed_overlay_fails_load() {
    let dir = TempDir::new().unwrap();
    let root = write_project(dir.path());
    fs::write(dir.path().join("overlay").join("all.yml"), "general: [unclosed\n").unwrap();

    let err = load(&root).unwrap_err();
    assert!(matches!(err, ConfigError::Malformed { ref path, .. } if path.ends_with("all.yml")));
}

#[test]
fn test_missing_root_file_fails_load() {
    let dir = TempDir::new().unwrap();
    let err = load(&dir.path().join("absent.yml")).unwrap_err();
    assert!(matches!(err, ConfigError::Unreadable { .. }));
}

#[test]
fn test_documents_are_rendered_with_load_time_dictionary() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("sample.yml");
    fs::write(
        &root,
        "lxc:\n  container_name: \"{{ strata_configuration_name }}-{{ strata_current_user_name }}\"\ngeneral:\n  distributable: {{ strata_create_distributable_image }}\n",
    )
    .unwrap();

    let config = load(&root).unwrap();
    assert_eq!(config.container_name(), "sample-builder");
    assert_eq!(config.get("general.distributable"), Some(&json!(false)));

    let mut context = default_context();
    context.insert("create_distributable_image".into(), json!(true));
    let paths = ConfigPaths::with_names(&root, HOST, USER).unwrap();
    let config = ConfigLoader::new(paths, &PlaceholderRenderer)
        .with_context(&context)
        .load()
        .unwrap();
    assert_eq!(config.get("general.distributable"), Some(&json!(true)));
    assert_eq!(
        config.load_time_dictionary()["strata_host_name"],
        json!(HOST)
    );
}

#[test]
fn test_undefined_template_variable_is_config_error() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("sample.yml");
    fs::write(&root, "general:\n  x: \"{{ nope }}\"\n").unwrap();

    let err = load(&root).unwrap_err();
    assert!(matches!(err, ConfigError::Template { .. }));
}

#[test]
fn test_comment_with_undefined_variable_loads() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("sample.yml");
    fs::write(
        &root,
        "# connect with {{ ansible_host }}\ngeneral:\n  use_case: \"{{ strata_configuration_name }}\"\n",
    )
    .unwrap();

    let config = load(&root).unwrap();
    assert_eq!(config.use_case().unwrap(), "sample");
}

#[test]
fn test_generic_accessor_with_default() {
    let dir = TempDir::new().unwrap();
    let config = load(&write_project(dir.path())).unwrap();
    let fallback = json!("none");
    assert_eq!(config.get_or("general.compression", &fallback), &json!("gz"));
    assert_eq!(config.get_or("general.absent", &fallback), &fallback);
}
