//! Integration tests for Settings loading with layered precedence.
//!
//! These tests run without a global config (temp directories only), so they
//! exercise the local file layer on top of compiled defaults.

use std::fs;

use tempfile::TempDir;

use rstree::application::TraversalStrategy;
use rstree::util::testing::{Label, SampleTree};
use rstree::{SanitizePolicy, Settings, TreeArena, TreeError};

#[test]
fn given_local_config_when_load_then_overrides_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rstree.toml");
    fs::write(
        &path,
        r#"
[tree]
sanitize = "reject"

[transform]
traversal = "post_order"
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(&path)).expect("load settings");

    // Assert
    assert_eq!(settings.tree.sanitize, SanitizePolicy::Reject);
    assert_eq!(settings.transform.traversal, TraversalStrategy::PostOrder);
}

#[test]
fn given_partial_local_config_when_load_then_missing_keys_keep_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rstree.toml");
    fs::write(&path, "[transform]\ntraversal = \"post_order\"\n").unwrap();

    let settings = Settings::load(Some(&path)).expect("load settings");

    assert_eq!(settings.tree.sanitize, SanitizePolicy::Copy);
    assert_eq!(settings.transform.traversal, TraversalStrategy::PostOrder);
}

#[test]
fn given_missing_local_config_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    let result = Settings::load(Some(&path));

    assert!(matches!(result, Err(TreeError::Config { .. })));
}

#[test]
fn given_invalid_value_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rstree.toml");
    fs::write(&path, "[tree]\nsanitize = \"sometimes\"\n").unwrap();

    let result = Settings::load(Some(&path));

    assert!(matches!(result, Err(TreeError::Config { .. })));
}

#[test]
fn given_reject_policy_when_reinserting_owned_node_then_already_owned() {
    // Arrange
    let settings = Settings::from_toml_str("[tree]\nsanitize = \"reject\"\n").expect("parse");
    let mut arena = TreeArena::<Label>::with_settings(settings);
    let t = SampleTree::build(&mut arena).expect("build sample tree");
    let before = arena.len();

    // Act
    let result = arena.add_child(t.e, t.c);

    // Assert
    assert!(matches!(result, Err(TreeError::AlreadyOwned { .. })));
    assert_eq!(arena.len(), before);
    assert!(!arena.has_children(t.e).unwrap());
}
