// src/packages/mod.rs

//! Dependency packages: discovery, installation and registration.
//!
//! A package is a directory containing zero or more `*.vcpkg` definition
//! files. Installing or discovering a package writes a `<name>.vcpkgreg`
//! registration into the packages directory; components then resolve the
//! package location by name.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::ComponentError;
use crate::storage::{BlobStore, RetryPolicy};
use crate::types::BoxFuture;

pub mod manager;

pub use manager::FsPackageManager;

pub const DEFINITION_EXTENSION: &str = "vcpkg";
pub const REGISTRATION_EXTENSION: &str = "vcpkgreg";

/// A registered package location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackagePath {
    pub name: String,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl PackagePath {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            description: None,
            version: None,
            metadata: BTreeMap::new(),
        }
    }
}

/// Contents of a `*.vcpkg` definition file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDefinition {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// What a dependency asks to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    /// Blob name in the package store (may contain `/`).
    pub blob_name: String,
    /// Name the package is registered under.
    pub package_name: String,
    pub container: String,
}

impl PackageDescriptor {
    pub fn new(blob_name: impl Into<String>, package_name: impl Into<String>) -> Self {
        Self {
            blob_name: blob_name.into(),
            package_name: package_name.into(),
            container: "packages".to_string(),
        }
    }
}

pub trait PackageManager: Send + Sync + Debug {
    /// Look up a registered package by name (case-insensitive).
    fn get_package<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<PackagePath>, ComponentError>>;

    /// Download (unless already present) and register a package. Returns the
    /// package directory.
    fn install_package<'a>(
        &'a self,
        store: Option<&'a dyn BlobStore>,
        descriptor: &'a PackageDescriptor,
        retry: RetryPolicy,
    ) -> BoxFuture<'a, Result<PathBuf, ComponentError>>;

    /// Every package definition under the packages directory.
    fn discover_packages<'a>(&'a self) -> BoxFuture<'a, Result<Vec<PackagePath>, ComponentError>>;

    fn register_package<'a>(
        &'a self,
        package: &'a PackagePath,
    ) -> BoxFuture<'a, Result<(), ComponentError>>;
}
