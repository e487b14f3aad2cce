// src/packages/manager.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobMatcher};
use tracing::{debug, info};

use super::{
    DEFINITION_EXTENSION, PackageDefinition, PackageDescriptor, PackageManager, PackagePath,
    REGISTRATION_EXTENSION,
};
use crate::errors::ComponentError;
use crate::fs::{FileSystem, RealFileSystem};
use crate::storage::{BlobDescriptor, BlobStore, RetryPolicy, StorageError};
use crate::types::{BoxFuture, ErrorReason};

/// Package manager rooted at a local packages directory.
#[derive(Debug, Clone)]
pub struct FsPackageManager {
    packages_dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FsPackageManager {
    pub fn new(packages_dir: impl Into<PathBuf>) -> Self {
        Self::with_fs(packages_dir, Arc::new(RealFileSystem))
    }

    pub fn with_fs(packages_dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            packages_dir: packages_dir.into(),
            fs,
        }
    }

    pub fn packages_dir(&self) -> &Path {
        &self.packages_dir
    }

    fn registration_path(&self, name: &str) -> Result<PathBuf, ComponentError> {
        check_package_name(name)?;
        Ok(self
            .packages_dir
            .join(format!("{}.{REGISTRATION_EXTENSION}", name.to_lowercase())))
    }

    /// Read every `*.vcpkg` definition below `dir`.
    fn discover_in(&self, dir: &Path) -> Result<Vec<PackagePath>, ComponentError> {
        if !self.fs.is_dir(dir) {
            return Ok(Vec::new());
        }

        let files = self.fs.walk_files(dir).map_err(|e| {
            ComponentError::dependency(
                ErrorReason::DependencyInstallationFailed,
                format!("failed to enumerate package directory '{}'", dir.display()),
            )
            .with_source(e)
        })?;

        let definitions = definition_matcher()?;
        let mut packages = Vec::new();
        for file in files {
            let relative = file.strip_prefix(dir).unwrap_or(&file);
            if !definitions.is_match(relative) {
                continue;
            }

            let contents = self.fs.read_to_string(&file).map_err(|e| {
                ComponentError::dependency(
                    ErrorReason::DependencyDescriptionInvalid,
                    format!("failed to read package definition '{}'", file.display()),
                )
                .with_source(e)
            })?;
            if contents.trim().is_empty() {
                continue;
            }

            let definition: PackageDefinition = serde_json::from_str(&contents).map_err(|e| {
                ComponentError::dependency(
                    ErrorReason::DependencyDescriptionInvalid,
                    format!(
                        "Invalid package definition. The contents of the package definition at the path '{}' is not formatted correctly.",
                        file.display()
                    ),
                )
                .with_source(e)
            })?;

            let location = file.parent().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            packages.push(PackagePath {
                name: definition.name,
                path: location,
                description: definition.description,
                version: definition.version,
                metadata: definition.metadata,
            });
        }

        Ok(packages)
    }

    fn write_registration(&self, package: &PackagePath) -> Result<(), ComponentError> {
        let path = self.registration_path(&package.name)?;
        let contents = serde_json::to_vec_pretty(package).map_err(|e| {
            ComponentError::dependency(
                ErrorReason::DependencyInstallationFailed,
                format!("failed to serialize registration for package '{}'", package.name),
            )
            .with_source(e)
        })?;

        self.fs.write(&path, &contents).map_err(|e| {
            ComponentError::dependency(
                ErrorReason::DependencyInstallationFailed,
                format!("failed to register package '{}'", package.name),
            )
            .with_source(e)
        })?;

        debug!(package = %package.name, path = %path.display(), "package registered");
        Ok(())
    }

    async fn install(
        &self,
        store: Option<&dyn BlobStore>,
        descriptor: &PackageDescriptor,
        retry: RetryPolicy,
    ) -> Result<PathBuf, ComponentError> {
        check_package_name(&descriptor.package_name)?;
        let package_dir = self.packages_dir.join(descriptor.package_name.to_lowercase());

        if self.fs.is_dir(&package_dir) {
            debug!(package = %descriptor.package_name, "package already installed, skipping download");
        } else {
            let Some(store) = store else {
                return Err(ComponentError::dependency(
                    ErrorReason::PackageStoreNotDefined,
                    format!(
                        "Package store not defined. The package '{}' cannot be installed because the package store was not provided (e.g. --blob-store).",
                        descriptor.blob_name
                    ),
                ));
            };

            let blob = BlobDescriptor::new(&descriptor.container, &descriptor.blob_name);
            let content = retry
                .run("download package", || store.download(&blob))
                .await
                .map_err(|e| {
                    let reason = match e {
                        StorageError::NotFound(_) => ErrorReason::DependencyNotFound,
                        StorageError::InvalidName(_) => ErrorReason::DependencyDescriptionInvalid,
                        _ => ErrorReason::DependencyInstallationFailed,
                    };
                    ComponentError::dependency(
                        reason,
                        format!("Dependency package download failed for package '{}'.", descriptor.blob_name),
                    )
                    .with_source(e)
                })?;

            let file_name = descriptor
                .blob_name
                .rsplit('/')
                .next()
                .filter(|s| !s.is_empty() && *s != "." && *s != ".." && !s.contains('\\'))
                .unwrap_or(descriptor.package_name.as_str());

            self.fs
                .create_dir_all(&package_dir)
                .and_then(|_| self.fs.write(&package_dir.join(file_name), &content))
                .map_err(|e| {
                    ComponentError::dependency(
                        ErrorReason::DependencyInstallationFailed,
                        format!("Dependency package installation failed for package '{}'.", descriptor.blob_name),
                    )
                    .with_source(e)
                })?;

            info!(package = %descriptor.package_name, path = %package_dir.display(), "package installed");
        }

        let discovered = self.discover_in(&package_dir)?;
        for package in &discovered {
            self.write_registration(package)?;
        }

        // A package may carry no definition, or one whose name differs from
        // the declared name. Either way it is also registered under the
        // declared name. Collisions with other packages are not checked.
        let declared_is_defined = discovered
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(&descriptor.package_name));
        if !declared_is_defined {
            self.write_registration(&PackagePath::new(&descriptor.package_name, &package_dir))?;
        }

        Ok(package_dir)
    }
}

/// Package names become directory and file names below the packages root.
fn check_package_name(name: &str) -> Result<(), ComponentError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." || name.contains(['/', '\\', ':']) {
        return Err(ComponentError::dependency(
            ErrorReason::DependencyDescriptionInvalid,
            format!("Invalid package name '{name}'. Package names cannot contain path separators or relative path segments."),
        ));
    }
    Ok(())
}

fn definition_matcher() -> Result<GlobMatcher, ComponentError> {
    Glob::new(&format!("**/*.{DEFINITION_EXTENSION}"))
        .map(|g| g.compile_matcher())
        .map_err(|e| {
            ComponentError::dependency(
                ErrorReason::DependencyDescriptionInvalid,
                "invalid package definition pattern",
            )
            .with_source(e)
        })
}

impl PackageManager for FsPackageManager {
    fn get_package<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, Result<Option<PackagePath>, ComponentError>> {
        Box::pin(async move {
            let path = self.registration_path(name)?;
            if !self.fs.is_file(&path) {
                return Ok(None);
            }
            let contents = self.fs.read_to_string(&path).map_err(|e| {
                ComponentError::dependency(
                    ErrorReason::DependencyDescriptionInvalid,
                    format!("failed to read registration for package '{name}'"),
                )
                .with_source(e)
            })?;
            let package = serde_json::from_str(&contents).map_err(|e| {
                ComponentError::dependency(
                    ErrorReason::DependencyDescriptionInvalid,
                    format!("invalid registration for package '{name}'"),
                )
                .with_source(e)
            })?;
            Ok(Some(package))
        })
    }

    fn install_package<'a>(
        &'a self,
        store: Option<&'a dyn BlobStore>,
        descriptor: &'a PackageDescriptor,
        retry: RetryPolicy,
    ) -> BoxFuture<'a, Result<PathBuf, ComponentError>> {
        Box::pin(self.install(store, descriptor, retry))
    }

    fn discover_packages<'a>(&'a self) -> BoxFuture<'a, Result<Vec<PackagePath>, ComponentError>> {
        Box::pin(async move {
            let packages = self.discover_in(&self.packages_dir)?;

            let mut seen: BTreeMap<String, usize> = BTreeMap::new();
            for package in &packages {
                *seen.entry(package.name.to_lowercase()).or_default() += 1;
            }
            let duplicates: Vec<&str> = seen
                .iter()
                .filter(|(_, count)| **count > 1)
                .map(|(name, _)| name.as_str())
                .collect();
            if !duplicates.is_empty() {
                return Err(ComponentError::dependency(
                    ErrorReason::DuplicatePackagesFound,
                    format!(
                        "Duplicate packages discovered. Packages must have unique names. The following packages have duplicates: {}",
                        duplicates.join(", ")
                    ),
                ));
            }

            Ok(packages)
        })
    }

    fn register_package<'a>(
        &'a self,
        package: &'a PackagePath,
    ) -> BoxFuture<'a, Result<(), ComponentError>> {
        Box::pin(async move { self.write_registration(package) })
    }
}
