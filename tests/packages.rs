// tests/packages.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use profilerun::component::{ComponentRegistry, Services};
use profilerun::engine::{ProfileExecutor, ProfileTiming};
use profilerun::fs::FileSystem;
use profilerun::fs::mock::MockFileSystem;
use profilerun::packages::{FsPackageManager, PackageDescriptor, PackageManager, PackagePath};
use profilerun::storage::{BlobDescriptor, BlobStore, FsBlobStore, RetryPolicy};
use profilerun::types::ErrorReason;
use profilerun_test_utils::builders::{ElementBuilder, ProfileBuilder};

type TestResult = Result<(), Box<dyn Error>>;

struct Fixture {
    fs: MockFileSystem,
    packages: FsPackageManager,
    blobs: FsBlobStore,
}

impl Fixture {
    fn new() -> Self {
        let fs = MockFileSystem::new();
        let shared: Arc<dyn FileSystem> = Arc::new(fs.clone());
        Self {
            packages: FsPackageManager::with_fs("/agent/packages", Arc::clone(&shared)),
            blobs: FsBlobStore::with_fs("/agent/blobs", shared),
            fs,
        }
    }
}

#[tokio::test]
async fn installs_from_the_blob_store_and_registers_the_declared_name() -> TestResult {
    init_tracing();
    let fixture = Fixture::new();
    fixture
        .blobs
        .upload(&BlobDescriptor::new("packages", "fio.3.30.zip"), b"archive")
        .await?;

    let descriptor = PackageDescriptor::new("fio.3.30.zip", "fio");
    let path = fixture
        .packages
        .install_package(Some(&fixture.blobs as &dyn BlobStore), &descriptor, RetryPolicy::none())
        .await?;

    assert_eq!(path, PathBuf::from("/agent/packages/fio"));
    assert_eq!(
        fixture.fs.read(Path::new("/agent/packages/fio/fio.3.30.zip"))?,
        b"archive".to_vec()
    );

    // No definition in the package, so it is registered under the declared name.
    let registered = fixture.packages.get_package("FIO").await?;
    assert_eq!(registered.map(|p| p.path), Some(path));
    Ok(())
}

#[tokio::test]
async fn existing_package_directories_skip_the_download() -> TestResult {
    init_tracing();
    let fixture = Fixture::new();
    fixture.fs.add_file(
        "/agent/packages/fio/fio.vcpkg",
        r#"{ "name": "fio", "version": "3.30", "description": "Flexible I/O tester" }"#,
    );

    let descriptor = PackageDescriptor::new("fio.3.30.zip", "fio");
    // No blob store at all: nothing needs downloading.
    fixture
        .packages
        .install_package(None, &descriptor, RetryPolicy::none())
        .await?;

    let package = fixture
        .packages
        .get_package("fio")
        .await?
        .ok_or("fio should be registered")?;
    assert_eq!(package.version.as_deref(), Some("3.30"));
    assert_eq!(package.description.as_deref(), Some("Flexible I/O tester"));
    assert_eq!(package.path, PathBuf::from("/agent/packages/fio"));
    Ok(())
}

#[tokio::test]
async fn definitions_with_other_names_also_register_the_declared_name() -> TestResult {
    init_tracing();
    let fixture = Fixture::new();
    fixture.fs.add_file(
        "/agent/packages/tools/linux-x64/toolset.vcpkg",
        r#"{ "name": "toolset" }"#,
    );

    let descriptor = PackageDescriptor::new("tools.zip", "tools");
    fixture
        .packages
        .install_package(None, &descriptor, RetryPolicy::none())
        .await?;

    let toolset = fixture.packages.get_package("toolset").await?.ok_or("toolset")?;
    assert_eq!(toolset.path, PathBuf::from("/agent/packages/tools/linux-x64"));

    let declared = fixture.packages.get_package("tools").await?.ok_or("tools")?;
    assert_eq!(declared.path, PathBuf::from("/agent/packages/tools"));
    Ok(())
}

#[tokio::test]
async fn missing_store_is_reported() {
    init_tracing();
    let fixture = Fixture::new();
    let descriptor = PackageDescriptor::new("fio.zip", "fio");

    let err = fixture
        .packages
        .install_package(None, &descriptor, RetryPolicy::none())
        .await
        .unwrap_err();
    assert_eq!(err.reason, ErrorReason::PackageStoreNotDefined);
}

#[tokio::test]
async fn missing_blob_is_dependency_not_found() {
    init_tracing();
    let fixture = Fixture::new();
    let descriptor = PackageDescriptor::new("nope.zip", "nope");

    let err = fixture
        .packages
        .install_package(Some(&fixture.blobs as &dyn BlobStore), &descriptor, RetryPolicy::none())
        .await
        .unwrap_err();
    assert_eq!(err.reason, ErrorReason::DependencyNotFound);
    assert!(fixture.packages.get_package("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn package_names_cannot_leave_the_packages_directory() {
    init_tracing();
    let fixture = Fixture::new();

    for name in ["..", "../etc", "nested/fio", "c:fio", ""] {
        let descriptor = PackageDescriptor::new("fio.zip", name);
        let err = fixture
            .packages
            .install_package(Some(&fixture.blobs as &dyn BlobStore), &descriptor, RetryPolicy::none())
            .await
            .unwrap_err();
        assert_eq!(err.reason, ErrorReason::DependencyDescriptionInvalid, "'{name}'");

        let err = fixture.packages.get_package(name).await.unwrap_err();
        assert_eq!(err.reason, ErrorReason::DependencyDescriptionInvalid, "'{name}'");
    }

    let err = fixture
        .packages
        .register_package(&PackagePath::new("../../escape", "/tmp"))
        .await
        .unwrap_err();
    assert_eq!(err.reason, ErrorReason::DependencyDescriptionInvalid);
    assert!(!fixture.fs.exists(Path::new("/escape.vcpkgreg")));
}

#[tokio::test]
async fn blob_names_with_relative_segments_are_invalid() {
    init_tracing();
    let fixture = Fixture::new();
    let descriptor = PackageDescriptor::new("../blobs-elsewhere/fio.zip", "fio");

    let err = fixture
        .packages
        .install_package(Some(&fixture.blobs as &dyn BlobStore), &descriptor, RetryPolicy::none())
        .await
        .unwrap_err();
    assert_eq!(err.reason, ErrorReason::DependencyDescriptionInvalid);
}

#[tokio::test]
async fn invalid_definitions_are_rejected() {
    init_tracing();
    let fixture = Fixture::new();
    fixture
        .fs
        .add_file("/agent/packages/broken/broken.vcpkg", "{ not json");

    let err = fixture.packages.discover_packages().await.unwrap_err();
    assert_eq!(err.reason, ErrorReason::DependencyDescriptionInvalid);
}

#[tokio::test]
async fn discovery_finds_definitions_and_rejects_duplicates() -> TestResult {
    init_tracing();
    let fixture = Fixture::new();
    fixture
        .fs
        .add_file("/agent/packages/a/a.vcpkg", r#"{ "name": "alpha" }"#);
    fixture
        .fs
        .add_file("/agent/packages/b/nested/b.vcpkg", r#"{ "name": "beta" }"#);
    fixture
        .fs
        .add_file("/agent/packages/b/readme.txt", "not a definition");

    let mut names: Vec<String> = fixture
        .packages
        .discover_packages()
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["alpha", "beta"]);

    fixture
        .fs
        .add_file("/agent/packages/c/c.vcpkg", r#"{ "name": "Alpha" }"#);
    let err = fixture.packages.discover_packages().await.unwrap_err();
    assert_eq!(err.reason, ErrorReason::DuplicatePackagesFound);
    assert!(err.message.contains("alpha"));
    Ok(())
}

#[tokio::test]
async fn registered_packages_can_be_looked_up() -> TestResult {
    init_tracing();
    let fixture = Fixture::new();

    assert!(fixture.packages.get_package("custom").await?.is_none());

    let package = PackagePath::new("Custom", "/opt/custom");
    fixture.packages.register_package(&package).await?;

    assert!(fixture.fs.is_file(Path::new("/agent/packages/custom.vcpkgreg")));
    assert_eq!(fixture.packages.get_package("custom").await?, Some(package));
    Ok(())
}

#[tokio::test]
async fn package_installation_dependency_runs_through_the_executor() -> TestResult {
    init_tracing();
    let fixture = Fixture::new();
    fixture
        .blobs
        .upload(&BlobDescriptor::new("tools", "linux/stress.tar"), b"tarball")
        .await?;

    let services = Services::new(Arc::new(fixture.packages.clone()))
        .with_registry(ComponentRegistry::with_builtins())
        .with_blob_store(Arc::new(fixture.blobs.clone()))
        .with_retry_policy(RetryPolicy::none());

    let profile = ProfileBuilder::new()
        .parameter("Package", "stress")
        .dependency(
            ElementBuilder::new("DependencyPackageInstallation")
                .parameter("PackageName", "$.Parameters.Package")
                .parameter("BlobName", "linux/stress.tar")
                .parameter("BlobContainer", "tools"),
        )
        .build();

    let mut executor = ProfileExecutor::new(profile, services, Vec::new());
    executor
        .execute(ProfileTiming::one_iteration(), CancellationToken::new())
        .await?;

    assert!(fixture.fs.is_file(Path::new("/agent/packages/stress/stress.tar")));
    let package = fixture.packages.get_package("stress").await?.ok_or("stress")?;
    assert_eq!(package.path, PathBuf::from("/agent/packages/stress"));
    Ok(())
}
