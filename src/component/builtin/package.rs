// src/component/builtin/package.rs

use tracing::info;

use crate::component::{ComponentFuture, ComponentHandler, ExecutionContext};
use crate::packages::PackageDescriptor;

/// Installs `PackageName` from the blob `BlobName` (container
/// `BlobContainer`, default `packages`) and registers it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyPackageInstallation;

impl ComponentHandler for DependencyPackageInstallation {
    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> ComponentFuture<'a> {
        Box::pin(async move {
            let package_name = ctx.require_str("PackageName")?;
            let blob_name = ctx.require_str("BlobName")?;

            let mut descriptor = PackageDescriptor::new(blob_name, package_name);
            if let Some(container) = ctx.parameter_str("BlobContainer") {
                descriptor.container = container.to_string();
            }

            let services = &ctx.services;
            let path = services
                .packages
                .install_package(services.blobs.as_deref(), &descriptor, services.retry)
                .await?;

            info!(package = %package_name, path = %path.display(), "dependency package installed");
            Ok(())
        })
    }
}
