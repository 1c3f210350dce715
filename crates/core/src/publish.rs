//! Feature publishing
//!
//! Publishing is delegated to `devcontainer features publish`; this module
//! resolves the published reference from the descriptor and reports it.

use crate::errors::{Result, StructureError};
use crate::feature::{load_feature_descriptor, FeatureDescriptor};
use crate::layout::DESCRIPTOR_PATH;
use crate::lifecycle::LifecycleTool;
use crate::report::Reporter;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Registry used when none is given
pub const DEFAULT_REGISTRY: &str = "ghcr.io";

/// Display name used when the descriptor has none
pub const DEFAULT_FEATURE_NAME: &str = "init";

/// Where a feature version is published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub registry: String,
    pub namespace: String,
    pub feature_id: String,
    pub name: String,
    pub version: String,
}

impl PublishTarget {
    pub fn new(descriptor: &FeatureDescriptor, registry: &str, namespace: &str) -> Self {
        Self {
            registry: registry.to_string(),
            namespace: namespace.trim_matches('/').to_string(),
            feature_id: descriptor.id.clone(),
            name: descriptor.name_or(DEFAULT_FEATURE_NAME).to_string(),
            version: descriptor.version_or_default().to_string(),
        }
    }

    /// `<registry>/<namespace>/<id>:<version>`
    pub fn reference(&self) -> String {
        format!(
            "{}/{}/{}:{}",
            self.registry, self.namespace, self.feature_id, self.version
        )
    }
}

/// Publish the feature rooted at `base` (its `src/` directory)
#[instrument(level = "debug", skip(tool, reporter))]
pub async fn publish_feature<T: LifecycleTool>(
    tool: T,
    base: &Path,
    registry: &str,
    namespace: &str,
    dry_run: bool,
    reporter: &mut Reporter,
) -> Result<PublishTarget> {
    let descriptor_path = base.join(DESCRIPTOR_PATH);
    if !descriptor_path.is_file() {
        return Err(StructureError::MissingPath {
            path: descriptor_path,
        }
        .into());
    }
    let descriptor = load_feature_descriptor(&descriptor_path)?;
    let target = PublishTarget::new(&descriptor, registry, namespace);
    let source: PathBuf = base.join("src");

    reporter.line(format!("   📋 {} v{}", target.name, target.version));
    reporter.line(format!("   Target: {}", target.reference()));

    if dry_run {
        reporter.line(format!(
            "🔎 Dry run: devcontainer features publish {} --registry {} --namespace {}",
            source.display(),
            target.registry,
            target.namespace
        ));
        return Ok(target);
    }

    tool.features_publish(&source, &target.registry, &target.namespace)
        .await?
        .into_result("devcontainer features publish")?;

    info!("Published {}", target.reference());
    reporter.line(format!(
        "✅ Successfully published {}:{}",
        target.feature_id, target.version
    ));
    reporter.line(format!("   📖 Usage: \"{}\"", target.reference()));
    reporter.flush();
    Ok(target)
}
