//! Devcontainer configuration synthesis
//!
//! Each scenario gets a generated `devcontainer.json`. The feature set is
//! built from an explicit, ordered list of merge operations so precedence
//! never depends on incidental map behaviour:
//!
//! 1. common utilities (unless disabled)
//! 2. an empty placeholder for every `installsAfter` dependency not yet present
//! 3. every feature the scenario declares, except the feature under test
//! 4. the feature under test, as [`LOCAL_FEATURE_REF`], always last
//!
//! Later operations overwrite the value of an existing key but keep its
//! original position.

use crate::feature::FeatureDescriptor;
use crate::scenario::Scenario;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};

/// Common utilities feature injected first
pub const COMMON_UTILS_FEATURE: &str = "ghcr.io/devcontainers/features/common-utils:2";

/// Reference to the feature under test inside the generated workspace
pub const LOCAL_FEATURE_REF: &str = "./src";

/// Credentials variable pointed at a mock file for every test container
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Mock credentials path
pub const CREDENTIALS_PATH: &str = "/tmp/fake-credentials.json";

/// Option bundle of the common utilities feature
pub fn common_utils_options() -> Value {
    json!({
        "installZsh": true,
        "installOhMyZsh": true,
        "upgradePackages": true,
        "username": "automatic",
        "uid": "automatic",
        "gid": "automatic"
    })
}

/// Where a merge operation originates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSource {
    CommonUtils,
    Dependency,
    Scenario,
    FeatureUnderTest,
}

/// A single step of the feature-set merge
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOp {
    pub source: MergeSource,
    pub key: String,
    pub value: Value,
    /// Only insert when the key is not already present
    pub if_absent: bool,
}

/// Ordered merge plan for one scenario
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSetPlan {
    ops: Vec<MergeOp>,
}

impl FeatureSetPlan {
    /// Plan the feature set for `scenario` testing `descriptor`
    pub fn for_scenario(
        descriptor: &FeatureDescriptor,
        scenario: &Scenario,
        include_common_utils: bool,
    ) -> Self {
        let mut ops = Vec::new();

        if include_common_utils {
            ops.push(MergeOp {
                source: MergeSource::CommonUtils,
                key: COMMON_UTILS_FEATURE.to_string(),
                value: common_utils_options(),
                if_absent: false,
            });
        }

        for dependency in &descriptor.installs_after {
            ops.push(MergeOp {
                source: MergeSource::Dependency,
                key: dependency.clone(),
                value: json!({}),
                if_absent: true,
            });
        }

        for (key, value) in &scenario.features {
            if key == &descriptor.id {
                continue;
            }
            ops.push(MergeOp {
                source: MergeSource::Scenario,
                key: key.clone(),
                value: value.clone(),
                if_absent: false,
            });
        }

        ops.push(MergeOp {
            source: MergeSource::FeatureUnderTest,
            key: LOCAL_FEATURE_REF.to_string(),
            value: scenario
                .options_for(&descriptor.id)
                .cloned()
                .unwrap_or_else(|| json!({})),
            if_absent: false,
        });

        Self { ops }
    }

    pub fn ops(&self) -> &[MergeOp] {
        &self.ops
    }

    /// Dependency keys whose placeholder actually lands in the feature set
    pub fn added_dependencies(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        let mut added = Vec::new();
        for op in &self.ops {
            let present = seen.contains(&op.key.as_str());
            if op.source == MergeSource::Dependency && !present {
                added.push(op.key.as_str());
            }
            if !present {
                seen.push(op.key.as_str());
            }
        }
        added
    }

    /// Apply the operations in order
    pub fn apply(&self) -> IndexMap<String, Value> {
        let mut features = IndexMap::new();
        for op in &self.ops {
            if op.if_absent && features.contains_key(&op.key) {
                continue;
            }
            // insert keeps the position of an existing key
            features.insert(op.key.clone(), op.value.clone());
        }
        // Keys sharing the local ref would leave it early in the map; the
        // feature under test must close the ordering.
        if let Some(value) = features.shift_remove(LOCAL_FEATURE_REF) {
            features.insert(LOCAL_FEATURE_REF.to_string(), value);
        }
        features
    }
}

/// Options controlling synthesis
#[derive(Debug, Clone)]
pub struct SynthOptions {
    pub include_common_utils: bool,
    pub remote_user: String,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            include_common_utils: true,
            remote_user: "vscode".to_string(),
        }
    }
}

/// A generated devcontainer configuration for one scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizedConfig {
    pub name: String,
    pub image: String,
    pub features: IndexMap<String, Value>,
    pub remote_user: String,
    pub container_env: IndexMap<String, String>,
}

impl SynthesizedConfig {
    /// Build the configuration for `scenario_name`
    pub fn synthesize(
        descriptor: &FeatureDescriptor,
        scenario_name: &str,
        scenario: &Scenario,
        options: &SynthOptions,
    ) -> Self {
        let plan = FeatureSetPlan::for_scenario(descriptor, scenario, options.include_common_utils);

        let mut container_env: IndexMap<String, String> = scenario
            .option_map_for(&descriptor.id)
            .map(|opts| {
                opts.iter()
                    .map(|(key, value)| (key.to_uppercase(), env_value(value)))
                    .collect()
            })
            .unwrap_or_default();
        container_env.insert(CREDENTIALS_ENV.to_string(), CREDENTIALS_PATH.to_string());

        Self {
            name: format!("test-{}-{}", descriptor.id, scenario_name),
            image: scenario.image.clone(),
            features: plan.apply(),
            remote_user: options.remote_user.clone(),
            container_env,
        }
    }

    /// Pretty-printed `devcontainer.json` content
    pub fn to_json_pretty(&self) -> String {
        // IndexMap<String, _> and plain strings cannot fail to serialize
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Render an option value as an environment variable value
fn env_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
