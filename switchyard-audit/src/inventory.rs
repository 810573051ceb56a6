//! Codebase inventory as supplied by an external scanner.

use crate::config::AuditConfig;
use serde::{Deserialize, Serialize};
use switchyard_proto::id::RequirementId;

/// What kind of artifact this is, for protection purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactCategory {
    /// Ordinary feature code.
    Source,
    /// Build tooling, manifests, lockfiles, CI config.
    Build,
    /// Tests, fixtures and test helpers.
    TestInfra,
    /// Type and shared definitions.
    SharedTypes,
    /// Logging, error handling and telemetry utilities.
    Support,
}

impl ArtifactCategory {
    /// Everything except plain source is protected from deletion.
    pub fn is_protected(self) -> bool {
        self != ArtifactCategory::Source
    }

    /// Best guess from a path.
    pub fn infer(path: &str) -> Self {
        let lower = path.to_ascii_lowercase().replace('\\', "/");
        let segments: Vec<&str> = lower.split('/').filter(|s| !s.is_empty()).collect();
        let file = segments.last().copied().unwrap_or("");
        let stem = file.split('.').next().unwrap_or("");
        let dirs = &segments[..segments.len().saturating_sub(1)];

        const BUILD_FILES: &[&str] = &[
            "cargo.toml",
            "cargo.lock",
            "build.rs",
            "makefile",
            "dockerfile",
            "package.json",
            "package-lock.json",
            "yarn.lock",
            "go.mod",
            "go.sum",
            "pyproject.toml",
            "setup.py",
            "justfile",
            ".gitlab-ci.yml",
        ];
        if BUILD_FILES.contains(&file)
            || file.ends_with(".lock")
            || in_dir(dirs, &[".github", ".circleci", "ci", "scripts"])
        {
            return ArtifactCategory::Build;
        }

        if in_dir(dirs, &["tests", "test", "__tests__", "fixtures", "testdata", "test_utils", "testutil"])
            || stem.starts_with("test_")
            || stem.ends_with("_test")
            || stem.ends_with("_tests")
            || file.contains(".test.")
            || file.contains(".spec.")
            || stem == "test_utils"
        {
            return ArtifactCategory::TestInfra;
        }

        const SHARED: &[&str] = &[
            "types", "type", "models", "model", "shared", "common", "proto", "schema", "schemas",
            "dto",
        ];
        if SHARED.contains(&stem)
            || in_dir(dirs, SHARED)
            || stem.ends_with("_types")
            || file.ends_with(".d.ts")
        {
            return ArtifactCategory::SharedTypes;
        }

        const SUPPORT: &[&str] = &[
            "log", "logs", "logging", "logger", "error", "errors", "telemetry", "tracing",
        ];
        if SUPPORT.contains(&stem) || in_dir(dirs, SUPPORT) {
            return ArtifactCategory::Support;
        }

        ArtifactCategory::Source
    }
}

fn in_dir(dirs: &[&str], names: &[&str]) -> bool {
    dirs.iter().any(|d| names.contains(d))
}

/// How recently an artifact changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecencyBucket {
    /// Inside the active window.
    Fresh,
    /// Between the active and stale windows.
    Active,
    /// Untouched for at least the stale window.
    Stale,
}

impl RecencyBucket {
    /// Bucket a modification age.
    pub fn of(days_since_modified: u32, config: &AuditConfig) -> Self {
        if days_since_modified >= config.stale_after_days {
            RecencyBucket::Stale
        } else if days_since_modified < config.active_within_days {
            RecencyBucket::Fresh
        } else {
            RecencyBucket::Active
        }
    }
}

/// One codebase unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Repository-relative path; the artifact's identity.
    pub path: String,
    /// Approximate size.
    #[serde(default)]
    pub size_bytes: u64,
    /// Days since the last modification.
    pub days_since_modified: u32,
    /// Inbound references from other artifacts.
    #[serde(default)]
    pub reference_count: u32,
    /// Identifiers defined in the artifact.
    #[serde(default)]
    pub symbols: Vec<String>,
    /// Requirement ids the artifact declares it implements.
    #[serde(default)]
    pub claims: Vec<RequirementId>,
    /// Scanner-supplied category; inferred from the path when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ArtifactCategory>,
    /// Explicitly part of a public interface.
    #[serde(default)]
    pub public_interface: bool,
}

impl ArtifactDescriptor {
    /// An unreferenced artifact with no symbols or claims.
    pub fn new(path: impl Into<String>, days_since_modified: u32) -> Self {
        Self {
            path: path.into(),
            size_bytes: 0,
            days_since_modified,
            reference_count: 0,
            symbols: vec![],
            claims: vec![],
            category: None,
            public_interface: false,
        }
    }

    /// Set the inbound reference count.
    pub fn with_references(mut self, count: u32) -> Self {
        self.reference_count = count;
        self
    }

    /// Set the size.
    pub fn with_size(mut self, bytes: u64) -> Self {
        self.size_bytes = bytes;
        self
    }

    /// Add a symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbols.push(symbol.into());
        self
    }

    /// Add a claimed requirement id.
    pub fn with_claim(mut self, id: impl Into<RequirementId>) -> Self {
        self.claims.push(id.into());
        self
    }

    /// Override the category.
    pub fn with_category(mut self, category: ArtifactCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Mark as part of a public interface.
    pub fn public(mut self) -> Self {
        self.public_interface = true;
        self
    }

    /// The declared category, or the one inferred from the path.
    pub fn effective_category(&self) -> ArtifactCategory {
        self.category
            .unwrap_or_else(|| ArtifactCategory::infer(&self.path))
    }
}
