//! Artifact registry
//!
//! Artifacts are the units of work flowing between pipes: every produced
//! file or published image is recorded here, and later pipes select their
//! inputs by filtering the registry. The registry is internally
//! synchronized; handles are cheap clones sharing one store.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Error type produced by artifact refresh capabilities
pub type RefreshError = Box<dyn std::error::Error + Send + Sync>;

/// Stored re-computation capability
pub type RefreshFn = Arc<dyn Fn() -> Result<(), RefreshError> + Send + Sync>;

/// Kinds of artifacts the pipeline produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    UploadableBinary,
    UploadableArchive,
    UploadableSourceArchive,
    LinuxPackage,
    UploadableFile,
    Checksum,
    DockerImage,
    DockerManifest,
}

impl ArtifactType {
    /// Whether artifacts of this type contribute lines to a checksum manifest
    pub fn is_checksummable(&self) -> bool {
        matches!(
            self,
            ArtifactType::UploadableBinary
                | ArtifactType::UploadableArchive
                | ArtifactType::UploadableSourceArchive
                | ArtifactType::LinuxPackage
        )
    }
}

/// Typed per-artifact metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactExtra {
    /// Owning build/group id, used by allow-list selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Stored checksum, `<algorithm>:<hex>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    /// Container content digest, `sha256:<64 hex>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// A single produced artifact
#[derive(Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub artifact_type: ArtifactType,
    #[serde(default)]
    pub extra: ArtifactExtra,
    #[serde(skip)]
    refresh: Option<RefreshFn>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, artifact_type: ArtifactType) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            artifact_type,
            extra: ArtifactExtra::default(),
            refresh: None,
        }
    }

    /// Set the owning id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.extra.id = Some(id.into());
        self
    }

    /// Attach a re-computation capability
    pub fn with_refresh(mut self, refresh: RefreshFn) -> Self {
        self.refresh = Some(refresh);
        self
    }

    /// Re-run the stored capability. No-op for artifacts without one.
    pub fn refresh(&self) -> Result<(), RefreshError> {
        match &self.refresh {
            Some(f) => f(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("artifact_type", &self.artifact_type)
            .field("extra", &self.extra)
            .field("refreshable", &self.refresh.is_some())
            .finish()
    }
}

impl PartialEq for Artifact {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.path == other.path
            && self.artifact_type == other.artifact_type
            && self.extra == other.extra
    }
}

/// Predicate over artifacts
pub struct Filter(Box<dyn Fn(&Artifact) -> bool + Send + Sync>);

impl Filter {
    /// Match artifacts of the given type
    pub fn by_type(artifact_type: ArtifactType) -> Self {
        Self(Box::new(move |a| a.artifact_type == artifact_type))
    }

    /// Match artifacts whose id is in the allow-list
    pub fn by_ids(ids: &[String]) -> Self {
        let ids = ids.to_vec();
        Self(Box::new(move |a| {
            a.extra.id.as_ref().is_some_and(|id| ids.contains(id))
        }))
    }

    /// Match the identity of one specific artifact
    pub fn by_artifact(artifact: &Artifact) -> Self {
        let name = artifact.name.clone();
        let path = artifact.path.clone();
        let artifact_type = artifact.artifact_type;
        Self(Box::new(move |a| {
            a.name == name && a.path == path && a.artifact_type == artifact_type
        }))
    }

    /// All filters must match
    pub fn and(filters: Vec<Filter>) -> Self {
        Self(Box::new(move |a| filters.iter().all(|f| f.matches(a))))
    }

    /// Any filter may match
    pub fn or(filters: Vec<Filter>) -> Self {
        Self(Box::new(move |a| filters.iter().any(|f| f.matches(a))))
    }

    pub fn matches(&self, artifact: &Artifact) -> bool {
        (self.0)(artifact)
    }
}

/// Internally synchronized artifact store
#[derive(Clone, Default)]
pub struct Artifacts {
    inner: Arc<Mutex<Vec<Artifact>>>,
}

impl Artifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, artifact: Artifact) {
        tracing::debug!(name = %artifact.name, kind = ?artifact.artifact_type, "registering artifact");
        self.inner.lock().expect("artifact registry poisoned").push(artifact);
    }

    /// Snapshot of every artifact, in registration order
    pub fn list(&self) -> Vec<Artifact> {
        self.inner.lock().expect("artifact registry poisoned").clone()
    }

    /// Snapshot of artifacts matching the filter, in registration order
    pub fn filter(&self, filter: &Filter) -> Vec<Artifact> {
        self.inner
            .lock()
            .expect("artifact registry poisoned")
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect()
    }

    /// Visit each artifact in order, stopping at the first error
    pub fn visit<E>(&self, mut f: impl FnMut(&Artifact) -> Result<(), E>) -> Result<(), E> {
        let snapshot = self.list();
        for artifact in &snapshot {
            f(artifact)?;
        }
        Ok(())
    }

    /// Apply a mutation to every stored artifact matching the filter
    pub fn update(&self, filter: &Filter, f: impl Fn(&mut Artifact)) {
        let mut guard = self.inner.lock().expect("artifact registry poisoned");
        for artifact in guard.iter_mut() {
            if filter.matches(artifact) {
                f(artifact);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("artifact registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize the registry snapshot for release metadata output
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.list())
    }
}
