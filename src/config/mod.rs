//! Project configuration
//!
//! The release project file is TOML. Every section is optional; pipe
//! `default` hooks fill in whatever the file leaves unset.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Project name, available to name templates
    pub name: String,

    /// Output directory for produced files
    pub dist: PathBuf,

    pub checksum: ChecksumConfig,

    pub dockers: Vec<DockerConfig>,

    pub docker_manifests: Vec<ManifestConfig>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            name: String::new(),
            dist: PathBuf::from("dist"),
            checksum: ChecksumConfig::default(),
            dockers: Vec::new(),
            docker_manifests: Vec::new(),
        }
    }
}

/// Checksum manifest settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksumConfig {
    /// Skip manifest generation entirely
    pub disable: bool,

    /// Digest algorithm name; empty means the default
    pub algorithm: String,

    /// Manifest file name template; empty means the default
    pub name_template: String,

    /// Build id allow-list; empty means all builds
    pub ids: Vec<String>,

    /// Additional files to include, by glob
    pub extra_files: Vec<ExtraFile>,
}

/// One extra-file glob entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtraFile {
    pub glob: String,
}

/// One container image target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Owning build id recorded on published artifacts
    pub id: String,

    /// Image reference templates; all tags of one build
    pub image_templates: Vec<String>,

    /// Build context directory
    pub context: String,

    /// Strategy selector, `docker` or `buildx`
    #[serde(rename = "use")]
    pub use_tool: String,

    /// Extra build flag templates
    pub build_flag_templates: Vec<String>,

    /// Flags appended to every push
    pub push_flags: Vec<String>,

    /// Build but never push
    pub skip_push: bool,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            image_templates: Vec::new(),
            context: ".".to_string(),
            use_tool: "docker".to_string(),
            build_flag_templates: Vec::new(),
            push_flags: Vec::new(),
            skip_push: false,
        }
    }
}

/// One multi-platform manifest list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Manifest reference template
    pub name_template: String,

    /// Member image reference templates
    pub image_templates: Vec<String>,

    /// Flags appended to `manifest create`
    pub create_flags: Vec<String>,

    /// Flags appended to `manifest push`
    pub push_flags: Vec<String>,

    /// Compose but never push
    pub skip_push: bool,
}

impl Project {
    /// Load a project file, naming the path on failure
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let project: Project = toml::from_str(r#"name = "demo""#).unwrap();
        assert_eq!(project.name, "demo");
        assert_eq!(project.dist, PathBuf::from("dist"));
        assert!(!project.checksum.disable);
        assert!(project.checksum.algorithm.is_empty());
        assert!(project.dockers.is_empty());
    }

    #[test]
    fn test_full_checksum_section() {
        let project: Project = toml::from_str(
            r#"
            name = "demo"

            [checksum]
            algorithm = "sha512"
            name_template = "{{ project_name }}.sums"
            ids = ["linux"]

            [[checksum.extra_files]]
            glob = "docs/**/*.md"
            "#,
        )
        .unwrap();

        assert_eq!(project.checksum.algorithm, "sha512");
        assert_eq!(project.checksum.ids, vec!["linux"]);
        assert_eq!(project.checksum.extra_files[0].glob, "docs/**/*.md");
    }

    #[test]
    fn test_docker_section_defaults() {
        let project: Project = toml::from_str(
            r#"
            name = "demo"

            [[dockers]]
            image_templates = ["registry/demo:{{ version }}"]
            "#,
        )
        .unwrap();

        let docker = &project.dockers[0];
        assert_eq!(docker.use_tool, "docker");
        assert_eq!(docker.context, ".");
        assert!(!docker.skip_push);
    }

    #[test]
    fn test_manifest_section() {
        let project: Project = toml::from_str(
            r#"
            name = "demo"

            [[docker_manifests]]
            name_template = "registry/demo:{{ version }}"
            image_templates = [
                "registry/demo:{{ version }}-amd64",
                "registry/demo:{{ version }}-arm64",
            ]
            create_flags = ["--insecure"]
            "#,
        )
        .unwrap();

        let manifest = &project.docker_manifests[0];
        assert_eq!(manifest.image_templates.len(), 2);
        assert_eq!(manifest.create_flags, vec!["--insecure"]);
    }

    #[test]
    fn test_load_names_missing_path() {
        let err = Project::load(Path::new("/nonexistent/slipway.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/slipway.toml"));
    }

    #[test]
    fn test_load_names_unparseable_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name = [not toml").unwrap();

        let err = Project::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
