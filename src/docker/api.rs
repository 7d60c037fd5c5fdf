//! Container tool API
//!
//! Thin, fully argv-deterministic wrappers around the container tool:
//! build strategies, push with digest extraction, and manifest-list
//! composition. No argv element is ever derived from tool output.

use std::collections::HashMap;

use regex_lite::Regex;

use super::command::{self, ProcessError};
use super::DockerError;

/// How image builds are invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStrategy {
    /// `build <context> -t <img>... <flags>`
    Plain,
    /// `buildx --builder default build <context> --load -t <img>... <flags>`
    Buildx,
}

impl BuildStrategy {
    fn build_args(&self, context: &str, images: &[String], flags: &[String]) -> Vec<String> {
        let mut args: Vec<String> = match self {
            BuildStrategy::Plain => vec!["build".to_string(), context.to_string()],
            BuildStrategy::Buildx => vec![
                "buildx".to_string(),
                "--builder".to_string(),
                "default".to_string(),
                "build".to_string(),
                context.to_string(),
                "--load".to_string(),
            ],
        };
        for image in images {
            args.push("-t".to_string());
            args.push(image.clone());
        }
        args.extend(flags.iter().cloned());
        args
    }
}

/// Builds and pushes images through a fixed strategy table
pub struct Publisher {
    tool: String,
    strategies: HashMap<String, BuildStrategy>,
}

impl Publisher {
    /// Publisher over the standard strategy table
    pub fn new(tool: impl Into<String>) -> Self {
        let mut strategies = HashMap::new();
        strategies.insert("docker".to_string(), BuildStrategy::Plain);
        strategies.insert("buildx".to_string(), BuildStrategy::Buildx);
        Self {
            tool: tool.into(),
            strategies,
        }
    }

    /// Publisher with an explicit strategy table
    pub fn with_strategies(
        tool: impl Into<String>,
        strategies: HashMap<String, BuildStrategy>,
    ) -> Self {
        Self {
            tool: tool.into(),
            strategies,
        }
    }

    fn strategy(&self, selector: &str) -> Result<BuildStrategy, DockerError> {
        self.strategies
            .get(selector)
            .copied()
            .ok_or_else(|| DockerError::UnknownStrategy(selector.to_string()))
    }

    /// Build one image with all its tags
    pub fn build(
        &self,
        selector: &str,
        context: &str,
        images: &[String],
        flags: &[String],
    ) -> Result<(), DockerError> {
        let strategy = self.strategy(selector)?;
        let args = strategy.build_args(context, images, flags);
        command::run_combined(&self.tool, &args).map_err(|source| DockerError::Build {
            image: images.first().cloned().unwrap_or_default(),
            source,
        })?;
        Ok(())
    }

    /// Push one tag and return the content digest reported by the registry
    pub fn push(&self, image: &str, flags: &[String]) -> Result<String, DockerError> {
        let mut args = vec!["push".to_string(), image.to_string()];
        args.extend(flags.iter().cloned());

        let output =
            command::run_combined(&self.tool, &args).map_err(|source| DockerError::Push {
                image: image.to_string(),
                source,
            })?;

        extract_digest(&output).ok_or(DockerError::DigestNotFound { output })
    }
}

/// First `sha256:` token followed by exactly 64 lowercase hex characters
pub fn extract_digest(output: &str) -> Option<String> {
    let re = Regex::new(r"sha256:[0-9a-f]+").unwrap();
    let digest = re
        .find_iter(output)
        .map(|m| m.as_str())
        .find(|token| token.len() == "sha256:".len() + 64)
        .map(str::to_string);
    digest
}

/// Composes and pushes multi-platform manifest lists
pub struct ManifestComposer {
    tool: String,
}

impl ManifestComposer {
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    /// Create the manifest list, removing any leftover one first
    pub fn create(
        &self,
        name: &str,
        images: &[String],
        flags: &[String],
    ) -> Result<(), DockerError> {
        let rm_args = vec!["manifest".to_string(), "rm".to_string(), name.to_string()];
        if let Err(err) = command::run_combined(&self.tool, &rm_args) {
            if !indicates_absent(&err) {
                tracing::warn!(manifest = name, error = %err, "failed to remove existing manifest");
            }
        }

        let mut args = vec![
            "manifest".to_string(),
            "create".to_string(),
            name.to_string(),
        ];
        args.extend(images.iter().cloned());
        args.extend(flags.iter().cloned());

        command::run_combined(&self.tool, &args).map_err(|source| DockerError::ManifestCreate {
            name: name.to_string(),
            source,
        })?;
        Ok(())
    }

    /// Push the manifest list
    pub fn push(&self, name: &str, flags: &[String]) -> Result<(), DockerError> {
        let mut args = vec![
            "manifest".to_string(),
            "push".to_string(),
            name.to_string(),
        ];
        args.extend(flags.iter().cloned());

        command::run_combined(&self.tool, &args).map_err(|source| DockerError::ManifestPush {
            name: name.to_string(),
            source,
        })?;
        Ok(())
    }
}

/// Whether a failed removal just means the manifest was never there
fn indicates_absent(err: &ProcessError) -> bool {
    match err.output() {
        Some(output) => {
            let lower = output.to_lowercase();
            lower.contains("no such manifest") || lower.contains("not found")
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "sha256:15c95b1b64515e7b1f399dc8bd4871f868ca689a847dbfa1723a116131d8b4d3";

    #[test]
    fn test_extract_digest_embedded() {
        let output = format!("pushing...\nlatest: digest: {DIGEST} size: 1234\n");
        assert_eq!(extract_digest(&output).as_deref(), Some(DIGEST));
    }

    #[test]
    fn test_extract_digest_bare() {
        assert_eq!(extract_digest(DIGEST).as_deref(), Some(DIGEST));
    }

    #[test]
    fn test_extract_digest_first_of_many() {
        let other = "sha256:aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
        let output = format!("{DIGEST} then {other}");
        assert_eq!(extract_digest(&output).as_deref(), Some(DIGEST));
    }

    #[test]
    fn test_extract_digest_too_short() {
        // 63 hex characters
        let short = format!("sha256:{}", "a".repeat(63));
        assert_eq!(extract_digest(&short), None);
    }

    #[test]
    fn test_extract_digest_too_long() {
        // 65 hex characters is one token, not a digest plus garbage
        let long = format!("sha256:{}", "a".repeat(65));
        assert_eq!(extract_digest(&long), None);
    }

    #[test]
    fn test_extract_digest_rejects_uppercase() {
        let upper = format!("sha256:{}", "A".repeat(64));
        assert_eq!(extract_digest(&upper), None);
    }

    #[test]
    fn test_extract_digest_no_token() {
        assert_eq!(extract_digest("nothing to see"), None);
    }

    #[test]
    fn test_plain_build_args() {
        let args = BuildStrategy::Plain.build_args(
            ".",
            &["img:1".to_string(), "img:latest".to_string()],
            &["--label=x".to_string()],
        );
        assert_eq!(
            args,
            vec!["build", ".", "-t", "img:1", "-t", "img:latest", "--label=x"]
        );
    }

    #[test]
    fn test_buildx_build_args() {
        let args = BuildStrategy::Buildx.build_args("ctx", &["img:1".to_string()], &[]);
        assert_eq!(
            args,
            vec![
                "buildx", "--builder", "default", "build", "ctx", "--load", "-t", "img:1"
            ]
        );
    }

    #[test]
    fn test_unknown_strategy_named() {
        let publisher = Publisher::new("docker");
        let err = publisher
            .build("podman", ".", &["img:1".to_string()], &[])
            .unwrap_err();
        match err {
            DockerError::UnknownStrategy(s) => assert_eq!(s, "podman"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_injected_strategy_table() {
        let mut table = HashMap::new();
        table.insert("docker".to_string(), BuildStrategy::Plain);
        let publisher = Publisher::with_strategies("docker", table);

        assert!(publisher.strategy("docker").is_ok());
        // "buildx" is only known when the table says so
        assert!(matches!(
            publisher.strategy("buildx"),
            Err(DockerError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_indicates_absent() {
        let absent = ProcessError::Exit {
            tool: "docker".to_string(),
            status: "exit status: 1".to_string(),
            output: "No such manifest: registry/img:1".to_string(),
        };
        assert!(indicates_absent(&absent));

        let other = ProcessError::Exit {
            tool: "docker".to_string(),
            status: "exit status: 1".to_string(),
            output: "permission denied".to_string(),
        };
        assert!(!indicates_absent(&other));
    }
}
