//! Container image and manifest publishing
//!
//! Two stages: `DockerPipe` builds every configured image target and, on
//! publish, pushes each tag and records its content digest; `ManifestPipe`
//! composes multi-platform manifest lists from already-pushed tags.

pub mod api;
pub mod command;

use api::{ManifestComposer, Publisher};
use command::ProcessError;

use crate::artifact::{Artifact, ArtifactType};
use crate::config::DockerConfig;
use crate::context::Context;
use crate::pipe::{Pipe, PipeError};
use crate::tmpl;

/// Publishing errors
#[derive(Debug, thiserror::Error)]
pub enum DockerError {
    #[error("unknown build strategy: {0}")]
    UnknownStrategy(String),

    #[error("no image references rendered for target")]
    NoImages,

    #[error("failed to build {image}: {source}")]
    Build {
        image: String,
        #[source]
        source: ProcessError,
    },

    #[error("failed to push {image}: {source}")]
    Push {
        image: String,
        #[source]
        source: ProcessError,
    },

    #[error("failed to create {name}: {source}")]
    ManifestCreate {
        name: String,
        #[source]
        source: ProcessError,
    },

    #[error("failed to push {name}: {source}")]
    ManifestPush {
        name: String,
        #[source]
        source: ProcessError,
    },

    #[error("no digest in tool output: {output}")]
    DigestNotFound { output: String },

    #[error(transparent)]
    Template(#[from] crate::tmpl::TemplateError),
}

/// Render a template list, dropping entries that render empty
fn render_all(ctx: &Context, templates: &[String]) -> Result<Vec<String>, DockerError> {
    let mut rendered = Vec::new();
    for template in templates {
        let value = tmpl::render(ctx, template)?;
        if !value.trim().is_empty() {
            rendered.push(value);
        }
    }
    Ok(rendered)
}

/// Image build/publish stage
pub struct DockerPipe {
    publisher: Publisher,
}

impl DockerPipe {
    pub fn new() -> Self {
        Self {
            publisher: Publisher::new("docker"),
        }
    }

    /// Stage over a caller-supplied publisher
    pub fn with_publisher(publisher: Publisher) -> Self {
        Self { publisher }
    }

    fn run_target(&self, ctx: &Context, target: &DockerConfig) -> Result<(), DockerError> {
        let images = render_all(ctx, &target.image_templates)?;
        if images.is_empty() {
            return Err(DockerError::NoImages);
        }
        let flags = render_all(ctx, &target.build_flag_templates)?;

        self.publisher
            .build(&target.use_tool, &target.context, &images, &flags)?;
        tracing::info!(image = %images[0], "built image");

        if target.skip_push {
            tracing::info!(image = %images[0], "push skipped");
            return Ok(());
        }

        for image in &images {
            let digest = self.publisher.push(image, &target.push_flags)?;
            tracing::info!(image = %image, digest = %digest, "pushed image");

            let mut artifact = Artifact::new(image.clone(), image.clone(), ArtifactType::DockerImage);
            if !target.id.is_empty() {
                artifact = artifact.with_id(&target.id);
            }
            artifact.extra.digest = Some(digest);
            ctx.artifacts.add(artifact);
        }
        Ok(())
    }
}

impl Default for DockerPipe {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipe for DockerPipe {
    fn name(&self) -> &'static str {
        "docker images"
    }

    fn default(&self, ctx: &mut Context) -> Result<(), PipeError> {
        for docker in &mut ctx.config.dockers {
            if docker.use_tool.is_empty() {
                docker.use_tool = "docker".to_string();
            }
            if docker.context.is_empty() {
                docker.context = ".".to_string();
            }
        }
        Ok(())
    }

    fn skip(&self, ctx: &Context) -> bool {
        ctx.config.dockers.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<(), PipeError> {
        for target in &ctx.config.dockers {
            self.run_target(ctx, target)?;
        }
        Ok(())
    }
}

/// Manifest-list composition stage
pub struct ManifestPipe {
    composer: ManifestComposer,
}

impl ManifestPipe {
    pub fn new() -> Self {
        Self {
            composer: ManifestComposer::new("docker"),
        }
    }

    /// Stage over a caller-supplied composer
    pub fn with_composer(composer: ManifestComposer) -> Self {
        Self { composer }
    }

    fn run_manifest(
        &self,
        ctx: &Context,
        manifest: &crate::config::ManifestConfig,
    ) -> Result<(), DockerError> {
        let name = tmpl::render(ctx, &manifest.name_template)?;
        let images = render_all(ctx, &manifest.image_templates)?;
        if images.is_empty() {
            return Err(DockerError::NoImages);
        }

        self.composer.create(&name, &images, &manifest.create_flags)?;
        tracing::info!(manifest = %name, images = images.len(), "created manifest");

        if manifest.skip_push {
            tracing::info!(manifest = %name, "push skipped");
            return Ok(());
        }

        self.composer.push(&name, &manifest.push_flags)?;
        tracing::info!(manifest = %name, "pushed manifest");

        ctx.artifacts
            .add(Artifact::new(name.clone(), name, ArtifactType::DockerManifest));
        Ok(())
    }
}

impl Default for ManifestPipe {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipe for ManifestPipe {
    fn name(&self) -> &'static str {
        "docker manifests"
    }

    fn default(&self, _ctx: &mut Context) -> Result<(), PipeError> {
        Ok(())
    }

    fn skip(&self, ctx: &Context) -> bool {
        ctx.config.docker_manifests.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<(), PipeError> {
        for manifest in &ctx.config.docker_manifests {
            self.run_manifest(ctx, manifest)?;
        }
        Ok(())
    }
}
