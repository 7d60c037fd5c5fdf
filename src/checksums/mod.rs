//! Checksum manifest builder
//!
//! Produces the release's checksum manifest: one `<hex>  <name>` line per
//! selected build artifact and extra file, written atomically into the
//! dist directory. Every contributing build artifact gets its checksum
//! stored back into the registry, and the registered manifest artifact
//! carries a capability that recomputes the whole file from current
//! registry and disk state.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::artifact::{Artifact, ArtifactType, Artifacts, Filter};
use crate::config::ExtraFile;
use crate::context::Context;
use crate::digest::{self, Algorithm};
use crate::extrafiles;
use crate::pipe::{Pipe, PipeError};
use crate::tmpl;

const DEFAULT_NAME_TEMPLATE: &str = "{{ project_name }}_{{ version }}_checksums.txt";

/// Checksum pipe errors
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error(transparent)]
    Template(#[from] crate::tmpl::TemplateError),

    #[error(transparent)]
    Digest(#[from] crate::digest::DigestError),

    #[error(transparent)]
    ExtraFiles(#[from] crate::extrafiles::ExtraFilesError),

    #[error("failed to write checksum manifest {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything a (re)computation needs, captured once at run time
#[derive(Clone)]
struct ManifestSpec {
    algorithm: Algorithm,
    destination: PathBuf,
    ids: Vec<String>,
    extra_files: Vec<ExtraFile>,
}

/// The checksum manifest stage
pub struct ChecksumPipe;

impl Pipe for ChecksumPipe {
    fn name(&self) -> &'static str {
        "checksums"
    }

    fn default(&self, ctx: &mut Context) -> Result<(), PipeError> {
        let checksum = &mut ctx.config.checksum;
        if checksum.algorithm.is_empty() {
            checksum.algorithm = Algorithm::Sha256.name().to_string();
        }
        if checksum.name_template.is_empty() {
            checksum.name_template = DEFAULT_NAME_TEMPLATE.to_string();
        }
        Ok(())
    }

    fn skip(&self, ctx: &Context) -> bool {
        ctx.config.checksum.disable
    }

    fn run(&self, ctx: &Context) -> Result<(), PipeError> {
        Ok(run(ctx)?)
    }
}

/// Build the manifest and register the refreshable checksum artifact
pub fn run(ctx: &Context) -> Result<(), ChecksumError> {
    if ctx.config.checksum.disable {
        tracing::debug!("checksums disabled");
        return Ok(());
    }

    let filename = tmpl::render(ctx, &ctx.config.checksum.name_template)?;
    let algorithm: Algorithm = ctx.config.checksum.algorithm.parse()?;

    let spec = ManifestSpec {
        algorithm,
        destination: ctx.config.dist.join(&filename),
        ids: ctx.config.checksum.ids.clone(),
        extra_files: ctx.config.checksum.extra_files.clone(),
    };

    write_manifest(&spec, &ctx.artifacts)?;

    let registry = ctx.artifacts.clone();
    let refresh_spec = spec.clone();
    let artifact = Artifact::new(filename, spec.destination.clone(), ArtifactType::Checksum)
        .with_refresh(Arc::new(move || {
            write_manifest(&refresh_spec, &registry).map_err(Into::into)
        }));
    ctx.artifacts.add(artifact);

    Ok(())
}

fn selection(ids: &[String]) -> Filter {
    let by_type = Filter::or(vec![
        Filter::by_type(ArtifactType::UploadableArchive),
        Filter::by_type(ArtifactType::UploadableBinary),
        Filter::by_type(ArtifactType::UploadableSourceArchive),
        Filter::by_type(ArtifactType::LinuxPackage),
    ]);
    if ids.is_empty() {
        by_type
    } else {
        Filter::and(vec![by_type, Filter::by_ids(ids)])
    }
}

/// Compute every line and replace the destination file in one step.
/// Shared between the first run and the stored refresh capability.
fn write_manifest(spec: &ManifestSpec, artifacts: &Artifacts) -> Result<(), ChecksumError> {
    let selected = artifacts.filter(&selection(&spec.ids));
    let extras = extrafiles::resolve(&spec.extra_files)?;

    let mut lines: Vec<(String, String)> = Vec::new();
    let mut push_line = |name: String, sum: String| {
        if let Some(existing) = lines.iter_mut().find(|(n, _)| *n == name) {
            existing.1 = sum;
        } else {
            lines.push((name, sum));
        }
    };

    for artifact in &selected {
        let sum = digest::hash_file(spec.algorithm, &artifact.path)?;
        push_line(artifact.name.clone(), sum.clone());

        let value = format!("{}:{}", spec.algorithm, sum);
        artifacts.update(&Filter::by_artifact(artifact), move |stored| {
            stored.extra.checksum = Some(value.clone());
        });
    }

    for entry in &extras {
        let sum = digest::hash_file(spec.algorithm, &entry.path)?;
        push_line(entry.name.clone(), sum);
    }

    let mut buffer = String::new();
    for (name, sum) in &lines {
        buffer.push_str(sum);
        buffer.push_str("  ");
        buffer.push_str(name);
        buffer.push('\n');
    }

    write_atomic(&spec.destination, buffer.as_bytes())?;
    tracing::info!(
        path = %spec.destination.display(),
        entries = lines.len(),
        "wrote checksum manifest"
    );
    Ok(())
}

/// The destination is complete or absent, never partial
fn write_atomic(destination: &Path, contents: &[u8]) -> Result<(), ChecksumError> {
    let write_err = |source: io::Error| ChecksumError::Write {
        path: destination.to_path_buf(),
        source,
    };

    let dir = destination.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents).map_err(write_err)?;
    tmp.persist(destination).map_err(|e| write_err(e.error))?;
    Ok(())
}
