//! Pipe boundary
//!
//! Each release stage is a pipe: it fills in configuration defaults, can
//! declare itself skipped, and runs against the shared context. The
//! aggregated error type is what a scheduler sees.

use crate::context::Context;

/// Aggregated pipe failure
#[derive(Debug, thiserror::Error)]
pub enum PipeError {
    #[error("checksum error: {0}")]
    Checksum(#[from] crate::checksums::ChecksumError),

    #[error("docker error: {0}")]
    Docker(#[from] crate::docker::DockerError),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// A release pipeline stage
pub trait Pipe {
    /// Short stage name, for logs
    fn name(&self) -> &'static str;

    /// Fill unset configuration with stage defaults
    fn default(&self, ctx: &mut Context) -> Result<(), PipeError>;

    /// Whether this stage has nothing to do for the context
    fn skip(&self, ctx: &Context) -> bool;

    /// Execute the stage
    fn run(&self, ctx: &Context) -> Result<(), PipeError>;
}

/// Run pipes in order, stopping at the first failure
pub fn run_all(pipes: &[&dyn Pipe], ctx: &mut Context) -> Result<(), PipeError> {
    for pipe in pipes {
        pipe.default(ctx)?;
        if pipe.skip(ctx) {
            tracing::info!(pipe = pipe.name(), "skipped");
            continue;
        }
        tracing::info!(pipe = pipe.name(), "running");
        pipe.run(ctx)?;
    }
    Ok(())
}
