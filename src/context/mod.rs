//! Release context
//!
//! One `Context` value is threaded through every pipe: the loaded project
//! configuration, the release identity, the environment exposed to
//! templates, and the shared artifact registry.

use std::collections::HashMap;

use crate::artifact::Artifacts;
use crate::config::Project;

#[derive(Clone, Default)]
pub struct Context {
    pub config: Project,
    pub version: String,
    pub tag: String,
    pub env: HashMap<String, String>,
    pub artifacts: Artifacts,
}

impl Context {
    pub fn new(config: Project) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }
}
