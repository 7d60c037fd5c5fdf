//! Name template rendering
//!
//! Templates resolve against the release context: `project_name`,
//! `version`, `tag`, and the `env` map. Rendering is strict, so an
//! unresolved variable is an error rather than an empty string, and the
//! renderer's own message is surfaced unchanged.

use minijinja::{Environment, UndefinedBehavior};

use crate::context::Context;

/// Template rendering failure, surfaced verbatim
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct TemplateError(#[from] minijinja::Error);

/// Render one template string against the context
pub fn render(ctx: &Context, template: &str) -> Result<String, TemplateError> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);

    let rendered = env.render_str(
        template,
        minijinja::context! {
            project_name => ctx.config.name,
            version => ctx.version,
            tag => ctx.tag,
            env => ctx.env,
        },
    )?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Project;

    fn demo_context() -> Context {
        let mut config = Project::default();
        config.name = "demo".to_string();
        Context::new(config).with_version("1.2.0").with_tag("v1.2.0")
    }

    #[test]
    fn test_render_fields() {
        let ctx = demo_context();
        let out = render(&ctx, "{{ project_name }}_{{ version }}_checksums.txt").unwrap();
        assert_eq!(out, "demo_1.2.0_checksums.txt");

        assert_eq!(render(&ctx, "{{ tag }}").unwrap(), "v1.2.0");
    }

    #[test]
    fn test_render_env() {
        let mut ctx = demo_context();
        ctx.env.insert("REGISTRY".to_string(), "ghcr.io/acme".to_string());

        let out = render(&ctx, "{{ env.REGISTRY }}/demo:{{ version }}").unwrap();
        assert_eq!(out, "ghcr.io/acme/demo:1.2.0");
    }

    #[test]
    fn test_unresolved_variable_errors() {
        let ctx = demo_context();
        assert!(render(&ctx, "{{ nope }}").is_err());
    }

    #[test]
    fn test_syntax_error_surfaces() {
        let ctx = demo_context();
        let err = render(&ctx, "{{ version ").unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
