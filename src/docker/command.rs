//! Container tool invocation
//!
//! One subprocess per operation, blocking until exit. Stdout and stderr
//! are folded into a single transcript so callers can wrap or scan the
//! complete tool output.

use std::io;
use std::process::{Command, Stdio};

/// Subprocess failures
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with {status}: {output}")]
    Exit {
        tool: String,
        status: String,
        output: String,
    },
}

impl ProcessError {
    /// The folded transcript of a failed invocation, if the tool ran at all
    pub fn output(&self) -> Option<&str> {
        match self {
            ProcessError::Exit { output, .. } => Some(output),
            ProcessError::Spawn { .. } => None,
        }
    }
}

/// Run the tool and return its combined stdout+stderr transcript
pub fn run_combined(tool: &str, args: &[String]) -> Result<String, ProcessError> {
    tracing::debug!(tool, ?args, "invoking container tool");

    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| ProcessError::Spawn {
            tool: tool.to_string(),
            source,
        })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        return Err(ProcessError::Exit {
            tool: tool.to_string(),
            status: output.status.to_string(),
            output: combined,
        });
    }

    Ok(combined)
}
