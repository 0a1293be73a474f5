use crate::error::ToolError;
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

/// Run an external program to completion and return its stdout.
///
/// Blocks until the program exits. A non-zero exit status is an error
/// carrying the program's stderr.
pub fn run_tool(program: &str, args: &[&str]) -> Result<String, ToolError> {
    debug!(tool = program, args = ?args, "Running external tool");

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| spawn_error(program, source))?;
    finish(program, output)
}

/// Like [`run_tool`], with `input` written to the program's stdin.
pub fn run_tool_with_input(program: &str, args: &[&str], input: &str) -> Result<String, ToolError> {
    debug!(tool = program, args = ?args, "Running external tool with input");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| spawn_error(program, source))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .map_err(|source| spawn_error(program, source))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|source| spawn_error(program, source))?;
    finish(program, output)
}

fn spawn_error(program: &str, source: std::io::Error) -> ToolError {
    ToolError::Spawn {
        tool: program.to_string(),
        source,
    }
}

fn finish(program: &str, output: std::process::Output) -> Result<String, ToolError> {
    if !output.status.success() {
        return Err(ToolError::Failed {
            tool: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = run_tool("strata-test-no-such-program", &[]).unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));

        let err = run_tool_with_input("strata-test-no-such-program", &[], "x").unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }
}
