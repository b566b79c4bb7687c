// ─── Launch Task ───
// Spawns the game process and forwards its output to the log.

use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::plan::LaunchInvocation;
use crate::core::error::{LauncherError, LauncherResult};

/// Run the invocation in its working directory and wait for it to exit.
pub async fn launch(invocation: &LaunchInvocation) -> LauncherResult<ExitStatus> {
    let mut cmd = Command::new(&invocation.executable);
    cmd.args(&invocation.arguments)
        .current_dir(&invocation.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    info!("Launching Minecraft with Java: {:?}", invocation.executable);
    debug!("Command (copy/paste): {}", format_command_for_logs(invocation));

    let mut child = cmd.spawn().map_err(|e| {
        LauncherError::Other(format!(
            "Failed to start {:?}: {}",
            invocation.executable, e
        ))
    })?;

    let stdout = child.stdout.take().map(|out| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(out).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(target: "minecraft", "{}", line);
            }
        })
    });
    let stderr = child.stderr.take().map(|err| {
        tokio::spawn(async move {
            let mut lines = BufReader::new(err).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(target: "minecraft", "{}", line);
            }
        })
    });

    let status = child
        .wait()
        .await
        .map_err(|e| LauncherError::io(&invocation.executable, e))?;

    for pipe in [stdout, stderr].into_iter().flatten() {
        let _ = pipe.await;
    }

    info!("Minecraft exited with {}", status);
    Ok(status)
}

fn format_command_for_logs(invocation: &LaunchInvocation) -> String {
    let program = shell_escape(&invocation.executable.to_string_lossy());
    let args = invocation
        .arguments
        .iter()
        .map(|arg| shell_escape(arg))
        .collect::<Vec<_>>()
        .join(" ");

    if args.is_empty() {
        program
    } else {
        format!("{} {}", program, args)
    }
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=' | '+')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}
