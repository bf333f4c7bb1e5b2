use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::info;

use crate::config::PrinterConfig;

/// Sends files to the system print spooler (`lp` by default)
#[derive(Debug, Clone)]
pub struct Printer {
    command: Option<String>,
}

impl Printer {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.filter(|c| !c.trim().is_empty()),
        }
    }

    pub fn from_config(config: &PrinterConfig) -> Self {
        Self::new(config.command.clone())
    }

    pub fn disabled() -> Self {
        Self { command: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.command.is_some()
    }

    /// `<command> [args...] -n <copies> <file>`
    pub fn command_line(&self, file: &Path, copies: u32) -> Option<Vec<String>> {
        let command = self.command.as_deref()?;
        let mut args: Vec<String> = command.split_whitespace().map(str::to_string).collect();
        args.push("-n".to_string());
        args.push(copies.max(1).to_string());
        args.push(file.display().to_string());
        Some(args)
    }

    /// Print and return the spooler output (e.g. the lp request id)
    pub async fn print(&self, file: &Path, copies: u32) -> Result<String> {
        let args = self
            .command_line(file, copies)
            .ok_or_else(|| anyhow!("Printing is disabled (OFFICE_PRINT_COMMAND)"))?;
        if !file.is_file() {
            bail!("File to print does not exist: {}", file.display());
        }

        let output = Command::new(&args[0])
            .args(&args[1..])
            .output()
            .await
            .with_context(|| format!("Failed to run print command '{}'", args[0]))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            bail!("Print command exited with {}: {}", output.status, stderr);
        }

        info!(file = %file.display(), copies, "Sent document to printer");
        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let printer = Printer::new(Some("lp -d office".into()));
        assert_eq!(
            printer.command_line(Path::new("/tmp/a.docx"), 2).unwrap(),
            vec!["lp", "-d", "office", "-n", "2", "/tmp/a.docx"]
        );
        assert_eq!(
            printer.command_line(Path::new("a.docx"), 0).unwrap()[2],
            "1"
        );
        assert!(Printer::new(Some(" ".into())).command_line(Path::new("a"), 1).is_none());
    }

    #[tokio::test]
    async fn test_disabled_printer_fails() {
        let err = Printer::disabled().print(Path::new("a.docx"), 1).await.unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let printer = Printer::new(Some("echo".into()));
        let err = printer
            .print(&dir.path().join("missing.docx"), 1)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_print_runs_command() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("doc.docx");
        std::fs::write(&file, b"x").unwrap();

        let output = Printer::new(Some("echo".into())).print(&file, 3).await.unwrap();
        assert!(output.contains("doc.docx"));
    }
}
