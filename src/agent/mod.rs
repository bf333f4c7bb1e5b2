//! Command agent
//!
//! Background task that claims pending commands from the store and
//! executes them: generate a document, print a file, or upload a file to
//! Yandex Disk. Every claimed command ends up `completed` with a
//! [`CommandResult`] or `failed` with the error chain.

mod printer;

pub use printer::Printer;

use anyhow::{anyhow, Context, Result};
use office_types::{Command, CommandAction, CommandResult, DocumentParams, TemplateType};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::AgentConfig;
use crate::disk::{normalize_path, YandexDiskClient};
use crate::generator::DocumentGenerator;
use crate::learning::LearningLibrary;
use crate::store::CommandStore;

pub struct CommandAgent {
    store: Arc<dyn CommandStore>,
    generator: Arc<DocumentGenerator>,
    learning: Arc<LearningLibrary>,
    disk: Option<Arc<YandexDiskClient>>,
    printer: Printer,
    config: AgentConfig,
}

impl CommandAgent {
    pub fn new(
        store: Arc<dyn CommandStore>,
        generator: Arc<DocumentGenerator>,
        learning: Arc<LearningLibrary>,
        config: AgentConfig,
    ) -> Self {
        Self {
            store,
            generator,
            learning,
            disk: None,
            printer: Printer::disabled(),
            config,
        }
    }

    pub fn with_disk(mut self, disk: Option<Arc<YandexDiskClient>>) -> Self {
        self.disk = disk;
        self
    }

    pub fn with_printer(mut self, printer: Printer) -> Self {
        self.printer = printer;
        self
    }

    /// Run until `shutdown` turns true or its sender is dropped
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            poll_interval_secs = self.config.poll_interval().as_secs(),
            batch_size = self.config.batch_size,
            store = self.store.backend_name(),
            "Command agent started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_once().await {
                        Ok(0) => {}
                        Ok(count) => debug!(count, "Processed command batch"),
                        Err(e) => warn!("Command poll failed: {:#}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("Command agent shutting down");
    }

    /// Claim and process one batch. Returns the number of commands handled.
    pub async fn run_once(&self) -> Result<usize> {
        let commands = self
            .store
            .claim_pending(self.config.batch_size.max(1))
            .await
            .context("Failed to claim pending commands")?;

        let count = commands.len();
        for command in commands {
            // A store error leaves this command claimed; the rest of the batch still runs
            if let Err(e) = self.handle(&command).await {
                error!(id = %command.id, "Failed to record command outcome: {:#}", e);
            }
        }
        Ok(count)
    }

    async fn handle(&self, command: &Command) -> Result<()> {
        info!(id = %command.id, kind = command.action.kind(), "Processing command");
        match self.process(&command.action).await {
            Ok(result) => {
                let value = serde_json::to_value(&result).context("Failed to serialize result")?;
                let completed = self
                    .store
                    .complete(command.id, value)
                    .await
                    .with_context(|| format!("Failed to complete command {}", command.id))?;
                match completed {
                    Some(_) => info!(id = %command.id, "Command completed"),
                    None => warn!(
                        id = %command.id,
                        "Command finished but was no longer processing; result dropped"
                    ),
                }
            }
            Err(e) => {
                let message = format!("{:#}", e);
                error!(id = %command.id, error = %message, "Command failed");
                self.store
                    .fail(command.id, &message)
                    .await
                    .with_context(|| format!("Failed to mark command {} failed", command.id))?;
            }
        }
        Ok(())
    }

    async fn process(&self, action: &CommandAction) -> Result<CommandResult> {
        match action {
            CommandAction::CreateDocument {
                template_type,
                params,
            } => self.create_document(*template_type, params).await,
            CommandAction::PrintDocument { file_path, copies } => {
                self.print_document(file_path, *copies).await
            }
            CommandAction::UploadDocument {
                file_path,
                disk_path,
            } => self.upload_document(file_path, disk_path.as_deref()).await,
        }
    }

    async fn create_document(
        &self,
        template_type: TemplateType,
        params: &DocumentParams,
    ) -> Result<CommandResult> {
        let profile = self.learning.profile_for(template_type);
        let generated = self
            .generator
            .generate(template_type, params, profile.as_ref())
            .with_context(|| format!("Failed to generate {}", template_type))?;

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .with_context(|| format!("Failed to create {:?}", self.config.output_dir))?;
        let path = self.config.output_dir.join(&generated.file_name);
        tokio::fs::write(&path, &generated.bytes)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;

        if self.config.learn_from_generated {
            let learning = self.learning.clone();
            let name = generated.file_name.clone();
            let bytes = generated.bytes.clone();
            let recorded = tokio::task::spawn_blocking(move || learning.add_example(&name, &bytes))
                .await
                .map_err(anyhow::Error::from)
                .and_then(|r| r.map_err(anyhow::Error::from));
            if let Err(e) = recorded {
                warn!("Failed to record learning example {}: {:#}", generated.file_name, e);
            }
        }

        let disk_path = match (&self.disk, &self.config.disk_upload_dir) {
            (Some(disk), Some(dir)) => {
                let target = join_disk_path(dir, &generated.file_name);
                upload_into_folder(disk, &target, generated.bytes.clone()).await?;
                Some(target)
            }
            _ => None,
        };

        Ok(CommandResult {
            template_type: Some(template_type),
            file_path: Some(path.display().to_string()),
            file_size: Some(generated.size as u64),
            sha256: Some(generated.sha256),
            disk_path,
            message: Some(format!("Created {}", generated.file_name)),
        })
    }

    async fn print_document(&self, file_path: &str, copies: u32) -> Result<CommandResult> {
        let path = Path::new(file_path);
        let output = self.printer.print(path, copies).await?;
        Ok(CommandResult {
            file_path: Some(file_path.to_string()),
            message: Some(if output.is_empty() {
                format!("Printed {} copies", copies.max(1))
            } else {
                output
            }),
            ..Default::default()
        })
    }

    async fn upload_document(
        &self,
        file_path: &str,
        disk_path: Option<&str>,
    ) -> Result<CommandResult> {
        let disk = self
            .disk
            .as_ref()
            .ok_or_else(|| anyhow!("Yandex Disk is not configured (set YANDEX_DISK_TOKEN)"))?;

        let path = Path::new(file_path);
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", file_path))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("Not a file path: {}", file_path))?;

        let default_dir = self.config.disk_upload_dir.as_deref().unwrap_or("disk:/");
        let target = upload_target(disk_path, default_dir, &file_name);

        let size = bytes.len() as u64;
        upload_into_folder(disk, &target, bytes).await?;

        Ok(CommandResult {
            file_path: Some(file_path.to_string()),
            file_size: Some(size),
            disk_path: Some(target.clone()),
            message: Some(format!("Uploaded to {}", target)),
            ..Default::default()
        })
    }
}

fn join_disk_path(dir: &str, file_name: &str) -> String {
    let dir = normalize_path(dir);
    format!("{}/{}", dir.trim_end_matches('/'), file_name)
}

/// Where an uploaded file lands. An explicit path ending in `/` or without
/// an extension names a folder, and the local file name is appended.
fn upload_target(disk_path: Option<&str>, default_dir: &str, file_name: &str) -> String {
    match disk_path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => {
            let last = p.rsplit('/').next().unwrap_or_default();
            if p.ends_with('/') || Path::new(last).extension().is_none() {
                join_disk_path(p, file_name)
            } else {
                normalize_path(p)
            }
        }
        None => join_disk_path(default_dir, file_name),
    }
}

/// Parent folder of a disk path, `None` for the disk root
fn parent_disk_path(path: &str) -> Option<&str> {
    let (parent, _) = path.rsplit_once('/')?;
    (!parent.ends_with(':')).then_some(parent)
}

async fn upload_into_folder(disk: &YandexDiskClient, target: &str, bytes: Vec<u8>) -> Result<()> {
    if let Some(folder) = parent_disk_path(target) {
        disk.create_folder_all(folder)
            .await
            .with_context(|| format!("Failed to create disk folder {}", folder))?;
    }
    disk.upload(target, bytes, true)
        .await
        .with_context(|| format!("Failed to upload {}", target))
}
