//! Wiring shared by the server and the CLI

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::agent::{CommandAgent, Printer};
use crate::config::OfficeConfig;
use crate::disk::YandexDiskClient;
use crate::generator::DocumentGenerator;
use crate::learning::LearningLibrary;
use crate::store::{open_store, CommandStore};

#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn CommandStore>,
    pub generator: Arc<DocumentGenerator>,
    pub learning: Arc<LearningLibrary>,
    pub disk: Option<Arc<YandexDiskClient>>,
}

impl Services {
    pub async fn from_config(config: &OfficeConfig) -> Result<Self> {
        let store = open_store(&config.store).await?;
        let generator =
            Arc::new(DocumentGenerator::new().context("Failed to build document generator")?);
        let learning = Arc::new(LearningLibrary::load_dir(&config.learning.examples_dir)?);

        let disk = if config.disk.is_configured() {
            let client = YandexDiskClient::new(&config.disk)
                .context("Failed to create Yandex Disk client")?;
            info!(base_url = client.base_url(), "Yandex Disk proxy enabled");
            Some(Arc::new(client))
        } else {
            info!("YANDEX_DISK_TOKEN not set, Yandex Disk proxy disabled");
            None
        };

        Ok(Self {
            store,
            generator,
            learning,
            disk,
        })
    }

    pub fn agent(&self, config: &OfficeConfig) -> CommandAgent {
        CommandAgent::new(
            self.store.clone(),
            self.generator.clone(),
            self.learning.clone(),
            config.agent.clone(),
        )
        .with_disk(self.disk.clone())
        .with_printer(Printer::from_config(&config.printer))
    }

    #[cfg(feature = "server")]
    pub fn app_state(&self) -> crate::api::AppState {
        crate::api::AppState {
            store: self.store.clone(),
            generator: self.generator.clone(),
            learning: self.learning.clone(),
            disk: self.disk.clone(),
        }
    }
}
