//! Shared state handed to every handler through the dispatcher dependencies.

use std::sync::Arc;

use anyhow::Result;

use crate::classifier::BreedClassifier;
use crate::config::BotConfig;
use crate::labels::LabelStore;
use crate::localization::LocalizationManager;
use crate::monitoring::Monitor;

/// Everything the handlers need, built once at startup and never mutated
pub struct AppContext {
    pub config: BotConfig,
    pub classifier: Arc<dyn BreedClassifier>,
    pub labels: LabelStore,
    pub monitor: Arc<dyn Monitor>,
    pub i18n: LocalizationManager,
}

impl AppContext {
    pub fn new(
        config: BotConfig,
        classifier: Arc<dyn BreedClassifier>,
        monitor: Arc<dyn Monitor>,
    ) -> Result<Self> {
        let labels = LabelStore::new(config.data_path.clone());
        let i18n = LocalizationManager::new()?;

        Ok(Self {
            config,
            classifier,
            labels,
            monitor,
            i18n,
        })
    }
}
