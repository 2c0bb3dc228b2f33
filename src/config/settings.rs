use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Groups the store, pipeline and logging settings.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub store: StoreSettings,
    pub pipeline: PipelineSettings,
    pub logging: LoggingSettings,
}

/// Where and how messages are persisted.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StoreSettings {
    pub path: String,
    pub sync_writes: bool,
}

/// How a pipeline traversal's delivery trigger reaches the dispatcher.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Dispatch runs on the traversal's own thread.
    Inline,
    /// Dispatch is decoupled onto its own task through a channel.
    Channel,
}

/// Bounds for the ack worker.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PipelineSettings {
    pub max_concurrent_traversals: usize,
    pub queue_capacity: usize,
    pub delivery_mode: DeliveryMode,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub store: Option<PartialStoreSettings>,
    pub pipeline: Option<PartialPipelineSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialStoreSettings {
    pub path: Option<String>,
    pub sync_writes: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PartialPipelineSettings {
    pub max_concurrent_traversals: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub delivery_mode: Option<DeliveryMode>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreSettings {
                path: "txack_db".to_string(),
                sync_writes: false,
            },
            pipeline: PipelineSettings {
                max_concurrent_traversals: 64,
                queue_capacity: 1024,
                delivery_mode: DeliveryMode::Inline,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl PartialSettings {
    /// Fill every missing value from `defaults`.
    pub fn merge_over(self, defaults: Settings) -> Settings {
        let store = self.store;
        let pipeline = self.pipeline;
        let logging = self.logging;

        Settings {
            store: StoreSettings {
                path: store
                    .as_ref()
                    .and_then(|s| s.path.clone())
                    .unwrap_or(defaults.store.path),
                sync_writes: store
                    .as_ref()
                    .and_then(|s| s.sync_writes)
                    .unwrap_or(defaults.store.sync_writes),
            },
            pipeline: PipelineSettings {
                max_concurrent_traversals: pipeline
                    .as_ref()
                    .and_then(|p| p.max_concurrent_traversals)
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.pipeline.max_concurrent_traversals),
                queue_capacity: pipeline
                    .as_ref()
                    .and_then(|p| p.queue_capacity)
                    .filter(|n| *n > 0)
                    .unwrap_or(defaults.pipeline.queue_capacity),
                delivery_mode: pipeline
                    .as_ref()
                    .and_then(|p| p.delivery_mode)
                    .unwrap_or(defaults.pipeline.delivery_mode),
            },
            logging: LoggingSettings {
                level: logging
                    .and_then(|l| l.level)
                    .unwrap_or(defaults.logging.level),
            },
        }
    }
}
