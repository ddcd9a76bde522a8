//! The worker: one explicit context object shared by every intercepted request.

use crate::fetch::Network;
use crate::lifecycle::{self, ControlMessage, LifecycleState, PrecacheReport};
use crate::strategy;
use crate::tasks::BackgroundTasks;
use mapcache_core::{AppConfig, CacheDb, Category, Classifier, Error, Generation, Partition, Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use url::Url;

/// Everything a strategy may touch. Built once per worker.
pub struct WorkerContext {
    pub config: AppConfig,
    pub db: CacheDb,
    pub network: Arc<dyn Network>,
    pub classifier: Classifier,
    pub generation: Generation,
    pub tasks: BackgroundTasks,
    pub static_partition: Partition,
    pub data_partition: Partition,
    pub tile_partition: Partition,
    pub start_page: Url,
}

impl WorkerContext {
    pub fn new(config: AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let generation = Generation::new(config.version.clone(), config.limits);
        let partition = |category: Category| {
            generation
                .partition(category)
                .ok_or_else(|| Error::InvalidInput(format!("no partition for category {category}")))
        };
        let static_partition = partition(Category::Static)?;
        let data_partition = partition(Category::Data)?;
        let tile_partition = partition(Category::TileOrCdn)?;
        let start_page = config.start_page_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let classifier = Classifier::from_config(&config);

        Ok(Self {
            config,
            db,
            network,
            classifier,
            generation,
            tasks: BackgroundTasks::new(),
            static_partition,
            data_partition,
            tile_partition,
            start_page,
        })
    }
}

/// An intercepted fetch with its optional navigation preload.
#[derive(Debug, Clone)]
pub struct FetchEvent {
    pub request: Request,
    pub preload: Option<Response>,
}

impl FetchEvent {
    pub fn new(request: Request) -> Self {
        Self { request, preload: None }
    }

    pub fn with_preload(mut self, response: Response) -> Self {
        self.preload = Some(response);
        self
    }
}

/// What happened to an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// The worker answered.
    Respond { category: Category, response: Response },
    /// Not intercepted; forward the original request unmodified.
    Passthrough,
}

/// Result of activation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    pub navigation_preload: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct WorkerStatus {
    pub state: LifecycleState,
    pub version: String,
    pub navigation_preload: bool,
    pub clients_claimed: bool,
    pub pending_tasks: usize,
}

pub struct Worker {
    ctx: Arc<WorkerContext>,
    state: RwLock<LifecycleState>,
    transition: tokio::sync::Mutex<()>,
    navigation_preload: AtomicBool,
    clients_claimed: AtomicBool,
    skip_waiting: AtomicBool,
}

impl Worker {
    pub fn new(config: AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        Ok(Self {
            ctx: Arc::new(WorkerContext::new(config, db, network)?),
            state: RwLock::new(LifecycleState::Installing),
            transition: tokio::sync::Mutex::new(()),
            navigation_preload: AtomicBool::new(false),
            clients_claimed: AtomicBool::new(false),
            skip_waiting: AtomicBool::new(false),
        })
    }

    pub fn context(&self) -> &Arc<WorkerContext> {
        &self.ctx
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: LifecycleState) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let from = *state;
        tracing::info!(%from, to = %next, version = %self.ctx.generation.version(), "lifecycle transition");
        *state = next;
    }

    fn expect_state(&self, expected: LifecycleState, action: &str) -> Result<(), Error> {
        let current = self.state();
        if current == expected {
            Ok(())
        } else {
            Err(Error::InvalidState(format!("cannot {action} while {current}")))
        }
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            state: self.state(),
            version: self.ctx.generation.version().to_string(),
            navigation_preload: self.navigation_preload.load(Ordering::SeqCst),
            clients_claimed: self.clients_claimed.load(Ordering::SeqCst),
            pending_tasks: self.ctx.tasks.pending(),
        }
    }

    /// Install, then activate unless told to wait for an explicit skip.
    ///
    /// Waiting only applies when a different version is currently active; a
    /// first install always activates.
    pub async fn start(&self) -> Result<LifecycleState, Error> {
        self.install().await?;

        let previous = self.ctx.db.active_version().await?;
        let superseding = previous.as_deref().is_some_and(|v| v != self.ctx.generation.version());
        let wait = self.ctx.config.wait_for_skip && superseding && !self.skip_waiting.load(Ordering::SeqCst);

        if wait {
            tracing::info!(previous = ?previous, "installed, waiting for SKIP_WAITING");
        } else {
            let _guard = self.transition.lock().await;
            if self.state() == LifecycleState::Installed {
                self.activate_locked().await?;
            }
        }
        Ok(self.state())
    }

    /// Open the static partition and precache the app shell.
    pub async fn install(&self) -> Result<PrecacheReport, Error> {
        let _guard = self.transition.lock().await;
        self.expect_state(LifecycleState::Installing, "install")?;

        let urls = self.ctx.config.app_shell_urls().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let report =
            lifecycle::precache_app_shell(&self.ctx.db, self.ctx.network.as_ref(), &self.ctx.static_partition, &urls)
                .await?;

        self.set_state(LifecycleState::Installed);
        Ok(report)
    }

    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let _guard = self.transition.lock().await;
        self.activate_locked().await
    }

    /// Caller holds the transition lock.
    async fn activate_locked(&self) -> Result<ActivationReport, Error> {
        self.expect_state(LifecycleState::Installed, "activate")?;
        self.set_state(LifecycleState::Activating);

        let preload = self.ctx.network.supports_navigation_preload();
        self.navigation_preload.store(preload, Ordering::SeqCst);

        let result = async {
            for partition in self.ctx.generation.partitions() {
                self.ctx.db.open_partition(&partition).await?;
            }
            let deleted = lifecycle::collect_stale_partitions(&self.ctx.db, &self.ctx.generation.keep_set()).await?;
            self.ctx.db.set_active_version(self.ctx.generation.version()).await?;
            Ok::<_, Error>(deleted)
        }
        .await;

        let deleted = match result {
            Ok(deleted) => deleted,
            Err(e) => {
                self.set_state(LifecycleState::Installed);
                return Err(e);
            }
        };

        self.clients_claimed.store(true, Ordering::SeqCst);
        self.set_state(LifecycleState::Active);
        tracing::info!(deleted = deleted.len(), navigation_preload = preload, "activated and claimed clients");
        Ok(ActivationReport { deleted, navigation_preload: preload })
    }

    /// Handle a page-posted control message. Returns the resulting state.
    pub async fn handle_message(&self, message: ControlMessage) -> Result<LifecycleState, Error> {
        match message {
            ControlMessage::SkipWaiting => {
                self.skip_waiting.store(true, Ordering::SeqCst);
                let _guard = self.transition.lock().await;
                match self.state() {
                    LifecycleState::Installed => {
                        self.activate_locked().await?;
                    }
                    state => tracing::debug!(%state, "SKIP_WAITING recorded"),
                }
            }
        }
        Ok(self.state())
    }

    /// Intercept one request.
    pub async fn handle_fetch(&self, event: FetchEvent) -> Interception {
        let FetchEvent { request, preload } = event;
        if !request.is_cacheable() || self.state() != LifecycleState::Active {
            return Interception::Passthrough;
        }

        let category = self.ctx.classifier.classify(&request);
        let preload = preload.filter(|_| self.navigation_preload.load(Ordering::SeqCst));
        tracing::debug!(url = %request.url, %category, "intercepted");

        let response = strategy::respond(&self.ctx, category, &request, preload).await;
        Interception::Respond { category, response }
    }

    /// Wait for all background writes and revalidations.
    pub async fn settle(&self) {
        self.ctx.tasks.settle().await;
    }
}
