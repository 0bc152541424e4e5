pub mod catalog;
pub mod chat;
pub mod config_cmd;
pub mod doctor;
pub mod serve;

use std::sync::Arc;

use shopwright_admin::AdminRouter;
use shopwright_config::AppConfig;
use shopwright_core::catalog::CatalogStore;
use shopwright_core::event::EventBus;
use shopwright_store::InMemoryCatalog;
use tokio::task::JoinHandle;

/// The router and its collaborators, wired from configuration.
pub struct Runtime {
    pub router: Arc<AdminRouter>,
    pub events: Arc<EventBus>,
    sweeper: Option<JoinHandle<()>>,
}

impl Runtime {
    /// Build the bot over a freshly seeded in-memory catalog and start the
    /// session sweeper. With eviction disabled it still collects unused
    /// slots that hold no running wizard.
    pub fn start(config: &AppConfig) -> Self {
        let store: Arc<dyn CatalogStore> = Arc::new(InMemoryCatalog::seeded(&config.store));
        let events = Arc::new(EventBus::default());
        let router = Arc::new(AdminRouter::from_config(config, store, events.clone()));

        let sweep_every = config.wizard.sweep_interval();
        let sweeper = (!sweep_every.is_zero()).then(|| {
            router
                .controller()
                .sessions()
                .clone()
                .spawn_sweeper(sweep_every)
        });

        Self {
            router,
            events,
            sweeper,
        }
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}
