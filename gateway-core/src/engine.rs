//! Wires Clock, MessageBus, TaskManager, Registry, Cache, per-exchange
//! `ExchangeManager`s and connectors together and owns boot/shutdown (spec
//! §4.N).
//!
//! Concrete per-venue connectors are constructed by the caller (only
//! Binance and Mock have full `VenueAdapter` coverage per the crate's
//! venue-coverage decision) and registered onto the builder; `Engine`
//! itself only orchestrates lifecycle, it does not know how to build a
//! venue's WS/REST clients.

use crate::cache::Cache;
use crate::clock::Clock;
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::exchange_manager::ExchangeManager;
use gateway_data::bus::MessageBus;
use gateway_data::connector::PublicConnector;
use gateway_execution::connector::PrivateConnector;
use gateway_execution::ems::{AccountTypePolicy, Ems};
use gateway_execution::oms::{Oms, OrderEvent};
use gateway_execution::registry::OrderRegistry;
use gateway_instrument::ExchangeId;
use crate::task::TaskManager;
use parking_lot::Mutex as SyncMutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

struct PrivateSlot {
    connector: Arc<dyn PrivateConnector>,
    events: mpsc::UnboundedReceiver<OrderEvent>,
}

struct ExchangeSlot {
    exchange_manager: Arc<ExchangeManager>,
    account_policy: Arc<dyn AccountTypePolicy>,
    public_connectors: Vec<Arc<dyn PublicConnector>>,
    private_connectors: Vec<PrivateSlot>,
}

/// Assembles an [`Engine`] from a [`GatewayConfig`] plus the per-venue
/// connectors the caller has constructed (spec §4.N steps 1-5).
pub struct EngineBuilder {
    config: GatewayConfig,
    clock: Arc<Clock>,
    bus: Arc<SyncMutex<MessageBus>>,
    tasks: Arc<TaskManager>,
    registry: Arc<OrderRegistry>,
    cache: Arc<Cache>,
    exchanges: HashMap<ExchangeId, ExchangeSlot>,
}

impl EngineBuilder {
    /// Step 1: construct Clock, MessageBus, TaskManager, Registry, Cache
    /// (opening the configured persistence backend and reseeding
    /// in-memory state from it, per scenario S6 in spec §8).
    pub async fn new(config: GatewayConfig, backend: Arc<dyn crate::cache::PersistenceBackend>) -> Result<Self, GatewayError> {
        let cache = Arc::new(Cache::new(backend, config.cache_order_expired_time, config.cache_order_maxsize));
        cache.load_from_backend().await?;

        Ok(Self {
            config,
            clock: Arc::new(Clock::new()),
            bus: Arc::new(SyncMutex::new(MessageBus::new())),
            tasks: Arc::new(TaskManager::new()),
            registry: Arc::new(OrderRegistry::new()),
            cache,
            exchanges: HashMap::new(),
        })
    }

    pub fn clock(&self) -> Arc<Clock> {
        self.clock.clone()
    }

    pub fn bus(&self) -> Arc<SyncMutex<MessageBus>> {
        self.bus.clone()
    }

    pub fn cache(&self) -> Arc<Cache> {
        self.cache.clone()
    }

    pub fn registry(&self) -> Arc<OrderRegistry> {
        self.registry.clone()
    }

    /// Step 2: registers the (already loaded) market catalogue and
    /// account-type routing policy for one exchange.
    pub fn with_exchange(mut self, exchange: ExchangeId, exchange_manager: Arc<ExchangeManager>, account_policy: Arc<dyn AccountTypePolicy>) -> Self {
        self.exchanges.insert(exchange, ExchangeSlot { exchange_manager, account_policy, public_connectors: Vec::new(), private_connectors: Vec::new() });
        self
    }

    /// Step 3: attaches a public (market-data) connector. Spec §4.N step 3
    /// calls for enforcing "at most one public connector per venue" for
    /// venues that demand it; that per-venue limit is the caller's
    /// responsibility to honor since only the caller knows which venues
    /// demand it (mirrors the venue-coverage split: the limit is
    /// venue-specific metadata this crate doesn't hardcode).
    pub fn with_public_connector(mut self, exchange: ExchangeId, connector: Arc<dyn PublicConnector>) -> Self {
        if let Some(slot) = self.exchanges.get_mut(&exchange) {
            slot.public_connectors.push(connector);
        } else {
            warn!(%exchange, "public connector registered before with_exchange; dropping");
        }
        self
    }

    /// Step 4: attaches a private (order/account) connector together with
    /// the receiving half of its order-event channel, which the booted
    /// `Engine` drains into that exchange's OMS.
    pub fn with_private_connector(mut self, exchange: ExchangeId, connector: Arc<dyn PrivateConnector>, events: mpsc::UnboundedReceiver<OrderEvent>) -> Self {
        if let Some(slot) = self.exchanges.get_mut(&exchange) {
            slot.private_connectors.push(PrivateSlot { connector, events });
        } else {
            warn!(%exchange, "private connector registered before with_exchange; dropping");
        }
        self
    }

    /// Steps 5-6: builds one OMS and one EMS per exchange, connects every
    /// private connector (seeding Cache + position-mode check happens
    /// inside `connect()`), spawns the OMS event-drain and Cache flush
    /// tasks, then returns the running `Engine`.
    pub async fn boot(self) -> Result<Engine, GatewayError> {
        let mut runtimes = HashMap::new();

        for (exchange, slot) in self.exchanges {
            let mut connectors = HashMap::new();
            for private in &slot.private_connectors {
                connectors.insert(private.connector.account_type(), private.connector.clone());
            }

            let oms = Arc::new(Oms::new(exchange, self.registry.clone(), self.bus.clone(), self.cache.clone()));
            let ems = Arc::new(Ems::new(
                exchange,
                slot.exchange_manager.clone(),
                slot.account_policy.clone(),
                connectors,
                self.registry.clone(),
                self.bus.clone(),
            ));

            let mut private_connectors = Vec::with_capacity(slot.private_connectors.len());
            for mut private in slot.private_connectors {
                private.connector.connect().await.map_err(|e| GatewayError::Config(format!("{exchange}: {e}")))?;
                private_connectors.push(private.connector.clone());
                let oms = oms.clone();
                self.tasks
                    .create_task(async move {
                        while let Some(event) = private.events.recv().await {
                            oms.handle_event(event);
                        }
                    })
                    .await;
            }

            runtimes.insert(
                exchange,
                ExchangeRuntime { exchange_manager: slot.exchange_manager, public_connectors: slot.public_connectors, private_connectors, ems },
            );
        }

        let cache = self.cache.clone();
        let clock = self.clock.clone();
        let sync_interval_ms = self.config.cache_sync_interval.max(1);
        self.tasks
            .create_task(async move {
                let mut ticker = tokio::time::interval(std::time::Duration::from_millis(sync_interval_ms));
                loop {
                    ticker.tick().await;
                    if let Err(error) = cache.flush(clock.now_ms()).await {
                        warn!(%error, "cache flush failed");
                    }
                }
            })
            .await;

        info!(exchanges = runtimes.len(), "engine booted");

        Ok(Engine {
            clock: self.clock,
            bus: self.bus,
            tasks: self.tasks,
            registry: self.registry,
            cache: self.cache,
            exchanges: runtimes,
        })
    }
}

struct ExchangeRuntime {
    #[allow(dead_code)]
    exchange_manager: Arc<ExchangeManager>,
    public_connectors: Vec<Arc<dyn PublicConnector>>,
    private_connectors: Vec<Arc<dyn PrivateConnector>>,
    ems: Arc<Ems>,
}

/// The booted runtime (spec §4.N step 6-7). `run()` blocks on
/// `TaskManager::wait()`; `shutdown()` implements the graceful sequence.
pub struct Engine {
    clock: Arc<Clock>,
    bus: Arc<SyncMutex<MessageBus>>,
    tasks: Arc<TaskManager>,
    registry: Arc<OrderRegistry>,
    cache: Arc<Cache>,
    exchanges: HashMap<ExchangeId, ExchangeRuntime>,
}

impl Engine {
    pub fn clock(&self) -> &Arc<Clock> {
        &self.clock
    }

    pub fn bus(&self) -> &Arc<SyncMutex<MessageBus>> {
        &self.bus
    }

    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<OrderRegistry> {
        &self.registry
    }

    pub fn ems(&self, exchange: ExchangeId) -> Option<&Arc<Ems>> {
        self.exchanges.get(&exchange).map(|r| &r.ems)
    }

    pub fn tasks(&self) -> &Arc<TaskManager> {
        &self.tasks
    }

    /// Step 6: blocks until every supervised task (OMS drains, the Cache
    /// flush loop, connector-owned reconnect loops) completes or is
    /// cancelled via `shutdown()`.
    pub async fn run(&self) {
        self.tasks.wait().await;
    }

    /// Step 7: cancel first (stops the scheduler and any in-flight
    /// strategy-driven work), disconnect private connectors before public
    /// ones, then flush the Cache one last time.
    pub async fn shutdown(&self) -> Result<(), GatewayError> {
        self.tasks.cancel().await;

        for runtime in self.exchanges.values() {
            for connector in &runtime.private_connectors {
                if let Err(error) = connector.disconnect().await {
                    warn!(%error, "private connector disconnect failed during shutdown");
                }
            }
        }
        for runtime in self.exchanges.values() {
            for connector in &runtime.public_connectors {
                if let Err(error) = connector.disconnect().await {
                    warn!(%error, "public connector disconnect failed during shutdown");
                }
            }
        }

        self.cache.flush(self.clock.now_ms()).await?;
        info!("engine shutdown complete");
        Ok(())
    }
}
