//! Server state
//!
//! Every component receives the store handle at construction; nothing holds
//! an ambient connection.
//!
//! | Field | Type | Role |
//! |-------|------|------|
//! | store | `Arc<dyn MarketStore>` | storage backend |
//! | jwt | `JwtService` | bearer token verification |
//! | ledger | `InventoryLedger` | stock counts |
//! | orchestrator | `OrderOrchestrator` | checkout |
//! | state_machine | `OrderStateMachine` | status transitions |
//! | orders | `OrderReader` | order reads |
//! | ratings | `RatingEngine` | ratings and trust scores |

use std::sync::Arc;

use crate::auth::{JwtConfig, JwtService};
use crate::core::config::{Config, StoreBackend};
use crate::db::{MarketStore, MemoryStore, PgStore, StoreResult};
use crate::inventory::InventoryLedger;
use crate::notify::{LogNotifier, Notifier};
use crate::orders::{OrderOrchestrator, OrderReader, OrderStateMachine};
use crate::ratings::{RatingEngine, TrustScoreAggregator};

#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<dyn MarketStore>,
    pub jwt: JwtService,
    pub ledger: InventoryLedger,
    pub orchestrator: OrderOrchestrator,
    pub state_machine: OrderStateMachine,
    pub orders: OrderReader,
    pub ratings: RatingEngine,
}

impl ServerState {
    /// Connect the configured backend and wire the components
    pub async fn initialize(config: &Config) -> StoreResult<Self> {
        let store: Arc<dyn MarketStore> = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config.database_url.as_deref().unwrap_or_default();
                Arc::new(PgStore::connect(url, config.db_max_connections).await?)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let jwt = JwtService::with_config(JwtConfig::new(
            config.jwt_secret.clone(),
            config.jwt_issuer.clone(),
        ));

        Ok(Self::build(
            store,
            jwt,
            config.rating_precision,
            Arc::new(LogNotifier),
        ))
    }

    /// Wire components around an existing store
    pub fn build(
        store: Arc<dyn MarketStore>,
        jwt: JwtService,
        rating_precision: u32,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let ledger = InventoryLedger::new(store.clone());
        let aggregator = TrustScoreAggregator::new(store.clone(), rating_precision);

        Self {
            orchestrator: OrderOrchestrator::new(store.clone(), ledger.clone(), notifier.clone()),
            state_machine: OrderStateMachine::new(store.clone(), ledger.clone(), notifier.clone()),
            orders: OrderReader::new(store.clone()),
            ratings: RatingEngine::new(store.clone(), aggregator, notifier),
            ledger,
            jwt,
            store,
        }
    }
}
