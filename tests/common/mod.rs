use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use storefront_api::{
    auth::{Identity, TokenIssuer, ROLE_ADMIN, ROLE_USER},
    clients::{
        CartClient, CartLine, GatewayOrder, InitiatePayment, InventoryClient, PaymentGateway,
        StockDecrement,
    },
    config::AppConfig,
    db::{self, DbConfig},
    errors::ServiceError,
    events::{self, EventSender},
    handlers::AppServices,
    services::addresses::CreateAddressRequest,
    AppState,
};

/// Cart collaborator double backed by an in-memory line list.
#[derive(Default)]
pub struct MockCartClient {
    items: StdMutex<Vec<CartLine>>,
    pub clear_calls: AtomicUsize,
    fail_clear: AtomicBool,
}

impl MockCartClient {
    pub fn set_items(&self, lines: Vec<CartLine>) {
        *self.items.lock().unwrap() = lines;
    }

    pub fn fail_clear(&self, fail: bool) {
        self.fail_clear.store(fail, Ordering::SeqCst);
    }

    #[allow(dead_code)]
    pub fn items(&self) -> Vec<CartLine> {
        self.items.lock().unwrap().clone()
    }
}

#[async_trait]
impl CartClient for MockCartClient {
    async fn get_items(&self, _identity: &Identity) -> Result<Vec<CartLine>, ServiceError> {
        Ok(self.items.lock().unwrap().clone())
    }

    async fn clear(&self, _identity: &Identity) -> Result<(), ServiceError> {
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(ServiceError::ExternalServiceError(
                "cart service returned 503 on clear".to_string(),
            ));
        }
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        self.items.lock().unwrap().clear();
        Ok(())
    }
}

/// Payment gateway double; hands out sequential correlation ids.
#[derive(Default)]
pub struct MockPaymentGateway {
    counter: AtomicUsize,
    pub requests: StdMutex<Vec<InitiatePayment>>,
    fail: AtomicBool,
}

impl MockPaymentGateway {
    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn initiate(&self, request: &InitiatePayment) -> Result<GatewayOrder, ServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::PaymentInitiationFailure(
                "gateway unavailable".to_string(),
            ));
        }
        self.requests.lock().unwrap().push(request.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayOrder {
            order_id: format!("gw_order_{n}"),
            status: "created".to_string(),
            receipt: request.receipt.clone(),
        })
    }
}

/// Inventory collaborator double recording every decrement batch.
#[derive(Default)]
pub struct MockInventoryClient {
    pub batches: StdMutex<Vec<Vec<StockDecrement>>>,
    fail: AtomicBool,
}

impl MockInventoryClient {
    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl InventoryClient for MockInventoryClient {
    async fn decrement_stock(&self, updates: &[StockDecrement]) -> Result<(), ServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::InsufficientStock(
                "product out of stock".to_string(),
            ));
        }
        self.batches.lock().unwrap().push(updates.to_vec());
        Ok(())
    }
}

/// Test application backed by a throwaway SQLite database and mock
/// collaborators.
pub struct TestApp {
    pub state: AppState,
    pub cart: Arc<MockCartClient>,
    pub gateway: Arc<MockPaymentGateway>,
    pub inventory: Arc<MockInventoryClient>,
    db_path: PathBuf,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_path =
            std::env::temp_dir().join(format!("storefront_test_{}.db", Uuid::new_v4()));
        let cfg = Arc::new(AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars",
        ));

        let db_cfg = DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let cart = Arc::new(MockCartClient::default());
        let gateway = Arc::new(MockPaymentGateway::default());
        let inventory = Arc::new(MockInventoryClient::default());

        let services = AppServices::new(
            db_arc.clone(),
            cfg.clone(),
            Arc::new(event_sender.clone()),
            cart.clone(),
            gateway.clone(),
            inventory.clone(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        Self {
            state,
            cart,
            gateway,
            inventory,
            db_path,
            _event_task: event_task,
        }
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    #[allow(dead_code)]
    pub fn router(&self) -> axum::Router {
        storefront_api::app_router(self.state.clone())
    }

    /// Bearer token accepted by the router for the given identity.
    #[allow(dead_code)]
    pub fn token_for(&self, identity: &Identity) -> String {
        let roles: Vec<&str> = identity.roles.iter().map(String::as_str).collect();
        TokenIssuer::new(self.state.config.jwt_secret.clone(), 3600)
            .issue(&identity.username, &roles)
            .expect("issue test token")
    }

    /// Stores an address owned by `identity` and returns its id.
    pub async fn seed_address(&self, identity: &Identity) -> Uuid {
        self.services()
            .addresses
            .save_address(
                identity,
                CreateAddressRequest {
                    name: "Alice Smith".to_string(),
                    phone: "9876543210".to_string(),
                    street: "12 Mill Road".to_string(),
                    city: "Madurai".to_string(),
                    state: "TN".to_string(),
                    postal_code: "625001".to_string(),
                },
            )
            .await
            .expect("seed address")
            .id
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
        for suffix in ["", "-wal", "-shm"] {
            let mut path = self.db_path.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

pub fn user() -> Identity {
    Identity::new("alice", vec![ROLE_USER.to_string()])
}

#[allow(dead_code)]
pub fn other_user() -> Identity {
    Identity::new("mallory", vec![ROLE_USER.to_string()])
}

#[allow(dead_code)]
pub fn admin() -> Identity {
    Identity::new("ops_admin", vec![ROLE_ADMIN.to_string(), ROLE_USER.to_string()])
}
