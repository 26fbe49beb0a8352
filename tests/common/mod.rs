#![allow(dead_code)]

pub mod mocks;

use cim_lib::application::ports::remote_store::RemoteStore;
use cim_lib::application::services::{CheckoutLine, CheckoutRequest, CreditPaymentRequest};
use cim_lib::domain::entities::{AuthSession, PaymentType};
use cim_lib::domain::value_objects::{Money, Quantity};
use cim_lib::infrastructure::database::ConnectionPool;
use cim_lib::shared::config::AppConfig;
use cim_lib::state::AppState;
use mocks::MockRemoteStore;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub struct SyncTestContext {
    pub state: AppState,
    pub remote: Arc<MockRemoteStore>,
    pub session: AuthSession,
    pub store_id: Uuid,
}

impl SyncTestContext {
    pub async fn new(online: bool) -> Self {
        Self::with_remote(MockRemoteStore::new(), online).await
    }

    pub async fn with_remote(remote: MockRemoteStore, online: bool) -> Self {
        let pool = ConnectionPool::from_memory()
            .await
            .expect("in-memory sqlite");
        pool.migrate().await.expect("offline store migrations");

        let mut config = AppConfig::default();
        config.sync.auto_sync = false;
        config.sync.sync_interval = 3600;
        config.sync.command_buffer = 8;

        let remote = Arc::new(remote);
        let remote_port: Arc<dyn RemoteStore> = remote.clone();
        let state = AppState::assemble(config, pool, remote_port, online);

        let session = AuthSession::new(Uuid::new_v4(), Uuid::new_v4());
        state.session.sign_in(session);

        Self {
            state,
            remote,
            session,
            store_id: Uuid::new_v4(),
        }
    }

    pub fn go_online(&self) {
        self.state.connectivity.became_reachable();
    }

    pub fn go_offline(&self) {
        self.state.connectivity.became_unreachable();
    }

    pub async fn pending(&self) -> u64 {
        self.state
            .sync_engine
            .pending_count()
            .await
            .expect("pending count")
    }

    pub async fn synced_rows_left(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sync_queue WHERE synced = 1")
            .fetch_one(self.state.pool.get_pool())
            .await
            .expect("count synced rows")
    }

    pub fn cash_sale(&self, product_id: Uuid, units: i64, unit_price: i64) -> CheckoutRequest {
        CheckoutRequest {
            store_id: self.store_id,
            customer_id: None,
            lines: vec![line(product_id, units, unit_price)],
            discount: Money::ZERO,
            payment_type: PaymentType::Cash,
            cash_amount: None,
            credit_amount: None,
        }
    }

    pub fn credit_sale(&self, customer_id: Uuid, amount: i64) -> CheckoutRequest {
        CheckoutRequest {
            store_id: self.store_id,
            customer_id: Some(customer_id),
            lines: vec![line(Uuid::new_v4(), 1, amount)],
            discount: Money::ZERO,
            payment_type: PaymentType::Credit,
            cash_amount: None,
            credit_amount: Some(money(amount)),
        }
    }
}

pub fn money(major: i64) -> Money {
    Money::from_major(major).expect("money")
}

pub fn units(count: i64) -> Quantity {
    Quantity::from_units(count).expect("quantity")
}

pub fn line(product_id: Uuid, count: i64, unit_price: i64) -> CheckoutLine {
    CheckoutLine {
        product_id,
        quantity: units(count),
        unit_price: money(unit_price),
    }
}

pub fn payment_by_customer(customer_id: Uuid, amount: i64) -> CreditPaymentRequest {
    CreditPaymentRequest {
        credit_id: None,
        customer_id: Some(customer_id),
        amount: money(amount),
        note: None,
    }
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
