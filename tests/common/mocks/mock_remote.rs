use async_trait::async_trait;
use chrono::Utc;
use cim_lib::application::ports::remote_store::{
    Filter, FilterOp, RemoteError, RemoteProcedure, RemoteStore, RemoteTable, Row, SelectQuery,
    from_row, to_row,
};
use cim_lib::domain::entities::{Credit, CreditTransaction, CreditTransactionType};
use cim_lib::domain::value_objects::Quantity;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub method: &'static str,
    pub target: String,
    pub ids: Vec<String>,
}

#[derive(Default)]
struct RemoteState {
    tables: HashMap<RemoteTable, Vec<Row>>,
    stock: HashMap<(Uuid, Uuid), i64>,
    calls: Vec<RemoteCall>,
    failing_ids: HashSet<String>,
    failing_tables: HashSet<RemoteTable>,
    failing_procedures: HashSet<&'static str>,
}

/// In-memory hosted backend. Procedures run under one lock, like a server transaction.
#[derive(Default)]
pub struct MockRemoteStore {
    state: Mutex<RemoteState>,
    latency: Option<Duration>,
}

impl MockRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Mutex::default(),
            latency: Some(latency),
        }
    }

    pub fn fail_on_id(&self, id: Uuid) {
        self.state.lock().unwrap().failing_ids.insert(id.to_string());
    }

    pub fn fail_table(&self, table: RemoteTable) {
        self.state.lock().unwrap().failing_tables.insert(table);
    }

    pub fn fail_procedure(&self, name: &'static str) {
        self.state.lock().unwrap().failing_procedures.insert(name);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.failing_ids.clear();
        state.failing_tables.clear();
        state.failing_procedures.clear();
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, method: &str, target: &str) -> Vec<RemoteCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method && call.target == target)
            .collect()
    }

    pub fn rows(&self, table: RemoteTable) -> Vec<Row> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn credit_for(&self, customer_id: Uuid) -> Option<Credit> {
        let credits: Vec<Credit> = self
            .rows(RemoteTable::Credits)
            .into_iter()
            .map(|row| from_row(row).unwrap())
            .filter(|credit: &Credit| credit.customer_id == customer_id)
            .collect();
        assert!(credits.len() <= 1, "customer has {} credit rows", credits.len());
        credits.into_iter().next()
    }

    pub fn transactions_for(&self, credit_id: Uuid) -> Vec<CreditTransaction> {
        self.rows(RemoteTable::CreditTransactions)
            .into_iter()
            .map(|row| from_row(row).unwrap())
            .filter(|tx: &CreditTransaction| tx.credit_id == credit_id)
            .collect()
    }

    pub fn set_stock(&self, product_id: Uuid, store_id: Uuid, quantity: Quantity) {
        self.state
            .lock()
            .unwrap()
            .stock
            .insert((product_id, store_id), quantity.milli_units());
    }

    pub fn stock(&self, product_id: Uuid, store_id: Uuid) -> i64 {
        self.state
            .lock()
            .unwrap()
            .stock
            .get(&(product_id, store_id))
            .copied()
            .unwrap_or(0)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn row_id(row: &Row) -> String {
    row.get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn server_error(message: &str) -> RemoteError {
    RemoteError::Status {
        status: 500,
        message: message.to_string(),
    }
}

fn matches(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| {
        let actual = row.get(&filter.column).cloned().unwrap_or(Value::Null);
        let text = |value: &Value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        match filter.op {
            FilterOp::Eq => text(&actual) == text(&filter.value),
            FilterOp::Neq => text(&actual) != text(&filter.value),
            FilterOp::Gt => text(&actual) > text(&filter.value),
            FilterOp::Gte => text(&actual) >= text(&filter.value),
            FilterOp::Lt => text(&actual) < text(&filter.value),
            FilterOp::Lte => text(&actual) <= text(&filter.value),
            FilterOp::IsNull => actual.is_null(),
        }
    })
}

impl RemoteState {
    fn check_write(&self, table: RemoteTable, rows: &[Row]) -> Result<(), RemoteError> {
        if self.failing_tables.contains(&table) {
            return Err(server_error(&format!("{} unavailable", table.as_str())));
        }
        if let Some(id) = rows
            .iter()
            .map(row_id)
            .find(|id| self.failing_ids.contains(id))
        {
            return Err(server_error(&format!("write of {id} failed")));
        }
        Ok(())
    }

    fn record(&mut self, method: &'static str, target: &str, ids: Vec<String>) {
        self.calls.push(RemoteCall {
            method,
            target: target.to_string(),
            ids,
        });
    }

    fn upsert_rows(&mut self, table: RemoteTable, rows: Vec<Row>) -> Vec<Row> {
        let stored = self.tables.entry(table).or_default();
        for row in &rows {
            let id = row_id(row);
            match stored.iter_mut().find(|existing| row_id(existing) == id) {
                Some(existing) => existing.extend(row.clone()),
                None => stored.push(row.clone()),
            }
        }
        rows
    }

    fn has_transaction(&self, transaction_id: Uuid) -> bool {
        self.tables
            .get(&RemoteTable::CreditTransactions)
            .is_some_and(|rows| rows.iter().any(|row| row_id(row) == transaction_id.to_string()))
    }

    fn credit_row(&mut self, filters: &[Filter]) -> Option<&mut Row> {
        self.tables
            .entry(RemoteTable::Credits)
            .or_default()
            .iter_mut()
            .find(|row| matches(row, filters))
    }

    fn run_procedure(&mut self, procedure: &RemoteProcedure) -> Result<Value, RemoteError> {
        let now = Utc::now();
        match procedure {
            RemoteProcedure::DecrementInventory {
                product_id,
                store_id,
                quantity,
            } => {
                let on_hand = self.stock.entry((*product_id, *store_id)).or_insert(0);
                *on_hand = (*on_hand - quantity.milli_units()).max(0);
                Ok(Value::Null)
            }
            RemoteProcedure::UpdateInventoryQuantity {
                product_id,
                store_id,
                quantity_delta,
            } => {
                let milli = match quantity_delta.strip_prefix('-') {
                    Some(magnitude) => -Quantity::parse(magnitude)
                        .map_err(RemoteError::Rejected)?
                        .milli_units(),
                    None => Quantity::parse(quantity_delta)
                        .map_err(RemoteError::Rejected)?
                        .milli_units(),
                };
                let on_hand = self.stock.entry((*product_id, *store_id)).or_insert(0);
                *on_hand = (*on_hand + milli).max(0);
                Ok(Value::Null)
            }
            RemoteProcedure::ApplyPaymentReceived {
                transaction_id,
                credit_id,
                amount,
                note,
                user_id,
                organization_id,
            } => {
                if self.has_transaction(*transaction_id) {
                    return Ok(Value::Null);
                }
                let row = self
                    .credit_row(&[Filter::id(*credit_id)])
                    .ok_or_else(|| RemoteError::Rejected(format!("credit {credit_id} not found")))?;
                let mut credit: Credit = from_row(row.clone()).map_err(|err| {
                    RemoteError::Decode(err.to_string())
                })?;
                credit
                    .receive_payment(*amount, now)
                    .map_err(|err| RemoteError::Rejected(err.to_string()))?;
                *row = to_row(&credit).map_err(|err| RemoteError::Decode(err.to_string()))?;

                let transaction = CreditTransaction {
                    id: *transaction_id,
                    credit_id: *credit_id,
                    transaction_type: CreditTransactionType::PaymentReceived,
                    amount: *amount,
                    note: note.clone(),
                    user_id: *user_id,
                    organization_id: *organization_id,
                    created_at: now,
                };
                let row =
                    to_row(&transaction).map_err(|err| RemoteError::Decode(err.to_string()))?;
                self.tables
                    .entry(RemoteTable::CreditTransactions)
                    .or_default()
                    .push(row);
                Ok(Value::Null)
            }
            RemoteProcedure::ApplyCreditGiven {
                transaction_id,
                customer_id,
                amount,
                user_id,
                organization_id,
            } => {
                let already_applied = self.has_transaction(*transaction_id);
                let filters = [
                    Filter::eq("customerId", customer_id.to_string()),
                    Filter::eq("organizationId", organization_id.to_string()),
                ];
                if already_applied {
                    let credit_id = self.credit_row(&filters).map(|row| row_id(row));
                    return Ok(json!({ "creditId": credit_id }));
                }

                let credit = match self.credit_row(&filters) {
                    Some(row) => {
                        let mut credit: Credit = from_row(row.clone())
                            .map_err(|err| RemoteError::Decode(err.to_string()))?;
                        credit
                            .give_credit(*amount, now)
                            .map_err(|err| RemoteError::Rejected(err.to_string()))?;
                        *row = to_row(&credit)
                            .map_err(|err| RemoteError::Decode(err.to_string()))?;
                        credit
                    }
                    None => {
                        let credit = Credit::open(
                            Uuid::new_v4(),
                            *customer_id,
                            *organization_id,
                            *amount,
                            now,
                        )
                        .map_err(|err| RemoteError::Rejected(err.to_string()))?;
                        let row = to_row(&credit)
                            .map_err(|err| RemoteError::Decode(err.to_string()))?;
                        self.tables.entry(RemoteTable::Credits).or_default().push(row);
                        credit
                    }
                };

                let transaction = CreditTransaction {
                    id: *transaction_id,
                    credit_id: credit.id,
                    transaction_type: CreditTransactionType::CreditGiven,
                    amount: *amount,
                    note: None,
                    user_id: *user_id,
                    organization_id: *organization_id,
                    created_at: now,
                };
                let row =
                    to_row(&transaction).map_err(|err| RemoteError::Decode(err.to_string()))?;
                self.tables
                    .entry(RemoteTable::CreditTransactions)
                    .or_default()
                    .push(row);
                Ok(json!({ "creditId": credit.id }))
            }
        }
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    async fn insert(&self, table: RemoteTable, rows: Vec<Row>) -> Result<Vec<Row>, RemoteError> {
        self.simulate_latency().await;
        let mut state = self.state.lock().unwrap();
        state.record("insert", table.as_str(), rows.iter().map(row_id).collect());
        state.check_write(table, &rows)?;
        let existing: HashSet<String> = state
            .tables
            .get(&table)
            .map(|stored| stored.iter().map(row_id).collect())
            .unwrap_or_default();
        if let Some(duplicate) = rows.iter().map(row_id).find(|id| existing.contains(id)) {
            return Err(RemoteError::Status {
                status: 409,
                message: format!("duplicate key {duplicate}"),
            });
        }
        state.tables.entry(table).or_default().extend(rows.clone());
        Ok(rows)
    }

    async fn upsert(
        &self,
        table: RemoteTable,
        rows: Vec<Row>,
        on_conflict: &str,
    ) -> Result<Vec<Row>, RemoteError> {
        assert_eq!(on_conflict, "id");
        self.simulate_latency().await;
        let mut state = self.state.lock().unwrap();
        state.record("upsert", table.as_str(), rows.iter().map(row_id).collect());
        state.check_write(table, &rows)?;
        Ok(state.upsert_rows(table, rows))
    }

    async fn update(
        &self,
        table: RemoteTable,
        matches_filters: Vec<Filter>,
        patch: Row,
    ) -> Result<Vec<Row>, RemoteError> {
        self.simulate_latency().await;
        let mut state = self.state.lock().unwrap();
        state.record("update", table.as_str(), Vec::new());
        state.check_write(table, &[])?;
        let mut updated = Vec::new();
        for row in state.tables.entry(table).or_default().iter_mut() {
            if matches(row, &matches_filters) {
                row.extend(patch.clone());
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn select(&self, query: SelectQuery) -> Result<Vec<Row>, RemoteError> {
        self.simulate_latency().await;
        let mut state = self.state.lock().unwrap();
        state.record("select", query.table.as_str(), Vec::new());
        if state.failing_tables.contains(&query.table) {
            return Err(RemoteError::Timeout);
        }
        let mut rows: Vec<Row> = state
            .tables
            .get(&query.table)
            .map(|stored| {
                stored
                    .iter()
                    .filter(|row| matches(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(limit) = query.limit {
            rows.truncate(limit as usize);
        }
        Ok(rows)
    }

    async fn delete(
        &self,
        table: RemoteTable,
        matches_filters: Vec<Filter>,
    ) -> Result<Vec<Row>, RemoteError> {
        self.simulate_latency().await;
        let mut state = self.state.lock().unwrap();
        state.record("delete", table.as_str(), Vec::new());
        let stored = state.tables.entry(table).or_default();
        let (removed, kept): (Vec<Row>, Vec<Row>) = stored
            .drain(..)
            .partition(|row| matches(row, &matches_filters));
        *stored = kept;
        Ok(removed)
    }

    async fn rpc(&self, procedure: RemoteProcedure) -> Result<Value, RemoteError> {
        self.simulate_latency().await;
        let mut state = self.state.lock().unwrap();
        state.record("rpc", procedure.name(), Vec::new());
        if state.failing_procedures.contains(procedure.name()) {
            return Err(server_error(&format!("{} failed", procedure.name())));
        }
        state.run_procedure(&procedure)
    }
}
