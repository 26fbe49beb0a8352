use super::schema::{camel_to_snake, row_from_wire, row_to_wire, select_to_wire, value_from_wire};
use crate::application::ports::remote_store::{
    Filter, FilterOp, Order, RemoteError, RemoteProcedure, RemoteStore, RemoteTable, Row,
    SelectQuery,
};
use crate::shared::config::RemoteConfig;
use crate::shared::error::AppError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use std::time::Duration;

const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=representation";
/// PostgREST code for an exception raised inside a procedure.
const RAISED_EXCEPTION: &str = "P0001";

/// Remote store client for a PostgREST endpoint (`<url>/rest/v1`).
pub struct PostgrestRemoteStore {
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    client: Client,
}

impl PostgrestRemoteStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| RemoteError::Network(format!("failed to build http client: {err}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            access_token: None,
            client,
        })
    }

    pub fn from_config(config: &RemoteConfig) -> Result<Self, AppError> {
        let url = config.url.as_deref().ok_or_else(|| {
            AppError::ConfigurationError("CIM_REMOTE_URL is not set".to_string())
        })?;
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            AppError::ConfigurationError("CIM_REMOTE_API_KEY is not set".to_string())
        })?;
        let store = Self::new(
            url,
            api_key,
            Duration::from_secs(config.request_timeout),
        )?;
        Ok(match &config.access_token {
            Some(token) => store.with_access_token(token),
            None => store,
        })
    }

    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    fn table_url(&self, table: RemoteTable) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.as_str())
    }

    fn rpc_url(&self, name: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, name)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    fn insert_request(&self, table: RemoteTable, rows: Vec<Row>) -> RequestBuilder {
        self.authorize(self.client.post(self.table_url(table)))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&wire_rows(rows))
    }

    fn upsert_request(&self, table: RemoteTable, rows: Vec<Row>, on_conflict: &str) -> RequestBuilder {
        self.authorize(self.client.post(self.table_url(table)))
            .query(&[("on_conflict", camel_to_snake(on_conflict))])
            .header("Prefer", MERGE_DUPLICATES)
            .json(&wire_rows(rows))
    }

    fn update_request(&self, table: RemoteTable, matches: &[Filter], patch: Row) -> RequestBuilder {
        self.authorize(self.client.patch(self.table_url(table)))
            .query(&filter_params(matches))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&Value::Object(row_to_wire(patch)))
    }

    fn select_request(&self, query: &SelectQuery) -> RequestBuilder {
        let mut params = vec![("select".to_string(), select_to_wire(&query.columns))];
        params.extend(filter_params(&query.filters));
        if !query.order.is_empty() {
            params.push(("order".to_string(), order_param(&query.order)));
        }
        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        self.authorize(self.client.get(self.table_url(query.table)))
            .query(&params)
    }

    fn delete_request(&self, table: RemoteTable, matches: &[Filter]) -> RequestBuilder {
        self.authorize(self.client.delete(self.table_url(table)))
            .query(&filter_params(matches))
            .header("Prefer", RETURN_REPRESENTATION)
    }

    fn rpc_request(&self, procedure: &RemoteProcedure) -> RequestBuilder {
        self.authorize(self.client.post(self.rpc_url(procedure.name())))
            .json(&procedure.params())
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Value, RemoteError> {
        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let err = map_status_error(status, &text);
            tracing::debug!(
                target: "remote::postgrest",
                request = what,
                status = status.as_u16(),
                error = %err,
                "remote request failed"
            );
            return Err(err);
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|err| RemoteError::Decode(format!("{what}: {err}")))
    }

    async fn send_rows(&self, builder: RequestBuilder, what: &str) -> Result<Vec<Row>, RemoteError> {
        rows_from_wire(self.send(builder, what).await?)
    }
}

#[async_trait]
impl RemoteStore for PostgrestRemoteStore {
    async fn insert(&self, table: RemoteTable, rows: Vec<Row>) -> Result<Vec<Row>, RemoteError> {
        self.send_rows(self.insert_request(table, rows), table.as_str())
            .await
    }

    async fn upsert(
        &self,
        table: RemoteTable,
        rows: Vec<Row>,
        on_conflict: &str,
    ) -> Result<Vec<Row>, RemoteError> {
        self.send_rows(self.upsert_request(table, rows, on_conflict), table.as_str())
            .await
    }

    async fn update(
        &self,
        table: RemoteTable,
        matches: Vec<Filter>,
        patch: Row,
    ) -> Result<Vec<Row>, RemoteError> {
        if matches.is_empty() {
            return Err(RemoteError::Rejected(format!(
                "refusing unfiltered update of {}",
                table.as_str()
            )));
        }
        self.send_rows(self.update_request(table, &matches, patch), table.as_str())
            .await
    }

    async fn select(&self, query: SelectQuery) -> Result<Vec<Row>, RemoteError> {
        self.send_rows(self.select_request(&query), query.table.as_str())
            .await
    }

    async fn delete(
        &self,
        table: RemoteTable,
        matches: Vec<Filter>,
    ) -> Result<Vec<Row>, RemoteError> {
        if matches.is_empty() {
            return Err(RemoteError::Rejected(format!(
                "refusing unfiltered delete of {}",
                table.as_str()
            )));
        }
        self.send_rows(self.delete_request(table, &matches), table.as_str())
            .await
    }

    async fn rpc(&self, procedure: RemoteProcedure) -> Result<Value, RemoteError> {
        let value = self
            .send(self.rpc_request(&procedure), procedure.name())
            .await?;
        Ok(value_from_wire(value))
    }
}

fn wire_rows(rows: Vec<Row>) -> Value {
    Value::Array(
        rows.into_iter()
            .map(|row| Value::Object(row_to_wire(row)))
            .collect(),
    )
}

fn rows_from_wire(value: Value) -> Result<Vec<Row>, RemoteError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(row) => Ok(vec![row_from_wire(row)]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(row) => Ok(row_from_wire(row)),
                other => Err(RemoteError::Decode(format!("expected a row, got {other}"))),
            })
            .collect(),
        other => Err(RemoteError::Decode(format!("expected rows, got {other}"))),
    }
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| {
            let operand = match filter.op {
                FilterOp::Eq => format!("eq.{}", filter_operand(&filter.value)),
                FilterOp::Neq => format!("neq.{}", filter_operand(&filter.value)),
                FilterOp::Gt => format!("gt.{}", filter_operand(&filter.value)),
                FilterOp::Gte => format!("gte.{}", filter_operand(&filter.value)),
                FilterOp::Lt => format!("lt.{}", filter_operand(&filter.value)),
                FilterOp::Lte => format!("lte.{}", filter_operand(&filter.value)),
                FilterOp::IsNull => "is.null".to_string(),
            };
            (camel_to_snake(&filter.column), operand)
        })
        .collect()
}

fn filter_operand(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn order_param(order: &[Order]) -> String {
    order
        .iter()
        .map(|order| {
            let direction = if order.ascending { "asc" } else { "desc" };
            format!("{}.{direction}", camel_to_snake(&order.column))
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn map_transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Network(err.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &str) -> RemoteError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|value| value.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let message = field("message").unwrap_or_else(|| {
        if body.is_empty() {
            status.canonical_reason().unwrap_or("unknown error").to_string()
        } else {
            body.to_string()
        }
    });

    if field("code").as_deref() == Some(RAISED_EXCEPTION) {
        return RemoteError::Rejected(message);
    }
    RemoteError::Status {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn store() -> PostgrestRemoteStore {
        PostgrestRemoteStore::new("https://pos.example.test/", "anon-key", Duration::from_secs(5))
            .unwrap()
            .with_access_token("user-jwt")
    }

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn body_json(request: &reqwest::Request) -> Value {
        let bytes = request.body().and_then(|body| body.as_bytes()).unwrap();
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn upsert_maps_keys_and_sets_conflict_target() {
        let request = store()
            .upsert_request(
                RemoteTable::SaleItems,
                vec![row(json!({ "id": "i-1", "saleId": "s-1", "unitPrice": "4.50" }))],
                "id",
            )
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://pos.example.test/rest/v1/sale_items?on_conflict=id"
        );
        assert_eq!(request.headers()["apikey"], "anon-key");
        assert_eq!(request.headers()["authorization"], "Bearer user-jwt");
        assert_eq!(request.headers()["prefer"], MERGE_DUPLICATES);
        assert_eq!(
            body_json(&request),
            json!([{ "id": "i-1", "sale_id": "s-1", "unit_price": "4.50" }])
        );
    }

    #[test]
    fn select_encodes_filters_order_and_nested_columns() {
        let query = SelectQuery::from(RemoteTable::Sales)
            .columns("*, saleItems(*)")
            .filter(Filter::eq("organizationId", "org-1"))
            .filter(Filter::gte("createdAt", "2025-03-01T00:00:00"))
            .filter(Filter::is_null("customerId"))
            .order_by("createdAt", false)
            .limit(20);
        let request = store().select_request(&query).build().unwrap();
        let pairs: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "*, sale_items(*)".to_string()),
                ("organization_id".to_string(), "eq.org-1".to_string()),
                ("created_at".to_string(), "gte.2025-03-01T00:00:00".to_string()),
                ("customer_id".to_string(), "is.null".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
        assert_eq!(request.method(), reqwest::Method::GET);
    }

    #[test]
    fn rpc_posts_procedure_params_unchanged() {
        let transaction_id = Uuid::new_v4();
        let credit_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let organization_id = Uuid::new_v4();
        let request = store()
            .rpc_request(&RemoteProcedure::ApplyPaymentReceived {
                transaction_id,
                credit_id,
                amount: crate::domain::value_objects::Money::from_major(200).unwrap(),
                note: None,
                user_id,
                organization_id,
            })
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://pos.example.test/rest/v1/rpc/apply_payment_received"
        );
        assert_eq!(
            body_json(&request),
            json!({
                "p_transaction_id": transaction_id,
                "p_credit_id": credit_id,
                "p_amount": "200.00",
                "p_note": null,
                "p_user_id": user_id,
                "p_organization_id": organization_id,
            })
        );
    }

    #[test]
    fn bearer_falls_back_to_api_key() {
        let store =
            PostgrestRemoteStore::new("https://pos.example.test", "anon-key", Duration::from_secs(5))
                .unwrap();
        let request = store
            .delete_request(RemoteTable::Products, &[Filter::id(Uuid::nil())])
            .build()
            .unwrap();
        assert_eq!(request.headers()["authorization"], "Bearer anon-key");
        assert_eq!(request.method(), reqwest::Method::DELETE);
    }

    #[test]
    fn error_bodies_are_classified() {
        let raised = map_status_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":"P0001","message":"payment exceeds outstanding balance"}"#,
        );
        assert_eq!(
            raised,
            RemoteError::Rejected("payment exceeds outstanding balance".to_string())
        );

        let conflict = map_status_error(
            StatusCode::CONFLICT,
            r#"{"code":"23505","message":"duplicate key value"}"#,
        );
        assert_eq!(
            conflict,
            RemoteError::Status {
                status: 409,
                message: "duplicate key value".to_string()
            }
        );

        let gateway = map_status_error(StatusCode::BAD_GATEWAY, "");
        assert!(gateway.is_transient());
    }

    #[test]
    fn responses_decode_into_camel_case_rows() {
        let rows = rows_from_wire(json!([{ "outstanding_amount": "600.00" }])).unwrap();
        assert_eq!(rows[0]["outstandingAmount"], "600.00");
        assert!(rows_from_wire(Value::Null).unwrap().is_empty());
        assert!(rows_from_wire(json!(3)).is_err());
    }
}
