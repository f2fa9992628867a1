//! PostgREST-клиент поверх reqwest.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::models::RowId;
use crate::store::{ChangeEvent, ChangeKind, Filter, RemoteStore, Subscription, SUBSCRIPTION_BUFFER};

const RETURN_REPRESENTATION: &str = "return=representation";
const COUNT_EXACT: &str = "count=exact";

/// Клиент табличного REST API (PostgREST).
#[derive(Clone)]
pub struct RestStore {
    /// Базовый URL, например `https://project.example.co/rest/v1`.
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
    /// Период опроса для подписок: у REST нет push-канала.
    poll_interval: Duration,
}

impl RestStore {
    /// Создает и конфигурирует клиент на основе настроек приложения.
    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self::new(&config.url, &config.api_key, http_client, config.poll_interval()))
    }

    pub fn new(
        base_url: &str,
        api_key: &str,
        http_client: reqwest::Client,
        poll_interval: Duration,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            http_client,
            poll_interval,
        }
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http_client
            .request(method, format!("{}/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Пропускает успешный ответ, остальное превращает в `StoreError::Status`.
    async fn check(response: Response) -> StoreResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        // PostgREST отдаёт {"message": ..., "code": ...}
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(body);

        Err(StoreError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn rows(response: Response) -> StoreResult<Vec<Value>> {
        let response = Self::check(response).await?;
        Ok(response.json::<Vec<Value>>().await?)
    }

    /// Запрос к одной строке по `id` с возвратом её представления.
    async fn single_row(
        &self,
        method: Method,
        table: &str,
        id: &RowId,
        body: Option<&Value>,
    ) -> StoreResult<Option<Value>> {
        let mut request = self
            .request(method, table)
            .query(&Filter::by_id(id).to_query_pairs())
            .header("Prefer", RETURN_REPRESENTATION);
        if let Some(body) = body {
            request = request.json(body);
        }

        let rows = Self::rows(request.send().await?).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn select(&self, table: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let response = self
            .request(Method::GET, table)
            .query(&[("select", "*")])
            .query(&filter.to_query_pairs())
            .send()
            .await?;
        Self::rows(response).await
    }

    async fn count(&self, table: &str, filter: &Filter) -> StoreResult<u64> {
        let response = self
            .request(Method::HEAD, table)
            .query(&filter.to_query_pairs())
            .header("Prefer", COUNT_EXACT)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let range = response
            .headers()
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| StoreError::InvalidRow("count response without Content-Range".to_string()))?;
        parse_content_range_total(range)
            .ok_or_else(|| StoreError::InvalidRow(format!("unexpected Content-Range: {}", range)))
    }

    async fn insert(&self, table: &str, row: Value) -> StoreResult<Value> {
        let response = self
            .request(Method::POST, table)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&row)
            .send()
            .await?;

        Self::rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::InvalidRow(format!("insert into {} returned no rows", table)))
    }

    async fn update(&self, table: &str, id: &RowId, patch: Value) -> StoreResult<Value> {
        self.single_row(Method::PATCH, table, id, Some(&patch))
            .await?
            .ok_or_else(|| StoreError::NotFound {
                table: table.to_string(),
                id: id.clone(),
            })
    }

    async fn delete(&self, table: &str, id: &RowId) -> StoreResult<()> {
        match self.single_row(Method::DELETE, table, id, None).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                table: table.to_string(),
                id: id.clone(),
            }),
        }
    }

    async fn subscribe(&self, table: &str, filter: Filter) -> StoreResult<Subscription> {
        // Снимок до возврата хэндла: изменения после subscribe не теряются
        let mut known = index_rows(self.select(table, &filter).await?);
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let store = self.clone();
        let watched = table.to_string();

        info!("Polling {} every {:?} for changes", watched, store.poll_interval);

        let worker = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(store.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // первый тик срабатывает сразу
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match store.select(&watched, &filter).await {
                    Ok(rows) => {
                        let current = index_rows(rows);
                        for change in diff_snapshots(&watched, &known, &current) {
                            if tx.send(change).await.is_err() {
                                return;
                            }
                        }
                        known = current;
                    }
                    Err(e) => warn!("Polling {} failed: {}", watched, e),
                }
            }
        });

        Ok(Subscription::new(table, rx, worker))
    }
}

/// `Content-Range: 0-24/3573` или `*/0` -> общее число строк.
fn parse_content_range_total(range: &str) -> Option<u64> {
    range.rsplit_once('/')?.1.trim().parse().ok()
}

fn index_rows(rows: Vec<Value>) -> BTreeMap<RowId, Value> {
    rows.into_iter()
        .filter_map(|row| RowId::from_row(&row).map(|id| (id, row)))
        .collect()
}

/// Разница двух снимков таблицы в виде событий изменений.
fn diff_snapshots(
    table: &str,
    previous: &BTreeMap<RowId, Value>,
    current: &BTreeMap<RowId, Value>,
) -> Vec<ChangeEvent> {
    let mut changes = Vec::new();

    for (id, row) in current {
        match previous.get(id) {
            None => changes.push(ChangeEvent {
                table: table.to_string(),
                kind: ChangeKind::Insert,
                record: Some(row.clone()),
                old: None,
            }),
            Some(old) if old != row => changes.push(ChangeEvent {
                table: table.to_string(),
                kind: ChangeKind::Update,
                record: Some(row.clone()),
                old: Some(old.clone()),
            }),
            Some(_) => {}
        }
    }

    for (id, old) in previous {
        if !current.contains_key(id) {
            changes.push(ChangeEvent {
                table: table.to_string(),
                kind: ChangeKind::Delete,
                record: None,
                old: Some(old.clone()),
            });
        }
    }

    if !changes.is_empty() {
        debug!("{} changes detected in {}", changes.len(), table);
    }
    changes
}
