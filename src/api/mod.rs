mod batch;
mod error;
mod normalize;

use crate::config::Connection;
use crate::types::{Bucket, Table};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

pub use batch::fetch_bucket_tables;
pub use error::ApiError;

const TOKEN_HEADER: &str = "X-StorageApi-Token";
const TABLE_INCLUDES: &str = "include=columns,metadata,columnMetadata";

/// The three storage reads the designer depends on
#[async_trait]
pub trait StorageApi {
    async fn list_buckets(&self) -> Result<Vec<Bucket>, ApiError>;
    async fn list_tables(&self, bucket_id: &str) -> Result<Vec<Table>, ApiError>;
    async fn get_table_detail(&self, table_id: &str) -> Result<Table, ApiError>;
}

/// HTTP client for the storage API
#[derive(Debug, Default)]
pub struct StorageApiClient {
    http: Client,
    connection: Option<Connection>,
}

impl StorageApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store connection parameters. No request is made.
    pub fn configure(&mut self, connection: Connection) {
        tracing::info!(url = %connection.instance_url, "Storage API configured");
        self.connection = Some(connection);
    }

    fn connection(&self) -> Result<&Connection, ApiError> {
        self.connection.as_ref().ok_or(ApiError::NotConfigured)
    }

    /// Lightweight authenticated request.
    ///
    /// Rejected credentials and unreachable hosts yield `Ok(false)`; only a
    /// missing configuration is an error.
    pub async fn test_connection(&self) -> Result<bool, ApiError> {
        let connection = self.connection()?;
        let url = format!("{}/v2/storage", connection.base_url());
        let response = self
            .http
            .get(&url)
            .header(TOKEN_HEADER, &connection.api_token)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => Ok(true),
            Ok(resp) => {
                tracing::warn!(status = %resp.status(), "Connection test rejected");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("Connection test failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        let connection = self.connection()?;
        let url = format!("{}{}", connection.base_url(), path);
        tracing::debug!(%url, "GET");

        let response = self
            .http
            .get(&url)
            .header(TOKEN_HEADER, &connection.api_token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| ApiError::transport(path, e))?
            .error_for_status()
            .map_err(|e| ApiError::transport(path, e))?;

        let value: Value = response
            .json()
            .await
            .map_err(|e| ApiError::transport(path, e))?;

        if value.is_null() {
            return Err(ApiError::EmptyResponse {
                path: path.to_string(),
            });
        }
        Ok(value)
    }
}

fn require_id(id: &str, what: &'static str) -> Result<(), ApiError> {
    if id.trim().is_empty() {
        Err(ApiError::MissingId(what))
    } else {
        Ok(())
    }
}

fn decode<T>(path: &str, result: Result<T, serde_json::Error>) -> Result<T, ApiError> {
    result.map_err(|source| ApiError::Decode {
        path: path.to_string(),
        source,
    })
}

#[async_trait]
impl StorageApi for StorageApiClient {
    async fn list_buckets(&self) -> Result<Vec<Bucket>, ApiError> {
        let path = "/v2/storage/buckets";
        let value = self.get_json(path).await?;
        let buckets = decode(path, normalize::buckets_from_value(value))?;
        tracing::info!(count = buckets.len(), "Buckets loaded");
        Ok(buckets)
    }

    async fn list_tables(&self, bucket_id: &str) -> Result<Vec<Table>, ApiError> {
        self.connection()?;
        require_id(bucket_id, "Bucket")?;
        let path = format!("/v2/storage/buckets/{}/tables?{}", bucket_id, TABLE_INCLUDES);
        let value = self.get_json(&path).await?;
        let tables = decode(&path, normalize::tables_from_value(value))?;
        tracing::info!(bucket_id, count = tables.len(), "Tables loaded");
        Ok(tables)
    }

    async fn get_table_detail(&self, table_id: &str) -> Result<Table, ApiError> {
        self.connection()?;
        require_id(table_id, "Table")?;
        let path = format!("/v2/storage/tables/{}?{}", table_id, TABLE_INCLUDES);
        let value = self.get_json(&path).await?;
        decode(&path, normalize::table_from_value(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn configured(server: &MockServer) -> StorageApiClient {
        let mut client = StorageApiClient::new();
        client.configure(Connection::new("token-123", server.uri()));
        client
    }

    #[tokio::test]
    async fn operations_require_configuration() {
        let client = StorageApiClient::new();
        assert!(matches!(
            client.test_connection().await,
            Err(ApiError::NotConfigured)
        ));
        assert!(matches!(
            client.list_buckets().await,
            Err(ApiError::NotConfigured)
        ));
        assert!(matches!(
            client.list_tables("in.c-main").await,
            Err(ApiError::NotConfigured)
        ));
        assert!(matches!(
            client.get_table_detail("in.c-main.users").await,
            Err(ApiError::NotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_connection_reports_rejected_token_as_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/storage"))
            .and(header("X-StorageApi-Token", "token-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = configured(&server).await;
        assert!(client.test_connection().await.unwrap());

        let mut bad = StorageApiClient::new();
        bad.configure(Connection::new("wrong", server.uri()));
        assert!(!bad.test_connection().await.unwrap());
    }

    #[tokio::test]
    async fn test_connection_reports_unreachable_host_as_false() {
        let mut client = StorageApiClient::new();
        client.configure(Connection::new("token", "http://127.0.0.1:9"));
        assert!(!client.test_connection().await.unwrap());
    }

    #[tokio::test]
    async fn list_tables_normalizes_columns() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/storage/buckets/in.c-main/tables"))
            .and(query_param("include", "columns,metadata,columnMetadata"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "id": "in.c-main.users",
                    "name": "users",
                    "columns": [
                        { "name": "id", "type": "INTEGER", "nullable": false, "length": "10" },
                        { "name": "nickname", "type": "VARCHAR" }
                    ]
                }
            ])))
            .mount(&server)
            .await;

        let client = configured(&server).await;
        let tables = client.list_tables("in.c-main").await.unwrap();
        assert_eq!(tables.len(), 1);
        let nickname = &tables[0].columns[1];
        assert!(nickname.nullable);
        assert_eq!(nickname.length, None);
    }

    #[tokio::test]
    async fn table_detail_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/storage/tables/in.c-main.gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/storage/buckets"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = configured(&server).await;
        let err = client.get_table_detail("in.c-main.gone").await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status, .. } if status == 404));

        let err = client.list_buckets().await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn empty_ids_are_rejected_before_io() {
        let server = MockServer::start().await;
        let client = configured(&server).await;
        assert!(matches!(
            client.list_tables("").await,
            Err(ApiError::MissingId("Bucket"))
        ));
        assert!(matches!(
            client.get_table_detail(" ").await,
            Err(ApiError::MissingId("Table"))
        ));
    }
}
