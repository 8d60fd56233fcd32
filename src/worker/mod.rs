use crate::api::{fetch_bucket_tables, ApiError, StorageApi, StorageApiClient};
use crate::config::Connection;
use crate::types::{Bucket, Table};
use anyhow::{Context, Result};
use std::sync::mpsc;
use std::thread;
use tokio::runtime::{Builder, Runtime};

/// Correlates a response with the request that caused it
pub type RequestId = u64;

/// Why a single table's detail was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailPurpose {
    AddToDiagram,
    Inspect,
    Refresh,
}

/// Messages sent to the worker thread
#[derive(Debug)]
pub enum WorkerMessage {
    Connect {
        request: RequestId,
        connection: Connection,
    },
    LoadTables {
        request: RequestId,
        bucket_id: String,
    },
    LoadTableDetail {
        request: RequestId,
        table_id: String,
        purpose: DetailPurpose,
    },
    Shutdown,
}

/// Responses sent back from the worker thread
#[derive(Debug)]
pub enum WorkerResponse {
    Connected {
        request: RequestId,
        connection: Connection,
        buckets: Vec<Bucket>,
    },
    ConnectionFailed {
        request: RequestId,
        message: String,
    },
    TablesLoaded {
        request: RequestId,
        bucket_id: String,
        tables: Vec<Table>,
        incomplete: Vec<String>,
    },
    TableDetailLoaded {
        request: RequestId,
        purpose: DetailPurpose,
        table: Table,
    },
    Error {
        request: RequestId,
        message: String,
    },
}

impl WorkerResponse {
    pub fn request(&self) -> RequestId {
        match self {
            WorkerResponse::Connected { request, .. }
            | WorkerResponse::ConnectionFailed { request, .. }
            | WorkerResponse::TablesLoaded { request, .. }
            | WorkerResponse::TableDetailLoaded { request, .. }
            | WorkerResponse::Error { request, .. } => *request,
        }
    }
}

/// Worker thread that talks to the storage API
pub struct Worker {
    sender: mpsc::Sender<WorkerMessage>,
    receiver: mpsc::Receiver<WorkerResponse>,
    handle: thread::JoinHandle<()>,
}

impl Worker {
    /// Spawn the worker with its own single-threaded async runtime
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start the network runtime")?;
        let (tx, rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let mut client = StorageApiClient::new();
            loop {
                let response = match rx.recv() {
                    Ok(WorkerMessage::Shutdown) | Err(_) => break,
                    Ok(message) => handle_message(&runtime, &mut client, message),
                };
                if response_tx.send(response).is_err() {
                    // UI side is gone
                    break;
                }
            }
            tracing::debug!("Worker stopped");
        });

        Ok(Self {
            sender: tx,
            receiver: response_rx,
            handle,
        })
    }

    /// Send a message to the worker
    pub fn send(&self, message: WorkerMessage) -> Result<()> {
        self.sender.send(message)?;
        Ok(())
    }

    /// Try to receive a response (non-blocking)
    pub fn try_recv(&self) -> Result<Option<WorkerResponse>> {
        match self.receiver.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => {
                Err(anyhow::anyhow!("Worker thread disconnected"))
            }
        }
    }

    /// Receive a response (blocking)
    #[cfg(test)]
    pub fn recv(&self) -> Result<WorkerResponse> {
        self.receiver
            .recv_timeout(std::time::Duration::from_secs(10))
            .map_err(|e| anyhow::anyhow!("No worker response: {}", e))
    }

    /// Shutdown the worker thread
    pub fn shutdown(self) -> Result<()> {
        self.sender.send(WorkerMessage::Shutdown)?;
        self.handle
            .join()
            .map_err(|_| anyhow::anyhow!("Worker thread panicked"))?;
        Ok(())
    }
}

/// Run one request to completion. Every message yields exactly one response.
fn handle_message(
    runtime: &Runtime,
    client: &mut StorageApiClient,
    message: WorkerMessage,
) -> WorkerResponse {
    match message {
        WorkerMessage::Connect {
            request,
            connection,
        } => {
            client.configure(connection.clone());
            let outcome = runtime.block_on(async {
                if !client.test_connection().await? {
                    return Ok(None);
                }
                let buckets = client.list_buckets().await?;
                Ok::<_, ApiError>(Some(buckets))
            });
            match outcome {
                Ok(Some(buckets)) => WorkerResponse::Connected {
                    request,
                    connection,
                    buckets,
                },
                Ok(None) => WorkerResponse::ConnectionFailed {
                    request,
                    message: "Connection failed. Check your API token and instance URL."
                        .to_string(),
                },
                Err(e) => {
                    tracing::error!("Connect failed: {}", e);
                    WorkerResponse::ConnectionFailed {
                        request,
                        message: e.user_message(),
                    }
                }
            }
        }
        WorkerMessage::LoadTables { request, bucket_id } => {
            match runtime.block_on(fetch_bucket_tables(&*client, &bucket_id)) {
                Ok(loaded) => WorkerResponse::TablesLoaded {
                    request,
                    bucket_id,
                    tables: loaded.tables,
                    incomplete: loaded.incomplete,
                },
                Err(e) => {
                    tracing::error!(%bucket_id, "Failed to load tables: {}", e);
                    WorkerResponse::Error {
                        request,
                        message: format!("Failed to load tables: {}", e.user_message()),
                    }
                }
            }
        }
        WorkerMessage::LoadTableDetail {
            request,
            table_id,
            purpose,
        } => match runtime.block_on(client.get_table_detail(&table_id)) {
            Ok(table) => WorkerResponse::TableDetailLoaded {
                request,
                purpose,
                table,
            },
            Err(e) => {
                tracing::error!(%table_id, "Failed to load table detail: {}", e);
                WorkerResponse::Error {
                    request,
                    message: format!("Failed to load table {}: {}", table_id, e.user_message()),
                }
            }
        },
        // Handled by the loop
        WorkerMessage::Shutdown => WorkerResponse::Error {
            request: 0,
            message: "Worker is shutting down".to_string(),
        },
    }
}
