use super::{ApiError, StorageApi};
use crate::types::Table;
use futures::future::join_all;

/// Tables of one bucket with their full detail
#[derive(Debug, Clone, PartialEq)]
pub struct BucketTables {
    pub tables: Vec<Table>,
    /// Ids whose detail fetch failed; those tables are kept without columns
    pub incomplete: Vec<String>,
}

/// List a bucket and fetch every table's detail concurrently.
///
/// A failed listing is an error. A failed detail fetch only degrades that
/// one table.
pub async fn fetch_bucket_tables<A>(api: &A, bucket_id: &str) -> Result<BucketTables, ApiError>
where
    A: StorageApi + ?Sized,
{
    let listed = api.list_tables(bucket_id).await?;
    let details = join_all(listed.iter().map(|t| api.get_table_detail(&t.id))).await;

    let mut tables = Vec::with_capacity(listed.len());
    let mut incomplete = Vec::new();
    for (summary, detail) in listed.into_iter().zip(details) {
        match detail {
            Ok(table) => tables.push(table),
            Err(e) => {
                tracing::warn!(table_id = %summary.id, "Table detail unavailable: {}", e);
                incomplete.push(summary.id.clone());
                tables.push(summary.degraded());
            }
        }
    }

    Ok(BucketTables { tables, incomplete })
}
