//! SQL dataset loader. The only supported `database_kind` is `"snowflake"`,
//! authenticated against a [`kiln_core::catalog::CredentialsEntry`] looked
//! up by `credentials_key` and queried through Snowflake's SQL API over
//! plain HTTPS rather than a native client driver (§3, §4.3).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{ArrayRef, StringArray};
use arrow_schema::{DataType, Field, Schema};
use kiln_core::catalog::{CatalogEntry, Credentials, CredentialsEntry, SqlEntry};
use kiln_core::error::LoadError;
use kiln_core::TabularValue;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct SnowflakeResponse {
    #[serde(rename = "resultSetMetaData")]
    metadata: SnowflakeMetadata,
    data: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct SnowflakeMetadata {
    #[serde(rename = "rowType")]
    row_type: Vec<SnowflakeColumn>,
}

#[derive(Debug, Deserialize)]
struct SnowflakeColumn {
    name: String,
}

pub async fn load_sql(entry: &SqlEntry, credentials_path: &Path) -> Result<TabularValue, LoadError> {
    if !entry.database_kind.eq_ignore_ascii_case("snowflake") {
        return Err(LoadError::UnsupportedDatabase {
            kind: entry.database_kind.clone(),
        });
    }

    let sql_path = PathBuf::from(&entry.sql_path);
    if !sql_path.exists() {
        return Err(LoadError::SqlFileMissing { path: sql_path });
    }
    let statement = std::fs::read_to_string(&sql_path).map_err(|source| LoadError::Io {
        path: sql_path.clone(),
        source,
    })?;

    let credentials = Credentials::load(credentials_path).map_err(LoadError::Config)?;
    let creds = credentials
        .get(&entry.credentials_key)
        .ok_or_else(|| LoadError::UnknownCredentials {
            key: entry.credentials_key.clone(),
            credentials_path: credentials_path.to_path_buf(),
        })?;

    execute_snowflake(&statement, creds).await
}

async fn execute_snowflake(statement: &str, creds: &CredentialsEntry) -> Result<TabularValue, LoadError> {
    let account = creds.account.clone().unwrap_or_default();
    let url = format!("https://{account}.snowflakecomputing.com/api/v2/statements");

    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .bearer_auth(creds.password.clone().unwrap_or_default())
        .json(&json!({
            "statement": statement,
            "database": creds.database,
            "schema": creds.schema,
            "warehouse": creds.warehouse,
        }))
        .send()
        .await
        .map_err(|e| snowflake_error(&account, format!("request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(snowflake_error(&account, format!("http status {}", response.status())));
    }

    let parsed: SnowflakeResponse = response
        .json()
        .await
        .map_err(|e| snowflake_error(&account, format!("failed to decode response: {e}")))?;

    build_record_batch(&account, &parsed)
}

fn build_record_batch(account: &str, response: &SnowflakeResponse) -> Result<TabularValue, LoadError> {
    let column_names: Vec<&str> = response.metadata.row_type.iter().map(|c| c.name.as_str()).collect();
    let mut columns: Vec<Vec<Option<String>>> = vec![Vec::new(); column_names.len()];

    for row in &response.data {
        for (idx, column) in columns.iter_mut().enumerate() {
            column.push(row.get(idx).cloned().flatten());
        }
    }

    if column_names.is_empty() {
        return Err(snowflake_error(account, "response declared no columns".to_string()));
    }

    let fields: Vec<Field> = column_names.iter().map(|n| Field::new(*n, DataType::Utf8, true)).collect();
    let arrays: Vec<ArrayRef> = columns
        .into_iter()
        .map(|col| Arc::new(StringArray::from(col)) as ArrayRef)
        .collect();

    let schema = Arc::new(Schema::new(fields));
    TabularValue::try_new(schema, arrays).map_err(LoadError::Arrow)
}

fn snowflake_error(account: &str, details: String) -> LoadError {
    LoadError::Snowflake {
        account: account.to_string(),
        details,
    }
}

pub async fn load(entry: &CatalogEntry, credentials_path: &Path) -> Result<TabularValue, LoadError> {
    match entry {
        CatalogEntry::Sql(sql) => load_sql(sql, credentials_path).await,
        _ => unreachable!("load_sql dispatched against a non-SQL entry"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "kiln-loaders-sql-test-{}-{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn unsupported_database_kind_fails_fast() {
        let entry = SqlEntry {
            database_kind: "postgres".to_string(),
            sql_path: "query.sql".to_string(),
            credentials_key: "default".to_string(),
        };
        let err = load_sql(&entry, Path::new("/irrelevant.yaml")).await.unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedDatabase { .. }));
    }

    #[tokio::test]
    async fn capitalized_snowflake_discriminator_is_accepted() {
        let entry = SqlEntry {
            database_kind: "Snowflake".to_string(),
            sql_path: "/nonexistent/query.sql".to_string(),
            credentials_key: "default".to_string(),
        };
        let err = load_sql(&entry, Path::new("/irrelevant.yaml")).await.unwrap_err();
        assert!(matches!(err, LoadError::SqlFileMissing { .. }));
    }

    #[tokio::test]
    async fn missing_sql_file_is_named() {
        let dir = tempdir();
        let creds_path = dir.join("credentials.yaml");
        std::fs::write(&creds_path, "default:\n  account: acme\n").unwrap();

        let entry = SqlEntry {
            database_kind: "snowflake".to_string(),
            sql_path: dir.join("missing.sql").to_string_lossy().to_string(),
            credentials_key: "default".to_string(),
        };
        let err = load_sql(&entry, &creds_path).await.unwrap_err();
        assert!(matches!(err, LoadError::SqlFileMissing { .. }));
        std::fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn unknown_credentials_key_is_named() {
        let dir = tempdir();
        let sql_path = dir.join("query.sql");
        std::fs::write(&sql_path, "select 1").unwrap();
        let creds_path = dir.join("credentials.yaml");
        std::fs::write(&creds_path, "default:\n  account: acme\n").unwrap();

        let entry = SqlEntry {
            database_kind: "snowflake".to_string(),
            sql_path: sql_path.to_string_lossy().to_string(),
            credentials_key: "absent".to_string(),
        };
        let err = load_sql(&entry, &creds_path).await.unwrap_err();
        assert!(matches!(err, LoadError::UnknownCredentials { .. }));
        std::fs::remove_dir_all(dir).ok();
    }
}
