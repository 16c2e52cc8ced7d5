//! End-to-end metadata check
//!
//! Fetches the actual value, resolves the expected value (literal, or a
//! compare value fetched live with the cache as fallback) and compares them.

use crate::cache::{load_cache, save_cache, CacheRecord};
use crate::compare::{check_value, CompareOptions, Expectation};
use crate::error::FetchError;
use crate::status::CheckResult;
use crate::value::MetaValue;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Source of host metadata documents
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch the whole metadata document of `namespace` for a host
    async fn fetch_metadata(&self, host_id: &str, namespace: &str) -> anyhow::Result<Value>;
}

/// Fetch the value stored under `key` in `namespace`
pub async fn fetch_value<F: MetadataFetcher + ?Sized>(
    fetcher: &F,
    host_id: &str,
    namespace: &str,
    key: &str,
) -> Result<Value, FetchError> {
    let document = fetcher
        .fetch_metadata(host_id, namespace)
        .await
        .map_err(|source| FetchError::Request {
            namespace: namespace.to_string(),
            source,
        })?;

    match document {
        Value::Object(mut map) => map
            .remove(key)
            .ok_or_else(|| FetchError::KeyNotFound(key.to_string())),
        _ => Err(FetchError::NotAnObject(namespace.to_string())),
    }
}

/// Where a check takes its expected value from
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectationSource {
    /// Literal given on the command line
    Literal(String),
    /// Value of another metadata key, cached for fallback
    Metadata { namespace: String, key: String },
}

/// A fully resolved check invocation
#[derive(Debug, Clone)]
pub struct MetaCheck {
    pub host_id: String,
    pub namespace: String,
    pub key: String,
    pub expectation: ExpectationSource,
    pub options: CompareOptions,
    /// Cache file for compare values of this invocation
    pub cache_file: PathBuf,
    /// Original command line arguments, stored with cached values
    pub args: Vec<String>,
}

impl MetaCheck {
    /// Run the check once
    pub async fn run<F: MetadataFetcher + ?Sized>(&self, fetcher: &F) -> CheckResult {
        let actual = match fetch_value(fetcher, &self.host_id, &self.namespace, &self.key).await {
            Ok(value) => value,
            Err(e) => return CheckResult::critical(e.to_string()),
        };
        let actual = match MetaValue::try_from(actual) {
            Ok(value) => value,
            Err(e) => return CheckResult::unknown(e.to_string()),
        };
        debug!(key = %self.key, value = %actual, "Fetched actual value");

        let expected = match &self.expectation {
            ExpectationSource::Literal(s) => Expectation::Literal(s.clone()),
            ExpectationSource::Metadata { namespace, key } => {
                match self.resolve_compare_value(fetcher, namespace, key).await {
                    Ok(value) => Expectation::Value(value),
                    Err(result) => return result,
                }
            }
        };

        check_value(&actual, &expected, &self.options)
    }

    /// Live compare value, falling back to the cache when the fetch fails
    async fn resolve_compare_value<F: MetadataFetcher + ?Sized>(
        &self,
        fetcher: &F,
        namespace: &str,
        key: &str,
    ) -> Result<MetaValue, CheckResult> {
        match fetch_value(fetcher, &self.host_id, namespace, key).await {
            Ok(value) => {
                let value = MetaValue::try_from(value)
                    .map_err(|e| CheckResult::unknown(format!("compare value: {}", e)))?;
                if value.is_absent() {
                    return Err(CheckResult::unknown(format!(
                        "compare value is null: namespace={}, key={}",
                        namespace, key
                    )));
                }

                let record = CacheRecord::new(self.args.clone(), value.clone());
                if let Err(e) = save_cache(&self.cache_file, record) {
                    warn!(error = %e, "Failed to save compare value to cache");
                }
                Ok(value)
            }
            Err(fetch_err) => {
                info!(error = %fetch_err, "Compare value unavailable, using cache");
                let record = load_cache(&self.cache_file)
                    .map_err(|e| CheckResult::unknown(e.to_string()))?;

                match record {
                    Some(record) if !record.expected.is_absent() => {
                        debug!(updated_at = ?record.updated_at, "Using cached compare value");
                        Ok(record.expected)
                    }
                    _ => Err(CheckResult::unknown("there is no data in the cache")),
                }
            }
        }
    }
}
