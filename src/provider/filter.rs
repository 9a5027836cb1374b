//! Metadata filter expressions for vector index queries
//!
//! Filters support equality, set membership, and boolean `$or`
//! combination. They render to the JSON dialect used by hosted vector
//! stores and can also be evaluated locally against a metadata map,
//! which is how `InMemoryVectorIndex` applies them.

use serde_json::{json, Value};
use std::collections::HashMap;

/// A filter over record metadata
#[derive(Debug, Clone)]
pub enum MetadataFilter {
    /// Field equals value
    Eq {
        /// Metadata field name
        field: String,
        /// Expected value
        value: Value,
    },
    /// Field is one of the given values
    In {
        /// Metadata field name
        field: String,
        /// Accepted values
        values: Vec<Value>,
    },
    /// Any of the sub-filters matches
    Or(Vec<MetadataFilter>),
}

impl MetadataFilter {
    /// Equality filter
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        MetadataFilter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Set-membership filter
    pub fn is_in(field: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        MetadataFilter::In {
            field: field.into(),
            values: values.into_iter().collect(),
        }
    }

    /// Boolean OR of sub-filters
    pub fn any_of(filters: Vec<MetadataFilter>) -> Self {
        MetadataFilter::Or(filters)
    }

    /// Evaluate the filter against a metadata map
    pub fn matches(&self, metadata: &HashMap<String, Value>) -> bool {
        match self {
            MetadataFilter::Eq { field, value } => {
                metadata.get(field).map(|v| v == value).unwrap_or(false)
            }
            MetadataFilter::In { field, values } => metadata
                .get(field)
                .map(|v| values.contains(v))
                .unwrap_or(false),
            MetadataFilter::Or(filters) => filters.iter().any(|f| f.matches(metadata)),
        }
    }

    /// Render to the wire JSON dialect (`$eq` / `$in` / `$or`)
    pub fn to_query_json(&self) -> Value {
        match self {
            MetadataFilter::Eq { field, value } => json!({ field: { "$eq": value } }),
            MetadataFilter::In { field, values } => json!({ field: { "$in": values } }),
            MetadataFilter::Or(filters) => {
                let parts: Vec<Value> = filters.iter().map(|f| f.to_query_json()).collect();
                json!({ "$or": parts })
            }
        }
    }
}
