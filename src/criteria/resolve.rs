// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Dynamic operation resolution.
//!
//! Callers that receive operation names at runtime (query-string DSLs,
//! saved searches) resolve them through a fixed-priority chain:
//!
//! 1. core builder vocabulary (`order`, `limit`, `with`, ...)
//! 2. sequence delegation (`to_a`, `first`, `count`, ...), which
//!    populates the criteria if it has not run yet
//! 3. the named-scope registry of the bound type (or an explicitly
//!    attached one), whose body runs against a fresh criteria bound to
//!    the same type and is merged into the receiver
//! 4. otherwise an unknown-operation error
//!
//! # Example
//!
//! ```
//! use search_criteria::{Criteria, Resolved};
//! use search_criteria::schema::DomainType;
//!
//! # tokio_test::block_on(async {
//! let offer = DomainType::builder("Offer")
//!     .scope("recent", |c, _| c.order("created_at desc"))
//!     .build();
//!
//! let criteria = Criteria::bound(offer);
//! match criteria.resolve("recent", &[]).await.unwrap() {
//!     Resolved::Criteria(c) => {
//!         assert_eq!(c.search_options().order.as_deref(), Some("created_at desc"));
//!     }
//!     _ => unreachable!(),
//! }
//! # });
//! ```

use serde_json::Value;

use super::{Criteria, FilterValue};
use crate::collection::Document;
use crate::error::{EngineError, Result};

/// Outcome of a dynamically resolved operation.
#[derive(Debug)]
pub enum Resolved {
    /// A builder operation or named scope: the mutated criteria.
    Criteria(Criteria),
    /// A counting sequence operation.
    Count(u64),
    /// A single-document sequence operation.
    Document(Option<Document>),
    /// A full-sequence operation.
    Documents(Vec<Document>),
}

impl Criteria {
    /// Resolve an operation name through the fallback chain described in
    /// the module docs. Consumes the criteria; builder outcomes hand it
    /// back inside [`Resolved::Criteria`].
    pub async fn resolve(mut self, name: &str, args: &[Value]) -> Result<Resolved> {
        // 1. Core vocabulary
        self = match self.try_vocabulary(name, args)? {
            Ok(resolved) => return Ok(Resolved::Criteria(resolved)),
            Err(unchanged) => unchanged,
        };

        // 2. Sequence delegation
        match name {
            "to_a" | "all" => {
                let docs = self.to_a().await?.to_vec();
                return Ok(Resolved::Documents(docs));
            }
            "first" => {
                let first = self.first().await?;
                return Ok(Resolved::Document(first));
            }
            "count" | "size" | "length" => {
                let count = self.count().await? as u64;
                return Ok(Resolved::Count(count));
            }
            "total_entries" => {
                let total = self.total_entries().await?;
                return Ok(Resolved::Count(total));
            }
            _ => {}
        }

        // 3. Named-scope registry
        let registry = self
            .search_options()
            .named_scope_class
            .clone()
            .or_else(|| self.bound_type().cloned());
        if let Some(domain_type) = registry {
            if let Some(body) = domain_type.scope(name) {
                let fresh = Criteria::bound(domain_type.clone());
                let returned = body(fresh, args);
                return Ok(Resolved::Criteria(self.merge(returned)));
            }
        }

        // 4. Nothing matched
        Err(EngineError::UnknownOperation(name.to_string()))
    }

    /// Dispatch a vocabulary name; `Err(self)` means "not vocabulary".
    #[allow(clippy::result_large_err)]
    fn try_vocabulary(
        self,
        name: &str,
        args: &[Value],
    ) -> Result<std::result::Result<Criteria, Criteria>> {
        let criteria = match name {
            "order" => self.order(string_arg(name, args)?),
            "limit" => self.limit(u64_arg(name, args)?),
            "group_by" => self.group_by(string_arg(name, args)?),
            "search" => {
                let mut criteria = self;
                for term in args {
                    criteria = criteria.search(coerce_string(term));
                }
                criteria
            }
            "select" => self.select(string_list_args(args)),
            "facet_fields" => self.facet_fields(string_list_args(args)),
            "for_types" => self.for_types(string_list_args(args)),
            "with" => {
                let entries = object_arg(name, args)?;
                let mut criteria = self;
                for (key, value) in entries {
                    criteria = criteria.with(key.as_str(), FilterValue::from(value));
                }
                criteria
            }
            "without" => {
                let entries = object_arg(name, args)?;
                let mut criteria = self;
                for (key, value) in entries {
                    criteria = criteria.without(key.as_str(), FilterValue::from(value));
                }
                criteria
            }
            "conditions" => {
                let entries = object_arg(name, args)?;
                let mut criteria = self;
                for (key, value) in entries {
                    criteria = criteria.conditions(key.as_str(), FilterValue::from(value));
                }
                criteria
            }
            "paginate" => {
                let entries = object_arg(name, args)?;
                let page = entries.get("page").and_then(Value::as_u64);
                let per_page = entries.get("per_page").and_then(Value::as_u64);
                self.paginate(page, per_page)
            }
            "options" => self.options(object_arg(name, args)?),
            _ => return Ok(Err(self)),
        };
        Ok(Ok(criteria))
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn string_arg(name: &str, args: &[Value]) -> Result<String> {
    args.first()
        .map(coerce_string)
        .ok_or_else(|| EngineError::Configuration(format!("operation {name} expects an argument")))
}

fn u64_arg(name: &str, args: &[Value]) -> Result<u64> {
    args.first().and_then(Value::as_u64).ok_or_else(|| {
        EngineError::Configuration(format!("operation {name} expects a numeric argument"))
    })
}

fn object_arg(name: &str, args: &[Value]) -> Result<serde_json::Map<String, Value>> {
    match args.first() {
        Some(Value::Object(map)) => Ok(map.clone()),
        _ => Err(EngineError::Configuration(format!(
            "operation {name} expects an object argument"
        ))),
    }
}

fn string_list_args(args: &[Value]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| match arg {
            Value::Array(items) => items.iter().map(coerce_string).collect::<Vec<_>>(),
            other => vec![coerce_string(other)],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DomainType;
    use serde_json::json;

    #[tokio::test]
    async fn test_vocabulary_resolution() {
        let resolved = Criteria::new()
            .resolve("order", &[json!("popularity desc")])
            .await
            .unwrap();
        match resolved {
            Resolved::Criteria(criteria) => {
                assert_eq!(
                    criteria.search_options().order.as_deref(),
                    Some("popularity desc")
                );
            }
            other => panic!("expected criteria, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_with_object_argument() {
        let resolved = Criteria::new()
            .resolve("with", &[json!({"enabled": true, "user_id": 1})])
            .await
            .unwrap();
        match resolved {
            Resolved::Criteria(criteria) => assert_eq!(criteria.filters().with.len(), 2),
            other => panic!("expected criteria, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_named_scope_merges_into_receiver() {
        let offer = DomainType::builder("Offer")
            .scope("for_user", |c, args| {
                let id = args.first().and_then(Value::as_i64).unwrap_or_default();
                c.with("user_id", id)
            })
            .build();

        let resolved = Criteria::bound(offer)
            .order("title asc")
            .resolve("for_user", &[json!(7)])
            .await
            .unwrap();

        match resolved {
            Resolved::Criteria(criteria) => {
                assert_eq!(criteria.search_options().order.as_deref(), Some("title asc"));
                assert_eq!(criteria.filters().with.len(), 1);
            }
            other => panic!("expected criteria, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_operation_error() {
        let err = Criteria::new().resolve("rgne", &[]).await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownOperation(name) if name == "rgne"));
    }

    #[tokio::test]
    async fn test_unregistered_scope_on_bound_type_errors() {
        let offer = DomainType::builder("Offer").build();
        let err = Criteria::bound(offer).resolve("recent", &[]).await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownOperation(_)));
    }

    #[tokio::test]
    async fn test_bad_argument_shape_is_configuration_error() {
        let err = Criteria::new().resolve("with", &[json!(1)]).await.unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
