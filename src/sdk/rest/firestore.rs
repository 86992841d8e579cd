//! Firestore v1 document operations and structured queries.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SdkError;
use crate::sdk::{
    AuthToken, Document, FieldConstraint, Fields, FilterOp, OrderBy, SearchQuery, SortDirection,
};

use super::value::{encode, encode_fields, FirestoreValue, WireDocument, WriteBody};
use super::{check_status, RestSdk};

// =============================================================================
// Structured Query
// =============================================================================

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryRequest {
    pub structured_query: StructuredQuery,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StructuredQuery {
    pub from: Vec<CollectionSelector>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<Order>,
    pub limit: u32,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSelector {
    pub collection_id: String,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    CompositeFilter(CompositeFilter),
    FieldFilter(FieldFilter),
    UnaryFilter(UnaryFilter),
}

#[derive(Serialize, Debug, PartialEq)]
pub struct CompositeFilter {
    pub op: &'static str,
    pub filters: Vec<Filter>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct FieldFilter {
    pub field: FieldReference,
    pub op: &'static str,
    pub value: FirestoreValue,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct UnaryFilter {
    pub op: &'static str,
    pub field: FieldReference,
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldReference {
    pub field_path: String,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct Order {
    pub field: FieldReference,
    pub direction: &'static str,
}

/// One element of the `runQuery` response stream.
#[derive(Deserialize, Debug)]
struct RunQueryResponse {
    document: Option<WireDocument>,
}

impl StructuredQuery {
    pub fn from_search(query: &SearchQuery) -> Self {
        let mut filters: Vec<Filter> = query.constraints.iter().map(Filter::from).collect();

        let filter = match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::CompositeFilter(CompositeFilter {
                op: "AND",
                filters,
            })),
        };

        Self {
            from: vec![CollectionSelector {
                collection_id: query.doc_type.clone(),
            }],
            filter,
            order_by: query.order_by.iter().map(Order::from).collect(),
            limit: query.limit,
        }
    }
}

impl From<&FieldConstraint> for Filter {
    fn from(constraint: &FieldConstraint) -> Self {
        let field = FieldReference {
            field_path: query_field_path(&constraint.field),
        };

        // Firestore rejects null in field filters
        if constraint.value.is_null() {
            match constraint.op {
                FilterOp::Equal => return Filter::UnaryFilter(UnaryFilter { op: "IS_NULL", field }),
                FilterOp::NotEqual => {
                    return Filter::UnaryFilter(UnaryFilter {
                        op: "IS_NOT_NULL",
                        field,
                    })
                }
                _ => {}
            }
        }

        Filter::FieldFilter(FieldFilter {
            field,
            op: operator_name(constraint.op),
            value: encode(&constraint.value),
        })
    }
}

impl From<&OrderBy> for Order {
    fn from(order: &OrderBy) -> Self {
        Self {
            field: FieldReference {
                field_path: query_field_path(&order.field),
            },
            direction: match order.direction {
                SortDirection::Ascending => "ASCENDING",
                SortDirection::Descending => "DESCENDING",
            },
        }
    }
}

fn operator_name(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Equal => "EQUAL",
        FilterOp::NotEqual => "NOT_EQUAL",
        FilterOp::LessThan => "LESS_THAN",
        FilterOp::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
        FilterOp::GreaterThan => "GREATER_THAN",
        FilterOp::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
        FilterOp::ArrayContains => "ARRAY_CONTAINS",
        FilterOp::ArrayContainsAny => "ARRAY_CONTAINS_ANY",
        FilterOp::In => "IN",
        FilterOp::NotIn => "NOT_IN",
    }
}

// =============================================================================
// Field Paths
// =============================================================================

/// Quote one path segment unless it is a simple identifier.
fn quote_segment(segment: &str) -> String {
    let mut chars = segment.chars();
    let simple = matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric());

    if simple {
        segment.to_string()
    } else {
        format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Dotted search paths address nested fields.
fn query_field_path(field: &str) -> String {
    field
        .split('.')
        .map(quote_segment)
        .collect::<Vec<_>>()
        .join(".")
}

// =============================================================================
// Document Operations
// =============================================================================

impl RestSdk {
    fn documents_root(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents",
            self.firestore_base_url, self.project_id
        )
    }

    fn collection_url(&self, doc_type: &str) -> String {
        format!(
            "{}/{}",
            self.documents_root(),
            urlencoding::encode(doc_type)
        )
    }

    fn document_url(&self, doc_type: &str, doc_id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(doc_type),
            urlencoding::encode(doc_id)
        )
    }

    pub(super) async fn firestore_get(
        &self,
        token: &AuthToken,
        doc_type: &str,
        doc_id: &str,
    ) -> Result<Document, SdkError> {
        let response = self
            .http
            .get(self.document_url(doc_type, doc_id))
            .bearer_auth(token.as_str())
            .send()
            .await?;

        let wire: WireDocument = check_status(response).await?.json().await?;
        Ok(wire.into_document())
    }

    pub(super) async fn firestore_create(
        &self,
        token: &AuthToken,
        doc_type: &str,
        doc_id: &str,
        data: &Fields,
    ) -> Result<Document, SdkError> {
        let response = self
            .http
            .post(self.collection_url(doc_type))
            .query(&[("documentId", doc_id)])
            .bearer_auth(token.as_str())
            .json(&WriteBody {
                fields: encode_fields(data),
            })
            .send()
            .await?;

        let wire: WireDocument = check_status(response).await?.json().await?;
        Ok(wire.into_document())
    }

    pub(super) async fn firestore_update(
        &self,
        token: &AuthToken,
        doc_type: &str,
        doc_id: &str,
        data: &Fields,
    ) -> Result<Document, SdkError> {
        // Only the named top-level fields are touched; the rest are kept
        let mut params: Vec<(&str, String)> = data
            .keys()
            .map(|key| ("updateMask.fieldPaths", quote_segment(key)))
            .collect();
        params.push(("currentDocument.exists", "true".to_string()));

        let response = self
            .http
            .patch(self.document_url(doc_type, doc_id))
            .query(&params)
            .bearer_auth(token.as_str())
            .json(&WriteBody {
                fields: encode_fields(data),
            })
            .send()
            .await?;

        let wire: WireDocument = check_status(response).await?.json().await?;
        Ok(wire.into_document())
    }

    pub(super) async fn firestore_delete(
        &self,
        token: &AuthToken,
        doc_type: &str,
        doc_id: &str,
    ) -> Result<(), SdkError> {
        let response = self
            .http
            .delete(self.document_url(doc_type, doc_id))
            .query(&[("currentDocument.exists", "true")])
            .bearer_auth(token.as_str())
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }

    pub(super) async fn firestore_search(
        &self,
        token: &AuthToken,
        query: &SearchQuery,
    ) -> Result<Vec<Document>, SdkError> {
        let body = RunQueryRequest {
            structured_query: StructuredQuery::from_search(query),
        };
        debug!(
            doc_type = %query.doc_type,
            constraints = query.constraints.len(),
            limit = query.limit,
            "Running structured query"
        );

        let response = self
            .http
            .post(format!("{}:runQuery", self.documents_root()))
            .bearer_auth(token.as_str())
            .json(&body)
            .send()
            .await?;

        let rows: Vec<RunQueryResponse> = check_status(response).await?.json().await?;

        // Rows without a document only report read progress
        Ok(rows
            .into_iter()
            .filter_map(|row| row.document)
            .map(WireDocument::into_document)
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================
