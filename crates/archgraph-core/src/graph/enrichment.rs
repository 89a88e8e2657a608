//! Optional metadata attached to nodes and methods.
//!
//! Structural extraction fills in what it can see syntactically (role, HTTP mapping,
//! declared failures, line numbers). Descriptions and business-logic steps are left for a
//! later enrichment pass. A missing entry means "not enriched", never "no structure".

use serde::{Deserialize, Serialize};

/// Enrichment attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    /// Structural role, e.g. `controller` or `repository`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_type: Option<String>,

    /// Free-text description of the unit's purpose.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NodeInfo {
    pub fn with_class_type(class_type: impl Into<String>) -> Self {
        Self {
            class_type: Some(class_type.into()),
            description: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.class_type.is_none() && self.description.is_none()
    }
}

/// Enrichment attached to one method of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodInfo {
    pub method_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered business-logic steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_logic: Option<Vec<String>>,

    /// Declared failure modes (exception or error names).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exceptions: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_path: Option<String>,

    /// 1-based line of the declaration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
}

impl MethodInfo {
    pub fn new(method_name: impl Into<String>) -> Self {
        Self {
            method_name: method_name.into(),
            ..Default::default()
        }
    }

    /// Whether this method is mapped to an HTTP route.
    pub fn is_endpoint(&self) -> bool {
        self.http_method.is_some() || self.http_path.is_some()
    }
}
