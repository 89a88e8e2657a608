//! Output document of the Go analysis toolchain.

use serde::{Deserialize, Serialize};

/// Whole-module analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoAnalysis {
    /// Module path from `go.mod`.
    pub module: String,
    pub packages: Vec<GoPackage>,
}

/// One directory of `.go` files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoPackage {
    /// Import path (`example.com/shop/internal/orders`).
    pub path: String,
    /// Directory relative to the module root, `.` for the root.
    pub dir: String,
    /// Project-relative `/`-separated source files.
    pub files: Vec<String>,
    /// Imports under the module path.
    pub imports: Vec<String>,
    pub structs: Vec<GoStruct>,
    pub interfaces: Vec<GoInterface>,
    pub functions: Vec<GoFunction>,
    pub is_entry_point: bool,
    pub class_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoStruct {
    pub name: String,
    pub file: String,
    pub line: u32,
    pub fields: Vec<GoField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoInterface {
    pub name: String,
    pub file: String,
    pub line: u32,
    pub methods: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

/// A function, or a method when `receiver` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoFunction {
    pub name: String,
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,
    pub parameters: Vec<GoParameter>,
    pub returns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_path: Option<String>,
    pub returns_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl GoFunction {
    /// `Receiver.Name` for methods, `Name` for functions.
    pub fn qualified_name(&self) -> String {
        match self.receiver.as_deref().map(|r| r.trim_start_matches('*')) {
            Some(receiver) if !receiver.is_empty() => format!("{}.{}", receiver, self.name),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    /// Internal package the parameter type is declared in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_package: Option<String>,
    pub is_pointer: bool,
    pub is_slice: bool,
    pub is_variadic: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toolchain_document() {
        let json = r#"{
            "module": "example.com/shop",
            "packages": [{
                "path": "example.com/shop/internal/orders",
                "dir": "internal/orders",
                "files": ["internal/orders/handler.go"],
                "imports": ["example.com/shop/internal/store"],
                "functions": [{
                    "name": "Create",
                    "file": "internal/orders/handler.go",
                    "line": 12,
                    "receiver": "*Handler",
                    "parameters": [{"name": "o", "type": "*store.Order",
                                    "resolvedPackage": "example.com/shop/internal/store",
                                    "isPointer": true, "isSlice": false, "isVariadic": false}],
                    "returns": ["error"],
                    "httpMethod": "POST",
                    "httpPath": "/orders",
                    "returnsError": true
                }],
                "isEntryPoint": true,
                "classType": "controller"
            }]
        }"#;

        let analysis: GoAnalysis = serde_json::from_str(json).unwrap();
        let package = &analysis.packages[0];
        assert!(package.is_entry_point);
        assert!(package.structs.is_empty());

        let function = &package.functions[0];
        assert_eq!(function.qualified_name(), "Handler.Create");
        assert_eq!(function.parameters[0].type_name, "*store.Order");
        assert_eq!(
            function.parameters[0].resolved_package.as_deref(),
            Some("example.com/shop/internal/store")
        );
    }
}
