use std::path::PathBuf;

use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

/// Scenario catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Scenario already registered: {key}")]
    DuplicateScenario { key: String },

    #[error("Invalid scenario {key}: {reason}")]
    InvalidScenario { key: String, reason: String },

    #[error("Failed to read scenario file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse scenario file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// MCP protocol errors
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Unknown tool: {tool_name}")]
    UnknownTool { tool_name: String },

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParameters { tool_name: String, message: String },

    #[error("Tool execution failed: {message}")]
    ExecutionFailed { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tool-specific errors with structured details
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Not found: {what}")]
    NotFound { what: String },
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        McpError::ExecutionFailed {
            message: err.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Result type alias for MCP operations
pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "bad delay".to_string(),
        };
        assert_eq!(err.to_string(), "Configuration error: bad delay");
    }

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::DuplicateScenario {
            key: "checkout-drop".to_string(),
        };
        assert_eq!(err.to_string(), "Scenario already registered: checkout-drop");

        let err = CatalogError::InvalidScenario {
            key: "x".to_string(),
            reason: "no rules".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid scenario x: no rules");

        let err = CatalogError::Read {
            path: PathBuf::from("/tmp/missing.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to read scenario file /tmp/missing.json: gone"
        );
    }

    #[test]
    fn test_mcp_error_display() {
        let err = McpError::UnknownTool {
            tool_name: "nonexistent".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown tool: nonexistent");

        let err = McpError::InvalidParameters {
            tool_name: "rca_source_record".to_string(),
            message: "missing source".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid parameters for rca_source_record: missing source"
        );
    }

    #[test]
    fn test_tool_error_display() {
        let err = ToolError::Validation {
            field: "source".to_string(),
            reason: "unknown source key".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Validation failed: source - unknown source key"
        );

        let err = ToolError::NotFound {
            what: "record".to_string(),
        };
        assert_eq!(err.to_string(), "Not found: record");
    }

    #[test]
    fn test_tool_error_conversion_to_mcp_error() {
        let mcp_err: McpError = ToolError::NotFound {
            what: "scenario".to_string(),
        }
        .into();
        assert!(matches!(mcp_err, McpError::ExecutionFailed { .. }));
        assert!(mcp_err.to_string().contains("Not found: scenario"));
    }

    #[test]
    fn test_catalog_error_conversion_to_app_error() {
        let app_err: AppError = CatalogError::DuplicateScenario {
            key: "k".to_string(),
        }
        .into();
        assert!(matches!(app_err, AppError::Catalog(_)));
    }

    #[test]
    fn test_scenario_file_failure_propagates_as_app_error() {
        fn load() -> AppResult<usize> {
            let mut catalog = crate::catalog::ScenarioCatalog::new();
            Ok(catalog.load_file(std::path::Path::new("/definitely/not/here.json"))?)
        }

        let err = load().unwrap_err();
        assert!(matches!(err, AppError::Catalog(CatalogError::Read { .. })));
        assert!(err
            .to_string()
            .starts_with("Catalog error: Failed to read scenario file"));
    }
}
