//! MCP Server implementation using rmcp

use crate::error::Error;
use crate::pdf::{ensure_pdf_header, SaveOptions, SignatureStripper, StripReport};
use crate::storage::{HttpObjectStore, LocalObjectStore, ObjectLocation, ObjectStore, Workspace};
use anyhow::Result;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

/// Where input and output objects live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Buckets are directories under `root`
    Local { root: PathBuf },
    /// S3-compatible endpoint using path-style addressing
    Http {
        endpoint: String,
        token: Option<String>,
    },
}

/// Storage and processing configuration for the signature stripper
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Storage backend for input and output objects (default: local, current directory)
    pub storage: StorageBackend,
    /// Maximum download size in bytes (default: 100MB)
    pub max_download_bytes: u64,
    /// Directory for per-request working copies (default: system temp dir)
    pub work_dir: Option<PathBuf>,
    /// Drop objects orphaned by signature removal when writing (default: true)
    pub prune_unreferenced: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            storage: StorageBackend::Local {
                root: PathBuf::from("."),
            },
            max_download_bytes: 100 * 1024 * 1024, // 100MB
            work_dir: None,
            prune_unreferenced: true,
        }
    }
}

impl ServerConfig {
    /// Build the configuration from `PDF_STRIPPER_*` environment variables
    pub fn from_env() -> crate::error::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> crate::error::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let storage = match var("PDF_STRIPPER_STORAGE_ENDPOINT") {
            Some(endpoint) => StorageBackend::Http {
                endpoint,
                token: var("PDF_STRIPPER_STORAGE_TOKEN"),
            },
            None => match var("PDF_STRIPPER_STORAGE_ROOT") {
                Some(root) => StorageBackend::Local {
                    root: PathBuf::from(root),
                },
                None => defaults.storage,
            },
        };

        let max_download_bytes = match var("PDF_STRIPPER_MAX_DOWNLOAD_BYTES") {
            Some(raw) => raw.trim().parse().map_err(|_| Error::Configuration {
                reason: format!("PDF_STRIPPER_MAX_DOWNLOAD_BYTES is not a number: {}", raw),
            })?,
            None => defaults.max_download_bytes,
        };

        let prune_unreferenced = match var("PDF_STRIPPER_PRUNE_UNREFERENCED") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| Error::Configuration {
                reason: format!("PDF_STRIPPER_PRUNE_UNREFERENCED is not a boolean: {}", raw),
            })?,
            None => defaults.prune_unreferenced,
        };

        Ok(Self {
            storage,
            max_download_bytes,
            work_dir: var("PDF_STRIPPER_WORK_DIR").map(PathBuf::from),
            prune_unreferenced,
        })
    }

    /// Instantiate the configured storage backend
    pub fn build_store(&self) -> crate::error::Result<Arc<dyn ObjectStore>> {
        Ok(match &self.storage {
            StorageBackend::Local { root } => Arc::new(LocalObjectStore::new(root.clone())),
            StorageBackend::Http { endpoint, token } => Arc::new(HttpObjectStore::new(
                endpoint,
                token.clone(),
                self.max_download_bytes,
            )?),
        })
    }

    fn save_options(&self) -> SaveOptions {
        SaveOptions {
            prune_unreferenced: self.prune_unreferenced,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// PDF signature stripping MCP server
#[derive(Clone)]
pub struct SignatureServer {
    store: Arc<dyn ObjectStore>,
    tool_router: ToolRouter<Self>,
    /// Server configuration
    config: Arc<ServerConfig>,
}

// ============================================================================
// Request/Response types for remove_signature
// ============================================================================

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct RemoveSignatureParams {
    /// Bucket (container) holding the signed PDF
    #[serde(default)]
    pub bucket: Option<String>,
    /// Object key of the signed PDF, e.g. "docs/assinado.pdf"
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct RemoveSignatureResult {
    pub bucket: String,
    /// Key of the input object
    pub source: String,
    /// Key of the unsigned copy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Names of the removed signature fields
    pub removed_fields: Vec<String>,
    /// Signature widget annotations removed from pages
    pub removed_annotations: usize,
    pub sig_flags_cleared: bool,
    pub page_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RemoveSignatureResult {
    fn failed(params: &RemoveSignatureParams, error: &Error) -> Self {
        Self {
            bucket: params.bucket.clone().unwrap_or_default(),
            source: params.path.clone().unwrap_or_default(),
            output: None,
            removed_fields: vec![],
            removed_annotations: 0,
            sig_flags_cleared: false,
            page_count: 0,
            error: Some(error.client_message()),
        }
    }
}

// ============================================================================
// Tool implementations
// ============================================================================

#[tool_router]
impl SignatureServer {
    /// Create a server over `store` with default settings
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_config(store, ServerConfig::default())
    }

    /// Create a server over `store` with full configuration
    pub fn with_config(store: Arc<dyn ObjectStore>, config: ServerConfig) -> Self {
        Self {
            store,
            tool_router: Self::tool_router(),
            config: Arc::new(config),
        }
    }

    /// Create a server whose store is built from the configuration
    pub fn from_config(config: ServerConfig) -> crate::error::Result<Self> {
        let store = config.build_store()?;
        Ok(Self::with_config(store, config))
    }

    /// Remove digital signatures from a PDF in object storage
    #[tool(
        description = "Remove digital signatures from a PDF stored in object storage. Signature fields, their widget annotations and the AcroForm SigFlags are removed; everything else is kept. The unsigned copy is written to the same bucket with \"sem-certificado\" inserted before the file name (docs/assinado.pdf -> docs/sem-certificado/assinado.pdf).

Parameters: {\"bucket\": \"my-bucket\", \"path\": \"docs/assinado.pdf\"}"
    )]
    async fn remove_signature(
        &self,
        Parameters(params): Parameters<RemoveSignatureParams>,
    ) -> String {
        let result = self
            .process_remove_signature(&params)
            .await
            .unwrap_or_else(|e| {
                if e.is_validation() {
                    tracing::info!(error = %e, "remove_signature rejected");
                } else {
                    tracing::warn!(error = %e, "remove_signature failed");
                }
                RemoveSignatureResult::failed(&params, &e)
            });

        let response = serde_json::json!({ "results": [result] });
        serde_json::to_string_pretty(&response).unwrap_or_default()
    }
}

impl SignatureServer {
    /// Check the request carries a non-blank bucket and path
    fn validate_request(params: &RemoveSignatureParams) -> crate::error::Result<ObjectLocation> {
        fn required(value: &Option<String>, name: &'static str) -> crate::error::Result<String> {
            match value {
                Some(v) if !v.trim().is_empty() => Ok(v.clone()),
                _ => Err(Error::MissingParameter { name }),
            }
        }

        let bucket = required(&params.bucket, "bucket")?;
        let key = required(&params.path, "path")?;
        Ok(ObjectLocation::new(bucket, key))
    }

    /// Fetch, strip and store one PDF
    pub async fn process_remove_signature(
        &self,
        params: &RemoveSignatureParams,
    ) -> crate::error::Result<RemoveSignatureResult> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("remove_signature", %request_id);
        self.remove_signature_inner(params).instrument(span).await
    }

    async fn remove_signature_inner(
        &self,
        params: &RemoveSignatureParams,
    ) -> crate::error::Result<RemoveSignatureResult> {
        let location = Self::validate_request(params)?;
        tracing::info!(
            bucket = %location.bucket,
            path = %location.key,
            store = %self.store.describe(),
            "Request received"
        );

        let data = self.store.fetch(&location).await?;
        tracing::info!(bytes = data.len(), "Downloaded {}", location);
        ensure_pdf_header(&data)?;

        // Working copies are released when `workspace` drops, on every path out
        let workspace = Workspace::create(self.config.work_dir.as_deref(), location.file_name())?;
        workspace.write_input(&data).await?;
        drop(data);

        let (workspace, report) = spawn_strip(workspace, self.config.save_options())
            .await
            .map_err(|e| Error::Task {
                reason: format!("Task join error: {}", e),
            })?;
        let report = report?;

        let stripped = workspace.read_output().await?;
        let output_location = location.output();
        self.store.store(&output_location, stripped).await?;

        tracing::info!("Done, output: {}", output_location);

        Ok(RemoveSignatureResult {
            bucket: location.bucket,
            source: location.key,
            output: Some(output_location.key),
            removed_fields: report.removed_fields,
            removed_annotations: report.removed_annotations,
            sig_flags_cleared: report.sig_flags_cleared,
            page_count: report.page_count,
            error: None,
        })
    }
}

/// Strip the workspace input into its output on the blocking pool.
///
/// The task owns the workspace until it finishes, so an abandoned request
/// cannot unlink the working files while the stripper still writes to them.
fn spawn_strip(
    workspace: Workspace,
    options: SaveOptions,
) -> tokio::task::JoinHandle<(Workspace, crate::error::Result<StripReport>)> {
    tokio::task::spawn_blocking(move || {
        let report =
            SignatureStripper::strip_file(workspace.input_path(), workspace.output_path(), options);
        (workspace, report)
    })
}

#[tool_handler]
impl ServerHandler for SignatureServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "PDF signature stripper removes digital signatures from PDFs in object storage \
                 and stores the unsigned copy under a \"sem-certificado\" prefix."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server configured from the environment
pub async fn run_server() -> Result<()> {
    run_server_with_config(ServerConfig::from_env()?).await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    let server = SignatureServer::from_config(config)?;

    tracing::info!(
        store = %server.store.describe(),
        "PDF signature stripper ready, waiting for connections..."
    );

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}
