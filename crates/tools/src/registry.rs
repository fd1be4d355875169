//! Tool registry: explicit descriptors with typed input schemas, plus
//! directory discovery of declaratively-defined tools.
//!
//! Registration compiles each descriptor's JSON Schema once; dispatch is
//! a table lookup plus a schema-validated decode. The registry is built
//! once at worker startup and read-only afterwards.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use oats_domain::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handler trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Object-safe tool implementation.
///
/// `Ok` is the tool's stringified output; `Err` is a recoverable failure
/// message that becomes a `failure` observation, never a crash.
pub trait ToolHandler: Send + Sync {
    fn call(
        &self,
        params: Value,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<String, String>> + Send + '_>>;
}

/// Adapter so plain async closures can serve as handlers.
pub struct FnHandler<F>(pub F);

impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<String, String>> + Send + 'static,
{
    fn call(
        &self,
        params: Value,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<String, String>> + Send + '_>> {
        Box::pin((self.0)(params))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Descriptor
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Immutable record for one registered tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub version: String,
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub input_schema: Value,
    pub handler: Arc<dyn ToolHandler>,
}

/// A descriptor paired with its compiled parameter validator.
pub struct ToolEntry {
    pub descriptor: ToolDescriptor,
    validator: jsonschema::Validator,
}

impl ToolEntry {
    /// Validate raw parameters against the tool's schema.
    pub fn validate(&self, params: &Value) -> std::result::Result<(), String> {
        self.validator.validate(params).map_err(|e| e.to_string())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Registry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Errors from tool registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate tool: {0}")]
    DuplicateTool(String),

    #[error("invalid input schema for '{name}': {message}")]
    InvalidSchema { name: String, message: String },
}

/// Registry of tools available to one worker. Registration order is
/// preserved: `list()` returns tools in the order they were added.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<ToolEntry>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, compiling its schema. Fails on a duplicate name
    /// or a schema that does not compile.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> std::result::Result<(), RegistryError> {
        if self.index.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool(descriptor.name.clone()));
        }
        let validator = jsonschema::validator_for(&descriptor.input_schema).map_err(|e| {
            RegistryError::InvalidSchema {
                name: descriptor.name.clone(),
                message: e.to_string(),
            }
        })?;
        self.index
            .insert(descriptor.name.clone(), self.tools.len());
        self.tools.push(ToolEntry {
            descriptor,
            validator,
        });
        Ok(())
    }

    /// Look up a tool with its compiled validator.
    pub fn entry(&self, name: &str) -> Option<&ToolEntry> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Look up a tool's descriptor.
    pub fn lookup(&self, name: &str) -> Option<&ToolDescriptor> {
        self.entry(name).map(|e| &e.descriptor)
    }

    /// All descriptors in registration order.
    pub fn list(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|e| &e.descriptor)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Walk `root` for `*.toml` tool manifests and register each declared
    /// tool. Malformed manifests are logged and skipped; an unreadable
    /// root is an error (fatal at worker startup). Returns the number of
    /// tools registered.
    pub fn discover(&mut self, root: &Path) -> Result<usize> {
        let mut paths: Vec<_> = std::fs::read_dir(root)
            .map_err(|e| Error::Tool(format!("tool directory '{}': {e}", root.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        let mut registered = 0;
        for path in paths {
            match load_manifest(&path) {
                Ok(descriptor) => {
                    let name = descriptor.name.clone();
                    match self.register(descriptor) {
                        Ok(()) => {
                            tracing::info!(tool = %name, path = %path.display(), "tool discovered");
                            registered += 1;
                        }
                        Err(e) => {
                            tracing::warn!(path = %path.display(), error = %e, "skipping tool manifest");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping malformed tool manifest");
                }
            }
        }
        Ok(registered)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Manifest discovery
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A declarative tool definition on disk.
///
/// ```toml
/// name = "kubectl_describe"
/// version = "1.0.0"
/// description = "Describe a Kubernetes resource"
/// kind = "shell"
/// command = "kubectl describe {kind} {name} -n {namespace}"
///
/// [input_schema]
/// type = "object"
/// required = ["kind", "name", "namespace"]
/// [input_schema.properties.kind]
/// type = "string"
/// [input_schema.properties.name]
/// type = "string"
/// [input_schema.properties.namespace]
/// type = "string"
/// ```
#[derive(Debug, Deserialize)]
struct ToolManifest {
    name: String,
    #[serde(default = "default_version")]
    version: String,
    description: String,
    kind: ManifestKind,
    /// Shell command template; `{param}` placeholders are substituted
    /// with shell-quoted parameter values.
    command: Option<String>,
    input_schema: Value,
}

fn default_version() -> String {
    "0.0.0".into()
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ManifestKind {
    Shell,
}

fn load_manifest(path: &Path) -> Result<ToolDescriptor> {
    let raw = std::fs::read_to_string(path)?;
    let manifest: ToolManifest =
        toml::from_str(&raw).map_err(|e| Error::Tool(e.to_string()))?;

    let handler: Arc<dyn ToolHandler> = match manifest.kind {
        ManifestKind::Shell => {
            let template = manifest
                .command
                .ok_or_else(|| Error::Tool("shell tool requires a 'command' template".into()))?;
            Arc::new(TemplateShellHandler { template })
        }
    };

    Ok(ToolDescriptor {
        name: manifest.name,
        version: manifest.version,
        description: manifest.description,
        input_schema: manifest.input_schema,
        handler,
    })
}

/// Handler for discovered shell tools: renders the command template with
/// shell-quoted parameters and runs it.
struct TemplateShellHandler {
    template: String,
}

impl ToolHandler for TemplateShellHandler {
    fn call(
        &self,
        params: Value,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<String, String>> + Send + '_>> {
        let command = render_template(&self.template, &params);
        Box::pin(async move { crate::builtin::shell::run_command(&command).await })
    }
}

/// Substitute `{param}` placeholders with shell-single-quoted values.
/// Unknown placeholders are left untouched (schema validation should have
/// caught missing required params already).
pub(crate) fn render_template(template: &str, params: &Value) -> String {
    let mut rendered = template.to_owned();
    if let Some(map) = params.as_object() {
        for (key, value) in map {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            rendered = rendered.replace(&format!("{{{key}}}"), &shell_quote(&text));
        }
    }
    rendered
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
