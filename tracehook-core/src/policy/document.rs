//! Policy document loader
//!
//! Resolves the well-known document name under a base directory and reads it.
//! A missing document is the valid "instrumentation off" state and yields an
//! empty document; a document that exists but cannot be read or parsed is an
//! error, which the load boundary reports as "no policy produced".
//!
//! Parsing never expands entities or follows external references: any
//! `<!DOCTYPE>` is rejected outright, and there is no include processing.

use roxmltree::{Document, ParsingOptions};
use std::path::{Path, PathBuf};
use tracing::{error, trace};

use super::builder::PolicyBuilder;
use super::model::InstrumentationPolicy;
use crate::error::{PolicyError, Result};

/// File name of the policy document inside the base directory
pub const AGENT_DOCUMENT_NAME: &str = "AI-Agent.xml";

/// Limits applied while reading and parsing a policy document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Largest document accepted, in bytes
    pub max_document_bytes: u64,
    /// Largest number of tree nodes accepted
    pub max_nodes: u32,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_document_bytes: 4 * 1024 * 1024,
            max_nodes: 200_000,
        }
    }
}

/// Raw policy document text, or nothing when no document exists.
#[derive(Debug, Clone, Default)]
pub struct PolicyDocument {
    path: Option<PathBuf>,
    source: Option<String>,
    options: LoaderOptions,
}

impl PolicyDocument {
    /// The document of a base directory that has none
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wrap in-memory document text
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            path: None,
            source: Some(source.into()),
            options: LoaderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_none()
    }

    /// Where the document was read from, if it came from disk
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Parse the document text into a tree. `Ok(None)` for the empty document.
    pub fn parse(&self) -> Result<Option<Document<'_>>> {
        let Some(source) = self.source.as_deref() else {
            return Ok(None);
        };

        let mut options = ParsingOptions::default();
        options.allow_dtd = false;
        options.nodes_limit = self.options.max_nodes;
        let document = Document::parse_with_options(source, options)?;
        Ok(Some(document))
    }
}

/// Locates and reads the policy document under a base directory.
#[derive(Debug, Clone)]
pub struct PolicyDocumentLoader {
    base_dir: PathBuf,
    options: LoaderOptions,
}

impl PolicyDocumentLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            options: LoaderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn document_path(&self) -> PathBuf {
        self.base_dir.join(AGENT_DOCUMENT_NAME)
    }

    /// Read the document. A missing file yields [`PolicyDocument::empty`].
    pub fn read(&self) -> Result<PolicyDocument> {
        let path = self.document_path();

        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!("Did not find policy document in '{}'", path.display());
                return Ok(PolicyDocument::empty().with_options(self.options));
            }
            Err(source) => return Err(PolicyError::DocumentRead { path, source }),
        };

        trace!("Found policy document in '{}'", path.display());

        if metadata.len() > self.options.max_document_bytes {
            return Err(PolicyError::DocumentTooLarge {
                path,
                size: metadata.len(),
                limit: self.options.max_document_bytes,
            });
        }

        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(source) => return Err(PolicyError::DocumentRead { path, source }),
        };

        Ok(PolicyDocument {
            path: Some(path),
            source: Some(source),
            options: self.options,
        })
    }

    /// Read and resolve the document, returning any failure.
    pub fn try_load_policy(&self) -> Result<InstrumentationPolicy> {
        let document = self.read()?;
        PolicyBuilder::build_document(&document)
    }

    /// Read and resolve the document.
    ///
    /// `None` means no policy could be produced and custom instrumentation must
    /// be disabled. The failure is logged once here.
    pub fn load_policy(&self) -> Option<InstrumentationPolicy> {
        self.policy_or_disabled(self.try_load_policy())
    }

    fn policy_or_disabled(
        &self,
        result: Result<InstrumentationPolicy>,
    ) -> Option<InstrumentationPolicy> {
        match result {
            Ok(policy) => Some(policy),
            Err(e) => {
                error!(
                    "Exception parsing {}, custom instrumentation disabled: {}",
                    self.document_path().display(),
                    e
                );
                None
            }
        }
    }
}
