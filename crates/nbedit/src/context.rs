use nbformat::v4::Notebook;
use nbformat::{serialize_notebook_with, NotebookError};

use crate::config::Config;

/// Everything an operation needs besides the notebook itself. Built once by
/// the host and passed by reference into every call; the engine keeps no
/// state of its own between calls.
#[derive(Debug, Clone, Default)]
pub struct EditContext {
    config: Config,
}

impl EditContext {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// An empty v4.4 notebook carrying the configured kernel and language.
    pub fn create_notebook(&self) -> Notebook {
        tracing::debug!(kernel = %self.config.kernelspec.name, "creating notebook");
        Notebook::new(
            self.config.kernelspec.clone(),
            self.config.language_info.clone(),
        )
    }

    /// Encode `notebook` using the configured source style.
    pub fn encode(&self, notebook: &Notebook) -> Result<String, NotebookError> {
        serialize_notebook_with(notebook, self.config.source_style)
    }
}
