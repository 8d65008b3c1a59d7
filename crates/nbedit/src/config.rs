//! Engine settings supplied by whoever hosts the engine.

use nbformat::v4::{KernelSpec, LanguageInfo};
use nbformat::SourceStyle;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Kernel descriptor written into notebooks created from scratch.
    pub kernelspec: KernelSpec,
    /// Language descriptor written into notebooks created from scratch.
    pub language_info: LanguageInfo,
    /// How cell sources are fragmented when a notebook is persisted.
    pub source_style: SourceStyle,
}

impl Config {
    pub fn with_kernel(
        mut self,
        name: impl Into<String>,
        display_name: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        let language = language.into();
        self.kernelspec.name = name.into();
        self.kernelspec.display_name = display_name.into();
        self.kernelspec.language = Some(language.clone());
        self.language_info.name = language;
        self
    }

    pub fn with_source_style(mut self, source_style: SourceStyle) -> Self {
        self.source_style = source_style;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            kernelspec: KernelSpec::default(),
            language_info: LanguageInfo::default(),
            source_style: SourceStyle::Lines,
        }
    }
}
