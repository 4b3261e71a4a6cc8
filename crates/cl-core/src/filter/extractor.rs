//! Named field extractors used by filters.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::compiler::FilterSpec;
use super::error::FilterError;
use super::predicate::Filter;
use crate::value::Value;

/// Maps a (year, course, cohort) element to one field value.
pub type Extractor<Y, C, K> = Arc<dyn Fn(&Y, &C, Option<&K>) -> Value + Send + Sync>;

/// A table of named extractors with an optional default entry.
pub struct ExtractorTable<Y, C, K> {
    extractors: BTreeMap<String, Extractor<Y, C, K>>,
    default: Option<String>,
}

impl<Y, C, K> ExtractorTable<Y, C, K> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            extractors: BTreeMap::new(),
            default: None,
        }
    }

    /// Adds an extractor, replacing any existing one with the same name.
    pub fn with<F>(mut self, name: impl Into<String>, extractor: F) -> Self
    where
        F: Fn(&Y, &C, Option<&K>) -> Value + Send + Sync + 'static,
    {
        self.insert(name, extractor);
        self
    }

    /// Designates the extractor used when an expression names none.
    pub fn with_default(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    /// Adds an extractor, replacing any existing one with the same name.
    pub fn insert<F>(&mut self, name: impl Into<String>, extractor: F)
    where
        F: Fn(&Y, &C, Option<&K>) -> Value + Send + Sync + 'static,
    {
        self.extractors.insert(name.into(), Arc::new(extractor));
    }

    /// Returns the name of the default extractor, if one is designated.
    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Returns the extractor names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.extractors.keys().map(String::as_str)
    }

    /// Returns true if the table has no extractors.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Looks up an extractor by name, or the default when `name` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty, the name is unknown, or no
    /// name is given and there is no usable default.
    pub fn resolve(
        &self,
        name: Option<&str>,
    ) -> Result<(&str, &Extractor<Y, C, K>), FilterError> {
        if self.is_empty() {
            return Err(FilterError::NoExtractors);
        }
        let name = match name {
            Some(name) => name,
            None => self
                .default
                .as_deref()
                .ok_or(FilterError::NoDefaultExtractor)?,
        };
        self.extractors
            .get_key_value(name)
            .map(|(key, extractor)| (key.as_str(), extractor))
            .ok_or_else(|| FilterError::unknown_extractor(name))
    }

    /// Compiles an expression and binds it to the extractor it names.
    pub fn compile(&self, expression: &str) -> Result<Filter<Y, C, K>, FilterError> {
        let spec = FilterSpec::parse(expression, self)?;
        let (_, extractor) = self.resolve(spec.extractor.as_deref())?;
        Ok(Filter::new(spec, Arc::clone(extractor)))
    }

    /// Compiles every expression, failing on the first invalid one.
    pub fn compile_all<S: AsRef<str>>(
        &self,
        expressions: &[S],
    ) -> Result<Vec<Filter<Y, C, K>>, FilterError> {
        expressions.iter().map(|e| self.compile(e.as_ref())).collect()
    }
}

impl<Y, C, K> Default for ExtractorTable<Y, C, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Y, C, K> fmt::Debug for ExtractorTable<Y, C, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorTable")
            .field("extractors", &self.extractors.keys().collect::<Vec<_>>())
            .field("default", &self.default)
            .finish()
    }
}
