//! Runtime filters: a compiled [`FilterSpec`] bound to its extractor.

use std::fmt;
use std::sync::Arc;

use super::compiler::FilterSpec;
use super::extractor::Extractor;

/// A callable test over course elements
pub struct Filter<Y, C, K> {
    spec: FilterSpec,
    extractor: Extractor<Y, C, K>,
}

impl<Y, C, K> Filter<Y, C, K> {
    /// Bind a compiled spec to an extractor
    pub fn new(spec: FilterSpec, extractor: Extractor<Y, C, K>) -> Self {
        Self { spec, extractor }
    }

    /// The compiled specification
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Evaluate the filter against one element
    pub fn evaluate(&self, year: &Y, course: &C, cohort: Option<&K>) -> bool {
        let field = (self.extractor)(year, course, cohort);
        self.spec.test(&field)
    }

    /// Check that every filter accepts the element
    ///
    /// An empty filter list accepts everything.
    pub fn all(filters: &[Self], year: &Y, course: &C, cohort: Option<&K>) -> bool {
        filters.iter().all(|f| f.evaluate(year, course, cohort))
    }
}

impl<Y, C, K> Clone for Filter<Y, C, K> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            extractor: Arc::clone(&self.extractor),
        }
    }
}

impl<Y, C, K> fmt::Debug for Filter<Y, C, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("spec", &self.spec).finish()
    }
}
