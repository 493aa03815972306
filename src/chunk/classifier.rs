//! # Failure Classification
//!
//! Decides whether a raised [`ItemError`] belongs to the skippable, retryable
//! or no-rollback class of a chunk.
//!
//! An [`ExceptionClassifier`] holds ordered include and exclude sets of
//! failure type names. Matching is hierarchy-aware: the failure's lineage is
//! walked from its own type towards its most general ancestor and the first
//! name found in either set decides the outcome. An exclusion therefore
//! narrows an inclusion of one of its ancestors, and a failure whose lineage
//! touches neither set does not match.
//!
//! A [`FailurePolicy`] pairs an optional classifier with a limit and a
//! running count; it is what the runner consults before skipping.

use crate::config::ClassifierSpec;
use crate::error::{FailureType, ItemError};

/// Include/exclude filter over failure type names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionClassifier {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl ExceptionClassifier {
    pub fn new<S: Into<String>>(
        include: impl IntoIterator<Item = S>,
        exclude: impl IntoIterator<Item = S>,
    ) -> Self {
        let mut classifier = Self::default();
        for name in include {
            push_unique(&mut classifier.include, name.into());
        }
        for name in exclude {
            push_unique(&mut classifier.exclude, name.into());
        }
        classifier
    }

    pub fn included(&self) -> impl Iterator<Item = &str> {
        self.include.iter().map(String::as_str)
    }

    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.exclude.iter().map(String::as_str)
    }

    /// Does a failure of this type fall in the classifier's class set.
    ///
    /// The lineage is walked from the failure's own type outwards and the
    /// first name listed in either set decides, so an inclusion nearer to the
    /// failure wins over a more general exclusion. A name in both sets is
    /// excluded.
    pub fn matches(&self, failure_type: &FailureType) -> bool {
        for name in failure_type.lineage() {
            if self.exclude.iter().any(|e| e == name) {
                return false;
            }
            if self.include.iter().any(|i| i == name) {
                return true;
            }
        }
        false
    }

    pub fn matches_error(&self, error: &ItemError) -> bool {
        self.matches(error.failure_type())
    }
}

impl From<ClassifierSpec> for ExceptionClassifier {
    fn from(spec: ClassifierSpec) -> Self {
        Self::new(spec.include, spec.exclude)
    }
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}

/// Classifier plus limit plus running count for one failure policy (skip or retry)
#[derive(Debug, Clone, Default)]
pub struct FailurePolicy {
    classifier: Option<ExceptionClassifier>,
    limit: u32,
    count: u32,
}

impl FailurePolicy {
    /// `limit` of 0 means unlimited
    pub fn new(classifier: Option<ExceptionClassifier>, limit: u32) -> Self {
        Self {
            classifier,
            limit,
            count: 0,
        }
    }

    /// Continue counting from `count` already taken by an earlier execution
    pub fn resuming_from(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// True if the failure matches and the limit still has room.
    ///
    /// Without a classifier nothing is ever eligible.
    pub fn permits(&self, error: &ItemError) -> bool {
        let Some(classifier) = &self.classifier else {
            return false;
        };
        let under_limit = self.limit == 0 || self.count < self.limit;
        under_limit && classifier.matches_error(error)
    }

    pub fn record(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}
