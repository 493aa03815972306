//! Shared fixtures for chunk runner integration tests: scripted artifacts,
//! a recording listener and proptest strategies.

#![allow(dead_code)]

pub mod artifacts;
pub mod listeners;
pub mod strategies;

pub use artifacts::*;
pub use listeners::*;

use batch_core::StepContext;
use std::sync::{Arc, Mutex};

/// Ordered log of artifact calls and listener hooks, shared across fixtures
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

pub fn step_context(step_name: &str) -> Arc<StepContext> {
    Arc::new(StepContext::new("integration_job", step_name))
}
