//! A minimal component hierarchy root.

use randforge::Named;

/// Top of a test hierarchy; its full name is its name.
#[derive(Debug, Clone)]
pub struct Env {
    name: String,
}

impl Env {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new("env")
    }
}

impl Named for Env {
    fn name(&self) -> &str {
        &self.name
    }

    fn full_name(&self) -> String {
        self.name.clone()
    }
}
