use tracing::info;
use webbrowser::Browser;

use crate::error::AccessError;

/// Where a key for the illustration service can be created
pub const KEY_SELECTION_URL: &str = "https://aistudio.google.com/app/apikey";
pub const BILLING_DOCS_URL: &str = "https://ai.google.dev/gemini-api/docs/billing";

/// Gate in front of the flow: the workout starts once a key is present or selected
pub trait KeyGate {
    fn has_key(&self) -> bool;
    fn select_key(&mut self) -> Result<(), AccessError>;
}

/// Looks for the key in an environment variable
#[derive(Debug, Clone)]
pub struct EnvKeyGate {
    var: String,
    selected: bool,
}

impl EnvKeyGate {
    pub fn new(var: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            selected: false,
        }
    }
}

impl KeyGate for EnvKeyGate {
    fn has_key(&self) -> bool {
        self.selected
            || std::env::var(&self.var)
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false)
    }

    /// Opens the key page and proceeds right away; the key is picked up from
    /// the environment on the next run.
    fn select_key(&mut self) -> Result<(), AccessError> {
        if !Browser::is_available() {
            return Err(AccessError::NoBrowser);
        }
        webbrowser::open(KEY_SELECTION_URL)?;
        info!(var = %self.var, "key selection opened");
        self.selected = true;
        Ok(())
    }
}

/// Always open; used when gating is switched off
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenGate;

impl KeyGate for OpenGate {
    fn has_key(&self) -> bool {
        true
    }

    fn select_key(&mut self) -> Result<(), AccessError> {
        Ok(())
    }
}
