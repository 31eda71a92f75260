//! User profile model.
//!
//! A user document links one backend account to its profile and to the
//! ordered list of module names the user owns. Modules are not a remote
//! collection of their own.

use super::{null_as_default, require_text, AccountId, DocumentId, ValidationError};
use serde::{Deserialize, Serialize};

/// Profile document stored in the users collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Remote document id (not the account id).
    #[serde(skip)]
    pub id: DocumentId,
    #[serde(rename = "accountId")]
    pub account_id: AccountId,
    #[serde(deserialize_with = "null_as_default", default)]
    pub username: String,
    #[serde(deserialize_with = "null_as_default", default)]
    pub email: String,
    /// Module names in insertion order.
    #[serde(deserialize_with = "null_as_default", default)]
    pub modules: Vec<String>,
}

impl User {
    /// Returns whether the user already owns a module with this name.
    ///
    /// Comparison ignores surrounding whitespace but is case-sensitive, as
    /// module names are displayed verbatim.
    pub fn has_module(&self, name: &str) -> bool {
        let needle = name.trim();
        self.modules.iter().any(|module| module.trim() == needle)
    }

    /// Returns the module list with `name` appended.
    ///
    /// # Errors
    /// - `BlankField` when `name` is blank.
    /// - `DuplicateModule` when the user already owns `name`.
    pub fn with_module_added(&self, name: &str) -> Result<Vec<String>, ValidationError> {
        let name = require_text("module name", name)?;
        if self.has_module(&name) {
            return Err(ValidationError::DuplicateModule(name));
        }
        let mut modules = self.modules.clone();
        modules.push(name);
        Ok(modules)
    }
}
