use serde::{Deserialize, Serialize};

use crate::error::{ResolveError, ERR_OPTIONS_JSON};

fn default_scope_blocks() -> Vec<String> {
    vec!["each".to_string(), "with".to_string()]
}

fn default_self_keyword() -> String {
    "this".to_string()
}

/// Resolver configuration. Every field has a default, so `{}` is a valid
/// options document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverOptions {
    /// Block helpers whose parameter becomes the typed context of the body.
    #[serde(default = "default_scope_blocks")]
    pub scope_blocks: Vec<String>,
    /// First-segment keyword naming the innermost block's bound field.
    #[serde(default = "default_self_keyword")]
    pub self_keyword: String,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            scope_blocks: default_scope_blocks(),
            self_keyword: default_self_keyword(),
        }
    }
}

impl ResolverOptions {
    pub fn from_json(json: &str) -> Result<Self, ResolveError> {
        serde_json::from_str(json).map_err(|e| {
            ResolveError::new(
                ERR_OPTIONS_JSON,
                &format!("options parse error: {}", e),
                e.line() as u32,
                e.column() as u32,
            )
        })
    }

    pub fn opens_scope(&self, block_name: &str) -> bool {
        self.scope_blocks.iter().any(|name| name == block_name)
    }
}
