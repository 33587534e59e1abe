//! Rendering rules for extension node kinds

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ctree_ast::NodeId;
use tracing::warn;

use crate::{CodeGenerator, Result};

/// Renders one `Custom` node at the given indent level
pub type RenderFn = Arc<dyn Fn(&CodeGenerator<'_>, NodeId, usize) -> Result<String> + Send + Sync>;

#[derive(Clone)]
pub struct RenderRule {
    pub render: RenderFn,
    /// Whether the rendering already ends the statement (pragmas, blocks)
    pub self_terminating: bool,
}

/// Extension render rules keyed by custom kind name
#[derive(Clone, Default)]
pub struct RenderRules {
    rules: HashMap<String, RenderRule>,
}

impl RenderRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule for `kind`. Returns true if a rule was replaced.
    pub fn register<F>(&mut self, kind: impl Into<String>, self_terminating: bool, render: F) -> bool
    where
        F: Fn(&CodeGenerator<'_>, NodeId, usize) -> Result<String> + Send + Sync + 'static,
    {
        let kind = kind.into();
        let rule = RenderRule {
            render: Arc::new(render),
            self_terminating,
        };
        let replaced = self.rules.insert(kind.clone(), rule).is_some();
        if replaced {
            warn!(kind = %kind, "replacing existing render rule");
        }
        replaced
    }

    pub fn get(&self, kind: &str) -> Option<&RenderRule> {
        self.rules.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.rules.contains_key(kind)
    }
}

impl fmt::Debug for RenderRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("RenderRules").field("kinds", &kinds).finish()
    }
}
