//! `{{INCLUDE:path}}` expansion.
//!
//! Directives outside fenced code blocks are replaced by the fully resolved
//! text of the referenced file. Paths are relative to the project root at
//! every depth and go through [`paths::resolve_include`]. Any failure aborts
//! the whole document; there is no partial output.

use crate::error::{AgentgenError, Result};
use crate::fence::{FenceScanner, LineKind};
use crate::paths;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

pub const DEFAULT_MAX_DEPTH: usize = 10;

static INCLUDE_RE: OnceLock<Regex> = OnceLock::new();

fn include_re() -> &'static Regex {
    INCLUDE_RE.get_or_init(|| Regex::new(r"\{\{INCLUDE:([^}]*)\}\}").unwrap())
}

/// True if `text` contains a directive outside any fenced block.
pub fn has_unresolved_includes(text: &str) -> bool {
    let mut scanner = FenceScanner::new();
    text.split_inclusive('\n')
        .any(|line| scanner.feed(line) == LineKind::Text && include_re().is_match(line))
}

#[derive(Debug, Clone)]
pub struct IncludeResolver<'a> {
    base: &'a Path,
    max_depth: usize,
}

impl<'a> IncludeResolver<'a> {
    pub fn new(base: &'a Path) -> Self {
        Self {
            base,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Resolve every eligible directive in `document`.
    pub fn resolve(&self, document: &str) -> Result<String> {
        self.resolve_at(document, 0, "<document>")
    }

    fn resolve_at(&self, document: &str, depth: usize, origin: &str) -> Result<String> {
        if depth > self.max_depth {
            return Err(AgentgenError::DepthExceeded {
                path: origin.to_string(),
                max: self.max_depth,
            });
        }

        let mut scanner = FenceScanner::new();
        let mut out = String::with_capacity(document.len());

        for line in document.split_inclusive('\n') {
            if scanner.feed(line) == LineKind::Verbatim || !line.contains("{{INCLUDE:") {
                out.push_str(line);
                continue;
            }
            self.expand_line(line, depth, &mut out)?;
        }
        Ok(out)
    }

    fn expand_line(&self, line: &str, depth: usize, out: &mut String) -> Result<()> {
        let mut last = 0;
        for caps in include_re().captures_iter(line) {
            let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&line[last..whole.start()]);

            let requested = target.as_str().trim();
            let path = paths::resolve_include(self.base, requested)?;
            let text = std::fs::read_to_string(&path)?;
            tracing::debug!(include = requested, depth = depth + 1, "expanding include");
            let resolved = self.resolve_at(&text, depth + 1, requested)?;
            out.push_str(&resolved);

            last = whole.end();
        }
        out.push_str(&line[last..]);
        Ok(())
    }
}
