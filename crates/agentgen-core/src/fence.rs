//! Code-fence tracking for the include resolver.
//!
//! Include directives inside fenced code blocks are documentation, not
//! directives. Command templates routinely show a fenced ```` ```markdown ````
//! example that itself contains ```` ```bash ```` blocks, so the scanner keeps
//! a nested depth: a fence with an info string opened inside a block is a
//! nested open, and bare fences close nested blocks before the outer one.

/// A fence line: run of at least three backticks, then an optional info string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceLine<'a> {
    pub len: usize,
    pub info: &'a str,
}

impl FenceLine<'_> {
    pub fn has_info(&self) -> bool {
        !self.info.is_empty()
    }
}

/// Parse `line` as a fence. Leading whitespace and the line terminator are ignored.
pub fn parse_fence(line: &str) -> Option<FenceLine<'_>> {
    let trimmed = line.trim_start();
    let len = trimmed.bytes().take_while(|b| *b == b'`').count();
    if len < 3 {
        return None;
    }
    Some(FenceLine {
        len,
        info: trimmed[len..].trim(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FenceState {
    #[default]
    Outside,
    Inside { marker_len: usize, nested: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Ordinary text outside any fence; eligible for include expansion.
    Text,
    /// A fence line or a line inside a block; copied verbatim.
    Verbatim,
}

/// Line-at-a-time fence state machine.
#[derive(Debug, Default)]
pub struct FenceScanner {
    state: FenceState,
}

impl FenceScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FenceState {
        self.state
    }

    pub fn in_code_block(&self) -> bool {
        matches!(self.state, FenceState::Inside { .. })
    }

    /// Advance over one line and classify it.
    pub fn feed(&mut self, line: &str) -> LineKind {
        let Some(fence) = parse_fence(line) else {
            return match self.state {
                FenceState::Outside => LineKind::Text,
                FenceState::Inside { .. } => LineKind::Verbatim,
            };
        };

        self.state = match self.state {
            FenceState::Outside => FenceState::Inside {
                marker_len: fence.len,
                nested: 0,
            },
            FenceState::Inside { marker_len, nested } if fence.has_info() => {
                FenceState::Inside {
                    marker_len,
                    nested: nested + 1,
                }
            }
            FenceState::Inside { marker_len, nested } if nested > 0 => FenceState::Inside {
                marker_len,
                nested: nested - 1,
            },
            FenceState::Inside { marker_len, .. } if fence.len >= marker_len => {
                FenceState::Outside
            }
            inside => inside,
        };
        LineKind::Verbatim
    }
}
