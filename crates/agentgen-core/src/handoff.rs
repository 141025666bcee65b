//! Suggested next actions ("handoffs") attached to generated agents.
//!
//! Pure data: two tables keyed by `(scope, command)`, one for legacy
//! namespaces and one for operational roles. Unknown pairs and terminal
//! commands both yield an empty list.

use crate::roles::{is_operational_role, RoleMetadata};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoffRule {
    pub label: &'static str,
    pub agent: &'static str,
    pub prompt: &'static str,
    pub send: bool,
}

/// A resolved handoff as it appears in generated frontmatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handoff {
    pub label: String,
    pub agent: String,
    pub prompt: String,
    pub send: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub priority_for_roles: Vec<String>,
}

// ---------------------------------------------------------------------------
// Helper macro for concise table rows
// ---------------------------------------------------------------------------

macro_rules! handoff {
    ($label:expr => $agent:expr, $prompt:expr) => {
        HandoffRule {
            label: $label,
            agent: $agent,
            prompt: $prompt,
            send: false,
        }
    };
    ($label:expr => $agent:expr, $prompt:expr, send) => {
        HandoffRule {
            label: $label,
            agent: $agent,
            prompt: $prompt,
            send: true,
        }
    };
}

pub type Row = ((&'static str, &'static str), &'static [HandoffRule]);

// ---------------------------------------------------------------------------
// Legacy namespace table
// ---------------------------------------------------------------------------

const LEGACY_ROWS: &[Row] = &[
    (
        ("flow", "assess"),
        &[handoff!("Specify Requirements" => "flow-specify",
            "Create the feature specification from the assessment above.")],
    ),
    (
        ("flow", "specify"),
        &[
            handoff!("Research Unknowns" => "flow-research",
                "Research the open questions raised by the specification."),
            handoff!("Plan Architecture" => "flow-plan",
                "Plan the technical architecture for the specification above."),
        ],
    ),
    (
        ("flow", "research"),
        &[handoff!("Plan Architecture" => "flow-plan",
            "Plan the architecture using the research findings above.")],
    ),
    (
        ("flow", "plan"),
        &[handoff!("Start Implementation" => "flow-implement",
            "Implement the tasks from the plan above.")],
    ),
    (
        ("flow", "implement"),
        &[handoff!("Validate Implementation" => "flow-validate",
            "Validate the implementation above against its acceptance criteria.")],
    ),
    (
        ("flow", "validate"),
        &[handoff!("Deploy to Operations" => "flow-operate",
            "Prepare deployment and operations for the validated change.")],
    ),
];

// ---------------------------------------------------------------------------
// Operational role table
// ---------------------------------------------------------------------------

const ROLE_ROWS: &[Row] = &[
    (
        ("pm", "assess"),
        &[handoff!("Define Requirements" => "pm-define",
            "Define the product requirements based on the assessment above.")],
    ),
    (
        ("pm", "define"),
        &[
            handoff!("Discover Unknowns" => "pm-discover",
                "Investigate the open questions in the requirements above."),
            handoff!("Design Architecture" => "arch-design",
                "Design the architecture for the requirements above."),
        ],
    ),
    (
        ("pm", "discover"),
        &[handoff!("Design Architecture" => "arch-design",
            "Design the architecture using the discovery findings above.")],
    ),
    (
        ("arch", "design"),
        &[
            handoff!("Record Decisions" => "arch-decide",
                "Record architecture decisions for the design above."),
            handoff!("Start Building" => "dev-build",
                "Implement the design above."),
        ],
    ),
    (
        ("arch", "decide"),
        &[handoff!("Start Building" => "dev-build",
            "Implement the design following the recorded decisions.")],
    ),
    (
        ("arch", "model"),
        &[handoff!("Start Building" => "dev-build",
            "Implement the modeled components.")],
    ),
    (
        ("dev", "build"),
        &[
            handoff!("Run Tests" => "qa-test",
                "Test the implementation above."),
            handoff!("Security Scan" => "sec-scan",
                "Scan the changes above for security issues."),
        ],
    ),
    (
        ("dev", "debug"),
        &[handoff!("Continue Building" => "dev-build",
            "Continue implementation with the fix above applied.")],
    ),
    (
        ("dev", "refactor"),
        &[handoff!("Run Tests" => "qa-test",
            "Verify the refactoring above preserves behavior.", send)],
    ),
    (
        ("sec", "scan"),
        &[handoff!("Triage Findings" => "sec-triage",
            "Triage the security findings above.")],
    ),
    (
        ("sec", "triage"),
        &[handoff!("Fix Findings" => "sec-fix",
            "Fix the triaged security findings above.")],
    ),
    (
        ("sec", "fix"),
        &[handoff!("Verify Fixes" => "qa-verify",
            "Verify the security fixes above.")],
    ),
    (
        ("qa", "test"),
        &[handoff!("Verify Release" => "qa-verify",
            "Verify the release candidate using the test results above.")],
    ),
    (
        ("qa", "verify"),
        &[handoff!("Deploy" => "ops-deploy",
            "Deploy the verified release.")],
    ),
    (
        ("qa", "review"),
        &[handoff!("Deploy" => "ops-deploy",
            "Deploy the reviewed release.")],
    ),
    (
        ("ops", "deploy"),
        &[handoff!("Monitor" => "ops-monitor",
            "Monitor the deployment above.", send)],
    ),
];

/// End-state commands. They never hand off.
pub const TERMINAL_COMMANDS: &[(&str, &str)] = &[
    ("flow", "operate"),
    ("ops", "monitor"),
    ("sec", "report"),
];

// ---------------------------------------------------------------------------
// HandoffTable
// ---------------------------------------------------------------------------

type Index = HashMap<&'static str, HashMap<&'static str, &'static [HandoffRule]>>;

#[derive(Debug, Clone)]
pub struct HandoffTable {
    legacy: Index,
    roles: Index,
}

fn index(rows: &'static [Row]) -> Index {
    let mut map: Index = HashMap::new();
    for ((scope, command), rules) in rows {
        map.entry(*scope).or_default().insert(*command, *rules);
    }
    map
}

impl Default for HandoffTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl HandoffTable {
    pub fn builtin() -> Self {
        Self::from_rows(LEGACY_ROWS, ROLE_ROWS)
    }

    pub fn from_rows(legacy: &'static [Row], roles: &'static [Row]) -> Self {
        Self {
            legacy: index(legacy),
            roles: index(roles),
        }
    }

    pub fn is_terminal(scope: &str, command: &str) -> bool {
        TERMINAL_COMMANDS
            .iter()
            .any(|(s, c)| *s == scope && *c == command)
    }

    /// Raw table rows for `(scope, command)`; empty for terminal or unknown pairs.
    pub fn rules(&self, scope: &str, command: &str) -> &'static [HandoffRule] {
        if Self::is_terminal(scope, command) {
            return &[];
        }
        let table = if is_operational_role(scope) {
            &self.roles
        } else {
            &self.legacy
        };
        table
            .get(scope)
            .and_then(|commands| commands.get(command))
            .copied()
            .unwrap_or(&[])
    }

    /// Resolved handoffs, annotated with the roles that own each target agent
    /// and ordered so the current role's own agents come first.
    pub fn handoffs(&self, scope: &str, command: &str, meta: &RoleMetadata) -> Vec<Handoff> {
        let mut out: Vec<Handoff> = self
            .rules(scope, command)
            .iter()
            .map(|rule| Handoff {
                label: rule.label.to_string(),
                agent: rule.agent.to_string(),
                prompt: rule.prompt.to_string(),
                send: rule.send,
                priority_for_roles: meta
                    .agent_role(rule.agent)
                    .map(|r| vec![r.to_string()])
                    .unwrap_or_default(),
            })
            .collect();

        let own = meta.agents_for_role(scope);
        if !own.is_empty() {
            out.sort_by_key(|h| own.iter().position(|a| *a == h.agent).unwrap_or(usize::MAX));
        }
        out
    }
}
