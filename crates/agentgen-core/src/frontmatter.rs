//! Rewrites a resolved command document into an agent document.
//!
//! The original `---` header is dropped; only its `description` survives.
//! The new header is serialized from [`AgentFrontmatter`], whose field order
//! is the output order.

use crate::handoff::{Handoff, HandoffTable};
use crate::roles::{is_operational_role, RoleMetadata, ALL_ROLES};
use serde::Serialize;

pub const HEADER_DELIMITER: &str = "---";

/// Value of the `target` field.
pub const TARGET_SURFACE: &str = "chat";

/// Tools granted to operational role agents.
pub const OPERATIONAL_TOOLS: &[&str] = &[
    "Read",
    "Write",
    "Edit",
    "Grep",
    "Glob",
    "Bash",
    "mcp__backlog__*",
    "mcp__serena__*",
    "Skill",
];

/// Tools granted to legacy/utility namespace agents.
pub const UTILITY_TOOLS: &[&str] = &["Read", "Grep", "Glob", "Bash", "mcp__backlog__*"];

/// Commands that auto-load for their role. An editorial choice per role,
/// not derived from anything in the command documents.
pub const PRIMARY_COMMANDS: &[(&str, &[&str])] = &[
    ("pm", &["assess", "define"]),
    ("arch", &["design"]),
    ("dev", &["build"]),
    ("sec", &["scan"]),
    ("qa", &["test"]),
    ("ops", &["deploy"]),
];

pub fn is_primary_command(role: &str, command: &str) -> bool {
    PRIMARY_COMMANDS
        .iter()
        .any(|(r, cmds)| *r == role && cmds.contains(&command))
}

pub fn default_description(scope: &str, command: &str) -> String {
    format!("Run the {scope} {command} command")
}

// ---------------------------------------------------------------------------
// Header parsing
// ---------------------------------------------------------------------------

fn is_delimiter(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']) == HEADER_DELIMITER
}

/// Split `content` into `(header, body)`.
///
/// The header is the text between a leading `---` line and the next `---`
/// line. Without both delimiters the whole document is body.
pub fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let mut lines = content.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return (None, content);
    };
    if !is_delimiter(first) {
        return (None, content);
    }
    let header_start = first.len();
    let mut offset = header_start;
    for line in lines {
        if is_delimiter(line) {
            return (
                Some(&content[header_start..offset]),
                &content[offset + line.len()..],
            );
        }
        offset += line.len();
    }
    (None, content)
}

/// `description` from a header block, if present and non-empty.
pub fn extract_description(header: &str) -> Option<String> {
    let value = match serde_yaml::from_str::<serde_yaml::Value>(header) {
        Ok(serde_yaml::Value::Mapping(map)) => map
            .get("description")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        Ok(_) => None,
        // Templates sometimes carry placeholders that are not valid YAML.
        Err(_) => header.lines().find_map(|line| {
            line.strip_prefix("description:")
                .map(|v| v.trim().trim_matches(['"', '\'']).to_string())
        }),
    };
    value.filter(|d| !d.trim().is_empty())
}

// ---------------------------------------------------------------------------
// AgentFrontmatter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentFrontmatter {
    pub name: String,
    pub description: String,
    pub target: String,
    pub tools: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub visible_to_roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_load: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub handoffs: Vec<Handoff>,
}

impl AgentFrontmatter {
    pub fn to_header(&self) -> crate::Result<String> {
        let yaml = serde_yaml::to_string(self)?;
        Ok(format!("{HEADER_DELIMITER}\n{yaml}{HEADER_DELIMITER}\n"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentDocument {
    pub identity: String,
    pub frontmatter: AgentFrontmatter,
    pub header: String,
    pub body: String,
    /// The source header had no usable `description`.
    pub description_defaulted: bool,
}

impl AgentDocument {
    pub fn render(&self) -> String {
        format!("{}{}", self.header, self.body)
    }
}

// ---------------------------------------------------------------------------
// Transformer
// ---------------------------------------------------------------------------

pub struct Transformer<'a> {
    meta: &'a RoleMetadata,
    handoffs: &'a HandoffTable,
}

impl<'a> Transformer<'a> {
    pub fn new(meta: &'a RoleMetadata, handoffs: &'a HandoffTable) -> Self {
        Self { meta, handoffs }
    }

    pub fn transform(
        &self,
        resolved: &str,
        scope: &str,
        command: &str,
    ) -> crate::Result<AgentDocument> {
        let (header, body) = split_frontmatter(resolved);
        let identity = crate::source::identity(scope, command);

        let (description, description_defaulted) =
            match header.and_then(extract_description) {
                Some(d) => (d, false),
                None => {
                    tracing::warn!(agent = %identity, "missing description; using default");
                    (default_description(scope, command), true)
                }
            };

        let operational = is_operational_role(scope);
        let tools = if operational {
            OPERATIONAL_TOOLS
        } else {
            UTILITY_TOOLS
        };

        let frontmatter = AgentFrontmatter {
            name: identity.clone(),
            description,
            target: TARGET_SURFACE.to_string(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
            role: operational.then(|| scope.to_string()),
            visible_to_roles: if operational {
                vec![scope.to_string(), ALL_ROLES.to_string()]
            } else {
                Vec::new()
            },
            auto_load: (operational && is_primary_command(scope, command)).then_some(true),
            handoffs: self.handoffs.handoffs(scope, command, self.meta),
        };

        Ok(AgentDocument {
            identity,
            header: frontmatter.to_header()?,
            frontmatter,
            body: body.to_string(),
            description_defaulted,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn transform(doc: &str, scope: &str, command: &str) -> AgentDocument {
        let meta = RoleMetadata::empty();
        let table = HandoffTable::builtin();
        Transformer::new(&meta, &table)
            .transform(doc, scope, command)
            .unwrap()
    }

    fn parsed(doc: &AgentDocument) -> serde_yaml::Value {
        let (header, _) = split_frontmatter(&doc.header);
        serde_yaml::from_str(header.unwrap()).unwrap()
    }

    #[test]
    fn split_with_header() {
        let (h, b) = split_frontmatter("---\na: 1\n---\n\n# Body\n");
        assert_eq!(h, Some("a: 1\n"));
        assert_eq!(b, "\n# Body\n");
    }

    #[test]
    fn split_crlf_header() {
        let (h, b) = split_frontmatter("---\r\na: 1\r\n---\r\nbody");
        assert_eq!(h, Some("a: 1\r\n"));
        assert_eq!(b, "body");
    }

    #[test]
    fn split_without_header() {
        let (h, b) = split_frontmatter("# Just body\n---\n");
        assert!(h.is_none());
        assert_eq!(b, "# Just body\n---\n");
        let (h, b) = split_frontmatter("---\nunterminated\n");
        assert!(h.is_none());
        assert_eq!(b, "---\nunterminated\n");
    }

    #[test]
    fn description_lookup() {
        assert_eq!(
            extract_description("description: \"Assess readiness\"\n").as_deref(),
            Some("Assess readiness")
        );
        assert_eq!(extract_description("title: x\n"), None);
        assert_eq!(extract_description("description: \"\"\n"), None);
        assert_eq!(
            extract_description("description: Plan {{ARGS}}\nx: [\n").as_deref(),
            Some("Plan {{ARGS}}")
        );
    }

    #[test]
    fn minimal_role_command() {
        let doc = transform(
            "---\ndescription: \"Assess readiness\"\n---\n\n# Assess\n",
            "pm",
            "assess",
        );
        assert_eq!(doc.identity, "pm-assess");
        assert_eq!(doc.body, "\n# Assess\n");
        assert!(!doc.description_defaulted);

        let v = parsed(&doc);
        assert_eq!(v["name"].as_str(), Some("pm-assess"));
        assert_eq!(v["description"].as_str(), Some("Assess readiness"));
        assert_eq!(v["target"].as_str(), Some("chat"));
        assert_eq!(v["tools"].as_sequence().unwrap().len(), OPERATIONAL_TOOLS.len());
        assert_eq!(v["role"].as_str(), Some("pm"));
        assert_eq!(v["visible_to_roles"][1].as_str(), Some("all"));
        assert_eq!(v["auto_load"].as_bool(), Some(true));
        assert_eq!(v["handoffs"][0]["agent"].as_str(), Some("pm-define"));
    }

    #[test]
    fn legacy_command_uses_utility_tools_and_no_role_fields() {
        let doc = transform("---\ndescription: Spec it\n---\nbody\n", "flow", "specify");
        let v = parsed(&doc);
        assert_eq!(v["tools"].as_sequence().unwrap().len(), UTILITY_TOOLS.len());
        assert!(v.get("role").is_none());
        assert!(v.get("visible_to_roles").is_none());
        assert!(v.get("auto_load").is_none());
        assert_eq!(v["handoffs"].as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn non_primary_has_no_auto_load_and_terminal_has_no_handoffs() {
        let doc = transform("---\ndescription: Watch\n---\n", "ops", "monitor");
        let v = parsed(&doc);
        assert!(v.get("auto_load").is_none());
        assert!(v.get("handoffs").is_none());
        assert!(!doc.header.contains("handoffs"));
    }

    #[test]
    fn missing_description_uses_default() {
        let doc = transform("---\ntitle: no desc\n---\nbody\n", "dev", "debug");
        assert!(doc.description_defaulted);
        assert_eq!(doc.frontmatter.description, "Run the dev debug command");
    }

    #[test]
    fn no_header_keeps_whole_body() {
        let doc = transform("# Title\ntext\n", "qa", "test");
        assert!(doc.description_defaulted);
        assert_eq!(doc.body, "# Title\ntext\n");
    }

    #[test]
    fn header_field_order_is_stable() {
        let doc = transform("---\ndescription: d\n---\n", "pm", "assess");
        let keys: Vec<&str> = doc
            .header
            .lines()
            .filter(|l| !l.starts_with([' ', '-']) && l.contains(':'))
            .map(|l| l.split(':').next().unwrap())
            .collect();
        assert_eq!(
            keys,
            vec![
                "name",
                "description",
                "target",
                "tools",
                "role",
                "visible_to_roles",
                "auto_load",
                "handoffs"
            ]
        );
        assert!(doc.header.starts_with("---\n"));
        assert!(doc.header.ends_with("\n---\n"));
    }

    #[test]
    fn render_is_deterministic() {
        let src = "---\ndescription: d\n---\nbody\n";
        assert_eq!(
            transform(src, "arch", "design").render(),
            transform(src, "arch", "design").render()
        );
    }
}
