//! The host transcript's dynamic record shape, normalized into a single
//! tagged [`lcm_core::Role`] plus a canonicalized `content` string so
//! full-text search indexes every record uniformly (§9 "Dynamic
//! transcript shape -> tagged variants").
//!
//! Transcripts are JSON Lines; a line's position is its
//! `transcript_offset` (§4.E). One record per line with a `role`
//! discriminant, tolerant of the extra tool-use/tool-result subfields a
//! host transcript carries that a same-process message log never needs.

use serde::Deserialize;

use lcm_core::Role;

/// One line of the host transcript, deserialized loosely: every
/// role-specific subfield is optional so a single struct covers user,
/// assistant, system, tool_use, and tool_result records without an
/// internally-tagged enum that would reject an unrecognized shape.
#[derive(Debug, Deserialize)]
pub struct RawTranscriptRecord {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: Option<serde_json::Value>,
    #[serde(default)]
    pub tool_use_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Present on tool-result records that reference a file on disk —
    /// the dedup key for diverted blobs is `(path, sha256)` (§4.E, §9
    /// open question).
    #[serde(default)]
    pub path: Option<String>,
}

/// A record normalized into the shape `lcm-store` persists.
pub struct NormalizedRecord {
    pub role: Role,
    pub content: String,
    pub path: Option<String>,
}

impl RawTranscriptRecord {
    pub fn normalize(&self) -> NormalizedRecord {
        let role = str_to_role(&self.role);
        let content = match role {
            Role::ToolUse => {
                let name = self.tool_name.as_deref().unwrap_or("unknown");
                let input = self
                    .tool_input
                    .as_ref()
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                let body = self.content.as_deref().unwrap_or("");
                format!("[tool_use:{name}]\n{input}\n---\n{body}")
            }
            Role::ToolResult => {
                let status = self.status.as_deref().unwrap_or("ok");
                let body = self.content.as_deref().unwrap_or("");
                format!("[tool_result:{status}]\n{body}")
            }
            _ => self.content.clone().unwrap_or_default(),
        };
        NormalizedRecord {
            role,
            content,
            path: self.path.clone(),
        }
    }
}

fn str_to_role(s: &str) -> Role {
    match s {
        "user" => Role::User,
        "assistant" => Role::Assistant,
        "system" => Role::System,
        "tool_use" => Role::ToolUse,
        "tool_result" => Role::ToolResult,
        _ => Role::System,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_tool_use_into_a_structured_prefix() {
        let raw = RawTranscriptRecord {
            role: "tool_use".to_string(),
            content: Some("wrote the file".to_string()),
            tool_name: Some("Write".to_string()),
            tool_input: Some(serde_json::json!({"path": "src/lib.rs"})),
            tool_use_id: Some("abc".to_string()),
            status: None,
            path: None,
        };
        let norm = raw.normalize();
        assert!(norm.content.starts_with("[tool_use:Write]"));
        assert!(norm.content.contains("src/lib.rs"));
        assert!(norm.content.ends_with("wrote the file"));
    }

    #[test]
    fn flattens_tool_result_with_status() {
        let raw = RawTranscriptRecord {
            role: "tool_result".to_string(),
            content: Some("file contents".to_string()),
            tool_name: None,
            tool_input: None,
            tool_use_id: Some("abc".to_string()),
            status: Some("error".to_string()),
            path: None,
        };
        let norm = raw.normalize();
        assert_eq!(norm.content, "[tool_result:error]\nfile contents");
    }

    #[test]
    fn user_and_assistant_pass_content_through() {
        let raw = RawTranscriptRecord {
            role: "user".to_string(),
            content: Some("hello".to_string()),
            tool_name: None,
            tool_input: None,
            tool_use_id: None,
            status: None,
            path: None,
        };
        assert_eq!(raw.normalize().content, "hello");
    }

    #[test]
    fn unrecognized_role_falls_back_to_system() {
        let raw = RawTranscriptRecord {
            role: "weird".to_string(),
            content: Some("x".to_string()),
            tool_name: None,
            tool_input: None,
            tool_use_id: None,
            status: None,
            path: None,
        };
        assert!(matches!(raw.normalize().role, Role::System));
    }
}
