//! Write-verb classification of tool names.

use serde::{Deserialize, Serialize};

/// A mutating verb recognised at the start of a tool name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteVerb {
    Create,
    Update,
    Delete,
    Void,
    Cancel,
    Extend,
    File,
    Generate,
    Import,
    Adjust,
    Record,
    Send,
    Approve,
    Reconcile,
}

impl WriteVerb {
    /// Every recognised verb.
    pub const ALL: [WriteVerb; 14] = [
        WriteVerb::Create,
        WriteVerb::Update,
        WriteVerb::Delete,
        WriteVerb::Void,
        WriteVerb::Cancel,
        WriteVerb::Extend,
        WriteVerb::File,
        WriteVerb::Generate,
        WriteVerb::Import,
        WriteVerb::Adjust,
        WriteVerb::Record,
        WriteVerb::Send,
        WriteVerb::Approve,
        WriteVerb::Reconcile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WriteVerb::Create => "create",
            WriteVerb::Update => "update",
            WriteVerb::Delete => "delete",
            WriteVerb::Void => "void",
            WriteVerb::Cancel => "cancel",
            WriteVerb::Extend => "extend",
            WriteVerb::File => "file",
            WriteVerb::Generate => "generate",
            WriteVerb::Import => "import",
            WriteVerb::Adjust => "adjust",
            WriteVerb::Record => "record",
            WriteVerb::Send => "send",
            WriteVerb::Approve => "approve",
            WriteVerb::Reconcile => "reconcile",
        }
    }

    /// Destructive verbs always carry an advisory warning.
    pub fn is_destructive(&self) -> bool {
        matches!(self, WriteVerb::Delete | WriteVerb::Void | WriteVerb::Cancel)
    }

    /// Classify a tool name.
    ///
    /// Namespaced names (`xero.create_invoice`, `books/void_invoice`) are
    /// classified by their last segment. The verb must be followed by a
    /// separator, an uppercase letter (camelCase) or the end of the name, so
    /// `files_list` and `recordings` are not writes.
    pub fn from_tool_name(name: &str) -> Option<WriteVerb> {
        let base = name.rsplit(['.', '/', ':']).next().unwrap_or(name).trim();

        WriteVerb::ALL.into_iter().find(|verb| {
            let verb_str = verb.as_str();
            let Some(head) = base.get(..verb_str.len()) else {
                return false;
            };
            if !head.eq_ignore_ascii_case(verb_str) {
                return false;
            }
            match base[verb_str.len()..].chars().next() {
                None => true,
                Some(c) => matches!(c, '_' | '-' | ' ') || c.is_ascii_uppercase(),
            }
        })
    }
}

impl std::fmt::Display for WriteVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether `name` is a state-changing tool.
pub fn is_write_tool(name: &str) -> bool {
    WriteVerb::from_tool_name(name).is_some()
}
