use crate::domain::{SearchResult, Turn};

/// Inputs to [`assemble_prompt`]. `history` is expected oldest first and
/// already truncated to the window the caller wants to send.
pub struct PromptParts<'a> {
    pub instructions: &'a str,
    pub documents: &'a [SearchResult],
    pub history: &'a [Turn],
    pub message: &'a str,
    pub no_documents: &'a str,
}

/// Builds the single model input for a chat turn.
///
/// Sections always appear in the same order: instructions, context documents
/// in rank order, previous conversation, then the new message. The history
/// section is omitted when there is no history; the document section is
/// always present and falls back to `no_documents`.
pub fn assemble_prompt(parts: &PromptParts<'_>) -> String {
    let mut prompt = String::new();

    let instructions = parts.instructions.trim();
    if !instructions.is_empty() {
        prompt.push_str(instructions);
        prompt.push_str("\n\n");
    }

    prompt.push_str("Context documents:\n");
    prompt.push_str(&format_documents(parts.documents, parts.no_documents));
    prompt.push_str("\n\n");

    if !parts.history.is_empty() {
        let history = parts
            .history
            .iter()
            .map(|t| format!("{}: {}", t.role.as_str(), t.content))
            .collect::<Vec<_>>()
            .join("\n");
        prompt.push_str("Previous conversation:\n");
        prompt.push_str(&history);
        prompt.push_str("\n\n");
    }

    prompt.push_str("Current message from user: ");
    prompt.push_str(parts.message);
    prompt
}

/// Numbered `[n] text` blocks, shared with the judge prompt.
pub fn format_documents(documents: &[SearchResult], empty: &str) -> String {
    if documents.is_empty() {
        return empty.to_string();
    }
    documents
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] {}", i + 1, r.chunk.content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Substitutes `{name}` placeholders in one left-to-right scan. Substituted
/// values are never scanned again, so braces in user text stay literal.
pub fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let hit = values.iter().find(|(name, _)| {
            tail[1..]
                .strip_prefix(name)
                .is_some_and(|after| after.starts_with('}'))
        });
        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 2..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
