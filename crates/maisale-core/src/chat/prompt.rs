//! Generation prompt rendering

use super::texts;
use super::TurnState;

/// Cue that marks where the assistant's answer starts
pub const ASSISTANT_CUE: &str = "assistant:";

/// Render the generation prompt for a turn.
///
/// Sections, in order and separated by a blank line: persona, retrieved
/// context (one document per line), the language/length instruction, then the
/// role-prefixed history ending with the assistant cue. Empty sections are
/// left out. Pure function of its inputs.
pub fn assemble_prompt(state: &TurnState, persona: &str) -> String {
    let mut sections: Vec<String> = Vec::with_capacity(4);

    let persona = persona.trim();
    if !persona.is_empty() {
        sections.push(persona.to_string());
    }

    if let Some(context) = state.retrieved_context.as_deref() {
        let docs: Vec<&str> = context
            .iter()
            .map(|r| r.document.as_str())
            .filter(|d| !d.trim().is_empty())
            .collect();
        if !docs.is_empty() {
            sections.push(format!("Context:\n{}", docs.join("\n")));
        }
    }

    sections.push(texts::response_instruction(state.language).to_string());

    let mut dialogue = String::new();
    for message in &state.history {
        dialogue.push_str(message.role.as_str());
        dialogue.push_str(": ");
        dialogue.push_str(&message.content);
        dialogue.push('\n');
    }
    dialogue.push_str(ASSISTANT_CUE);
    sections.push(dialogue);

    sections.join("\n\n")
}
