//! System instruction sent as the first turn of every completion.

/// Base assistant instruction. Always sent verbatim.
pub const BASE_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Provide clear, concise, and helpful responses. \
Be friendly and professional in your interactions. If you're unsure about something, \
acknowledge the uncertainty rather than guessing.";

/// Heading that separates caller-supplied instructions from the base prompt.
pub const ADDITIONAL_INSTRUCTIONS_HEADING: &str = "Additional instructions:";

/// Build the system prompt, optionally extended with custom instructions.
///
/// Blank custom instructions are treated as absent.
pub fn create_system_prompt(custom_instructions: Option<&str>) -> String {
    match custom_instructions.map(str::trim).filter(|s| !s.is_empty()) {
        Some(extra) => format!("{BASE_SYSTEM_PROMPT}\n\n{ADDITIONAL_INSTRUCTIONS_HEADING} {extra}"),
        None => BASE_SYSTEM_PROMPT.to_string(),
    }
}
