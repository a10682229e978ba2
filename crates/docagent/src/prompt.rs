//! Prompt assembly for per-file generation calls.

use serde_json::Value;

/// Neutralizes chat-template control tokens in untrusted file text.
fn sanitize_for_prompt(text: &str) -> String {
    text.replace("<|", "< |")
        .replace("|>", "| >")
        .replace("<s>", "< s >")
        .replace("</s>", "< / s >")
        .replace("[INST]", "[ INST ]")
        .replace("[/INST]", "[ / INST ]")
        .replace("<<SYS>>", "< < SYS > >")
        .replace("<</SYS>>", "< < / SYS > >")
}

/// Builds the prompt sent for one file.
///
/// The agent configuration is embedded verbatim as pretty JSON, followed by
/// the file name and its content decoded as (lossy) UTF-8.
pub fn build_prompt(file_name: &str, content: &[u8], agent_config: &Value) -> String {
    let agent = serde_json::to_string_pretty(agent_config).unwrap_or_else(|_| agent_config.to_string());
    let text = String::from_utf8_lossy(content);

    format!(
        "Agent configuration:\n{agent}\n\nFile name: {name}\n\nFile content:\n{content}\n",
        agent = agent,
        name = sanitize_for_prompt(file_name),
        content = sanitize_for_prompt(&text),
    )
}
