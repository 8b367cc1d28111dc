//! Prompts for question/answer generation.
//!
//! The system instructions and the user-prompt template are configuration,
//! not logic: the record count and category split come from
//! [`crate::config::PromptPolicy`], and callers can replace the system prompt
//! through [`crate::config::DatasetConfig::system_prompt`].

use crate::config::PromptPolicy;
use std::fmt::Write;

/// Default system instructions sent with every generation request.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a specialized technical documentation analyzer. Follow these rules strictly:
1. NEVER create, modify, or combine code examples - use ONLY exact code snippets from the documentation.
2. Preserve code examples exactly as they appear in the source material, including comments and whitespace.
3. Keep the documentation's technical terminology and definitions.
4. Write questions that test understanding of the documented code examples and concepts.
5. Every answer must be directly verifiable against the source material.
Return ONLY a valid JSON array with no additional text or formatting."#;

/// Build the user prompt for one document.
///
/// `content` is the full extracted text; it is appended verbatim after the
/// instructions.
pub fn build_user_prompt(content: &str, policy: &PromptPolicy) -> String {
    let mut prompt = String::with_capacity(content.len() + 2048);

    prompt.push_str(
        "Analyze the provided technical documentation and generate question-answer pairs \
         that precisely reflect its content.\n\n",
    );
    prompt.push_str(
        "Critical rules:\n\
         - ONLY use code examples that appear verbatim in the documentation\n\
         - DO NOT create new code examples or modify existing ones\n\
         - If a concept has no code example in the documentation, do not provide one\n\n",
    );

    let _ = writeln!(
        prompt,
        "1. Generate {} question-answer pairs.",
        policy.pair_count
    );
    if !policy.categories.is_empty() {
        prompt.push_str("   Use the following distribution:\n");
        for category in &policy.categories {
            let _ = writeln!(prompt, "   - {}% {}", category.percent, category.label);
        }
    }

    prompt.push_str(
        "\n2. Code requirements:\n\
         - Copy code snippets exactly as they appear, with their original formatting and names\n\
         - Format code in answers as Markdown: ```language\\ncode\\n```\n\n\
         3. Answers must be detailed yet concise and use only information present in the documentation.\n\n",
    );

    prompt.push_str(
        "Output format: return a JSON array of objects with exactly two string keys, \
         \"question\" and \"answer\". Do not wrap the array in a Markdown code block \
         and do not add any explanation.\n\n",
    );

    prompt.push_str("Documentation content:\n");
    prompt.push_str(content);
    prompt
}
