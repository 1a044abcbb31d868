//! Instruction prompt sent alongside the canvas image.

use indexmap::IndexMap;
use serde_json::Value;

const RULES: &str = "You are an AI that analyzes an image containing mathematical expressions, \
equations, graphs, or abstract drawings. Follow these rules:\n\n\
• Apply PEMDAS for math expressions.\n\
• Return answers ONLY as a Python list of dictionaries.\n\
• Use keys: 'expr', 'result', and optional 'assign' (boolean).\n\n\
Examples:\n\
[{'expr': '2 + 2', 'result': 4}]\n\
[{'expr': 'x', 'result': 5, 'assign': True}]\n\
[{'expr': 'x', 'result': 3, 'assign': True}, {'expr': 'y', 'result': 6, 'assign': True}]\n\n\
For abstract art or symbols, describe concept meaningfully:\n\
[{'expr': 'Patriotism', 'result': 'A flag representing national pride'}]\n\n";

const CLOSING: &str = "Do not use markdown or backticks — only raw list syntax.";

/// Build the full prompt, embedding the known variables as JSON.
pub fn build_prompt(dict_of_vars: &IndexMap<String, Value>) -> String {
    let vars = serde_json::to_string(dict_of_vars).unwrap_or_else(|_| "{}".to_string());
    format!(
        "{}Use these variable assignments if relevant: {}.\n{}",
        RULES, vars, CLOSING
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_embeds_vars_in_order() {
        let mut vars = IndexMap::new();
        vars.insert("y".to_string(), json!("6"));
        vars.insert("x".to_string(), json!("3"));
        let prompt = build_prompt(&vars);
        assert!(prompt.contains(r#"Use these variable assignments if relevant: {"y":"6","x":"3"}."#));
    }

    #[test]
    fn test_prompt_with_no_vars() {
        let prompt = build_prompt(&IndexMap::new());
        assert!(prompt.starts_with("You are an AI that analyzes an image"));
        assert!(prompt.contains("if relevant: {}."));
        assert!(prompt.ends_with("only raw list syntax."));
    }

    #[test]
    fn test_prompt_keeps_unicode_vars() {
        let mut vars = IndexMap::new();
        vars.insert("θ".to_string(), json!("π/2"));
        assert!(build_prompt(&vars).contains(r#"{"θ":"π/2"}"#));
    }

    #[test]
    fn test_prompt_describes_grammar() {
        let prompt = build_prompt(&IndexMap::new());
        assert!(prompt.contains("PEMDAS"));
        assert!(prompt.contains("'expr', 'result', and optional 'assign'"));
        assert!(prompt.contains("[{'expr': '2 + 2', 'result': 4}]"));
    }
}
