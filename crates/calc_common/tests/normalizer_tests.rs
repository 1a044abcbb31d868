//! Replies captured from real model runs, normalized end to end.

use calc_common::{normalize_reply, AnalysisRecord};

#[test]
fn test_plain_python_list() {
    let records = normalize_reply("[{'expr': '2 + 2', 'result': 4}]");
    assert_eq!(records, vec![AnalysisRecord::new("2 + 2", "4", false)]);
}

#[test]
fn test_assignments() {
    let reply = "[{'expr': 'x', 'result': 3, 'assign': True}, {'expr': 'y', 'result': 6, 'assign': True}]\n";
    assert_eq!(
        normalize_reply(reply),
        vec![
            AnalysisRecord::new("x", "3", true),
            AnalysisRecord::new("y", "6", true),
        ]
    );
}

#[test]
fn test_json_fenced_reply() {
    let reply = "```json\n[\n  {\"expr\": \"(3 + 5) * 2\", \"result\": 16}\n]\n```\n";
    assert_eq!(
        normalize_reply(reply),
        vec![AnalysisRecord::new("(3 + 5) * 2", "16", false)]
    );
}

#[test]
fn test_python_fenced_reply_with_float() {
    let reply = "```python\n[{'expr': '7 / 2', 'result': 3.5}]\n```";
    assert_eq!(normalize_reply(reply), vec![AnalysisRecord::new("7 / 2", "3.5", false)]);
}

#[test]
fn test_abstract_drawing_with_apostrophe() {
    let reply = r#"[{'expr': 'Heart', 'result': "Love's universal symbol"}]"#;
    assert_eq!(
        normalize_reply(reply),
        vec![AnalysisRecord::new("Heart", "Love's universal symbol", false)]
    );
}

#[test]
fn test_single_dictionary_reply() {
    let reply = "{'expr': 'Patriotism', 'result': 'A flag representing national pride'}";
    assert_eq!(
        normalize_reply(reply),
        vec![AnalysisRecord::new(
            "Patriotism",
            "A flag representing national pride",
            false
        )]
    );
}

#[test]
fn test_latex_backslashes_in_raw_strings() {
    let reply = r"[{'expr': r'\frac{1}{2} + \frac{1}{2}', 'result': 1}]";
    assert_eq!(
        normalize_reply(reply),
        vec![AnalysisRecord::new(r"\frac{1}{2} + \frac{1}{2}", "1", false)]
    );
}

#[test]
fn test_negative_and_tuple_results() {
    let reply = "[{'expr': '3 - 10', 'result': -7}, {'expr': 'roots of x^2 - 1', 'result': (1, -1)}]";
    assert_eq!(
        normalize_reply(reply),
        vec![
            AnalysisRecord::new("3 - 10", "-7", false),
            AnalysisRecord::new("roots of x^2 - 1", "[1,-1]", false),
        ]
    );
}

#[test]
fn test_prose_only_reply_is_empty() {
    assert!(normalize_reply("I'm sorry, the image appears to be empty.").is_empty());
}

#[test]
fn test_truncated_reply_is_empty() {
    assert!(normalize_reply("[{'expr': '2 + 2', 'result': 4}, {'expr': '3").is_empty());
}

#[test]
fn test_constant_words_in_descriptions_are_kept() {
    let reply = "[{'expr': 'Heart', 'result': 'True love'}, {'expr': 'Empty box', 'result': 'None', 'assign': False}]";
    assert_eq!(
        normalize_reply(reply),
        vec![
            AnalysisRecord::new("Heart", "True love", false),
            AnalysisRecord::new("Empty box", "None", false),
        ]
    );
}

#[test]
fn test_runaway_nesting_is_empty() {
    let reply = format!("```python\n{}\n```", "[".repeat(10_000));
    assert!(normalize_reply(&reply).is_empty());
}
