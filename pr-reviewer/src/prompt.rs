//! Review prompt assembly.
//!
//! Section order is fixed: title, description, codebase context, diff, then the
//! list of requested review sections.

pub const NO_DESCRIPTION: &str = "No description provided";
pub const NO_CONTEXT: &str = "No specific context found";

const INSTRUCTIONS: &str = "Please provide:
1. **Walkthrough**: A file-by-file explanation of the changes.
2. **Sequence Diagram**: A Mermaid JS sequence diagram visualizing the flow of the changes (if applicable). Use ```mermaid ... ``` block. **IMPORTANT**: Ensure the Mermaid syntax is valid. Do not use special characters (like quotes, braces, parentheses) inside Note text or labels as it breaks rendering. Keep the diagram simple.
3. **Summary**: Brief overview.
4. **Strengths**: What's done well.
5. **Issues**: Bugs, security concerns, code smells.
6. **Suggestions**: Specific code improvements.
7. **Poem**: A short, creative poem summarizing the changes at the very end.

Format your response in markdown.";

/// Builds the review prompt. The diff is embedded verbatim inside a `diff` fence.
pub fn build_review_prompt(
    title: &str,
    description: Option<&str>,
    context: &[String],
    diff: &str,
) -> String {
    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(NO_DESCRIPTION);

    let context = if context.is_empty() {
        NO_CONTEXT.to_string()
    } else {
        context.join("\n\n")
    };

    format!(
        "You are an expert code reviewer. Analyze the following pull request and provide a detailed, constructive code review.

PR Title: {title}
PR Description: {description}

Context from Codebase:
{context}

Code Changes:
```diff
{diff}
```

{INSTRUCTIONS}"
    )
}

/// Retrieval query for a pull request: `title\ndescription`.
pub fn context_query(title: &str, description: Option<&str>) -> String {
    format!("{title}\n{}", description.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIFF: &str = "diff --git a/src/lib.rs b/src/lib.rs\n--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -1 +1 @@\n-fn a() {}\n+fn b() {}";

    #[test]
    fn placeholders_for_missing_description_and_context() {
        let prompt = build_review_prompt("Add feature", Some(""), &[], DIFF);
        assert!(prompt.contains("PR Title: Add feature"));
        assert!(prompt.contains("PR Description: No description provided"));
        assert!(prompt.contains("Context from Codebase:\nNo specific context found"));
        assert!(prompt.contains(&format!("```diff\n{DIFF}\n```")));
    }

    #[test]
    fn context_snippets_are_blank_line_separated_in_order() {
        let ctx = vec!["File: a.rs\n\nfn a()".to_string(), "File: b.rs\n\nfn b()".to_string()];
        let prompt = build_review_prompt("t", Some("Fixes #1"), &ctx, "d");
        assert!(prompt.contains("PR Description: Fixes #1"));
        assert!(prompt.contains("File: a.rs\n\nfn a()\n\nFile: b.rs\n\nfn b()"));
        assert!(!prompt.contains(NO_CONTEXT));
    }

    #[test]
    fn sections_appear_in_order() {
        let prompt = build_review_prompt("t", None, &[], "d");
        let order = [
            "PR Title:",
            "PR Description:",
            "Context from Codebase:",
            "```diff",
            "**Walkthrough**",
            "**Sequence Diagram**",
            "**Summary**",
            "**Strengths**",
            "**Issues**",
            "**Suggestions**",
            "**Poem**",
        ];
        let positions: Vec<usize> = order.iter().map(|s| prompt.find(s).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    }

    #[test]
    fn query_joins_title_and_description() {
        assert_eq!(context_query("Title", Some("Body")), "Title\nBody");
        assert_eq!(context_query("Title", None), "Title\n");
    }
}
