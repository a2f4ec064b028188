//! crates/gendoc_core/src/prompt.rs
//!
//! Renders the two fixed prompts sent alongside the code to the doc-builder.
//! Both builders are pure string assembly; the templates are configuration
//! constants, never user input.

const PROJECT_INFO_PROMPT: &str = r#"You are a documentation builder.
Analyze the code and user instructions, then output a JSON object with a 'project_info' field summarizing:
- Purpose
- Key modules/classes/functions
- Data models or entities
"#;

const UML_INSTRUCTIONS_PROMPT: &str = r#"You are a UML generation assistant.
Given the code and user instructions, output a JSON object with a 'uml_instructions' field describing which UML diagrams to generate (e.g., class, sequence, component) and key elements for each.
"#;

/// Renders the project-info prompt for the given code and instructions.
pub fn build_project_info_prompt(code: &str, instructions: &str) -> String {
    render(PROJECT_INFO_PROMPT, code, instructions)
}

/// Renders the UML-instructions prompt for the given code and instructions.
pub fn build_uml_instructions_prompt(code: &str, instructions: &str) -> String {
    render(UML_INSTRUCTIONS_PROMPT, code, instructions)
}

fn render(template: &str, code: &str, instructions: &str) -> String {
    format!("{template}\nCode:\n{code}\nInstructions:\n{instructions}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_are_deterministic() {
        let a = build_project_info_prompt("let x = 1;", "summarize it");
        let b = build_project_info_prompt("let x = 1;", "summarize it");
        assert_eq!(a, b);

        let c = build_uml_instructions_prompt("let x = 1;", "summarize it");
        let d = build_uml_instructions_prompt("let x = 1;", "summarize it");
        assert_eq!(c, d);
    }

    #[test]
    fn prompts_embed_code_and_instructions_verbatim() {
        let code = "class Order {}\nfunction ship() {}";
        let instructions = "focus on the shipping flow";
        for prompt in [
            build_project_info_prompt(code, instructions),
            build_uml_instructions_prompt(code, instructions),
        ] {
            assert!(prompt.contains(code));
            assert!(prompt.contains(instructions));
            assert!(prompt.contains("\nCode:\n"));
            assert!(prompt.contains("\nInstructions:\n"));
        }
    }

    #[test]
    fn templates_differ_between_the_two_prompts() {
        let a = build_project_info_prompt("", "");
        let b = build_uml_instructions_prompt("", "");
        assert_ne!(a, b);
        assert!(a.contains("project_info"));
        assert!(b.contains("uml_instructions"));
    }
}
