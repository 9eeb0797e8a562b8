//! Prompt loading utilities
//!
//! Each prompt file is a markdown document with `Usage`, `System` and `Prompt`
//! sections. Prompts are embedded at compile time using `include_str!`.

use crate::{Error, Result};

// Embed prompt files at compile time
const CONVERT_TEST_MD: &str = include_str!("../../../../prompts/convert_test.md");
const FIX_TEST_MD: &str = include_str!("../../../../prompts/fix_test.md");

/// System instruction and user template of a single prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    /// Fixed system instruction.
    pub system: String,
    /// User message template with `{{name}}` placeholders.
    pub template: String,
}

impl PromptTemplate {
    /// Replaces every `{{name}}` placeholder with its value.
    ///
    /// The template is scanned once; substituted values are never re-scanned,
    /// so placeholder-like text inside a value is kept verbatim. Unknown
    /// placeholders are left as they are.
    #[must_use]
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut rendered = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find("{{") {
            rendered.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];
            let substitution = after_open.find("}}").and_then(|close| {
                let name = &after_open[..close];
                values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| (close, *value))
            });

            let Some((close, value)) = substitution else {
                rendered.push_str("{{");
                rest = after_open;
                continue;
            };
            rendered.push_str(value);
            rest = &after_open[close + 2..];
        }

        rendered.push_str(rest);
        rendered
    }
}

/// Loads a prompt by name
///
/// # Errors
/// Returns an error if the prompt name is unknown or a section cannot be extracted
pub fn load_prompt(name: &str) -> Result<PromptTemplate> {
    let content = match name {
        "convert_test" => CONVERT_TEST_MD,
        "fix_test" => FIX_TEST_MD,
        _ => return Err(Error::Other(format!("Unknown prompt: {name}"))),
    };

    Ok(PromptTemplate {
        system: extract_section(content, "System")?,
        template: extract_section(content, "Prompt")?,
    })
}

/// Extracts the body of a `## <section>` header, up to the next `## ` header
///
/// # Errors
/// Returns an error if the section cannot be found
fn extract_section(content: &str, section: &str) -> Result<String> {
    let header = format!("## {section}");
    let not_found = || Error::Other(format!("{section} section not found"));

    // The header must own its whole line, so `## Prompt` never matches `## Prompts`.
    let header_start = content
        .match_indices(&header)
        .map(|(index, _)| index)
        .find(|&index| {
            let at_line_start = index == 0 || content[..index].ends_with('\n');
            let rest = &content[index + header.len()..];
            let line_end = rest.find('\n').unwrap_or(rest.len());
            at_line_start && rest[..line_end].trim().is_empty()
        })
        .ok_or_else(not_found)?;

    let after_header = &content[header_start..];
    let body_start = after_header.find('\n').map_or(after_header.len(), |index| index + 1);
    let body = &after_header[body_start..];

    let body_end = body
        .match_indices("## ")
        .map(|(index, _)| index)
        .find(|&index| index == 0 || body[..index].ends_with('\n'))
        .unwrap_or(body.len());
    Ok(body[..body_end].trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_extract_sections() -> Result<()> {
        let markdown = r"# Test Prompt

## Usage

This is usage info.

## System

Be helpful.

## Prompt

Convert {{test}} please.
";

        assert_eq!(extract_section(markdown, "System")?, "Be helpful.");
        assert_eq!(extract_section(markdown, "Prompt")?, "Convert {{test}} please.");
        assert!(extract_section(markdown, "Missing").is_err());
        Ok(())
    }

    #[test]
    fn test_extract_sections_with_crlf() -> Result<()> {
        let markdown = "# Fix\r\n\r\n## Usage\r\n\r\nSent once.\r\n\r\n## System\r\n\r\nBe precise.\r\n\r\n## Prompt\r\n\r\nFix {{test}} now.\r\n";

        assert_eq!(extract_section(markdown, "System")?, "Be precise.");
        assert_eq!(extract_section(markdown, "Prompt")?, "Fix {{test}} now.");
        assert_eq!(extract_section(markdown, "Usage")?, "Sent once.");
        Ok(())
    }

    #[test]
    fn test_header_must_match_whole_line() -> Result<()> {
        let markdown = "## Prompts archive\n\nold\n\n## Prompt\n\nnew\n";
        assert_eq!(extract_section(markdown, "Prompt")?, "new");
        Ok(())
    }

    #[test]
    fn test_embedded_prompts_load() -> Result<()> {
        let convert = load_prompt("convert_test")?;
        assert!(convert.system.contains("Cypress"));
        assert!(convert.template.contains("{{test}}"));
        assert!(!convert.template.contains("## Usage"));

        let fix = load_prompt("fix_test")?;
        for placeholder in ["{{test}}", "{{message}}", "{{line}}", "{{column}}"] {
            assert!(fix.template.contains(placeholder), "missing {placeholder}");
        }
        Ok(())
    }

    #[test]
    fn test_unknown_prompt() {
        assert!(load_prompt("nope").is_err());
    }

    #[test]
    fn test_render_replaces_placeholders() {
        let template = PromptTemplate {
            system: String::new(),
            template: "Line {{line}}, column {{column}}: {{line}}".to_owned(),
        };
        assert_eq!(
            template.render(&[("line", "4"), ("column", "9")]),
            "Line 4, column 9: 4"
        );
    }

    #[test]
    fn test_render_keeps_placeholders_inside_values() {
        let template = PromptTemplate {
            system: String::new(),
            template: "{{test}}\n{{message}} at {{line}} {{unknown}}".to_owned(),
        };
        let body = "const tpl = `{{line}}:{{message}}`;";

        assert_eq!(
            template.render(&[("test", body), ("message", "boom {{test}}"), ("line", "4")]),
            "const tpl = `{{line}}:{{message}}`;\nboom {{test}} at 4 {{unknown}}"
        );
    }
}
