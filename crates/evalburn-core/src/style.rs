use serde::{Deserialize, Serialize};

/// Instruction suffix appended to every problem prompt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputStyle {
    pub name: String,
    pub template: String,
}

impl OutputStyle {
    pub fn new(name: &str, template: &str) -> Self {
        Self {
            name: name.to_string(),
            template: template.to_string(),
        }
    }

    pub fn builtin() -> Vec<OutputStyle> {
        vec![
            OutputStyle::new("Default (Unstructured)", ""),
            OutputStyle::new(
                "Code Only",
                "Provide only the complete Python code block inside a class `Solution`. Do not include any explanations, introductory text, or concluding remarks.",
            ),
            OutputStyle::new(
                "Code with Brief Explanation",
                "Provide the complete Python code block first. Afterwards, provide a brief explanation of the overall approach.",
            ),
            OutputStyle::new(
                "Code with Detailed Explanation",
                "Provide the complete Python code block first. Then, provide a detailed, step-by-step explanation of the algorithm, including its time and space complexity.",
            ),
        ]
    }
}

impl Default for OutputStyle {
    fn default() -> Self {
        OutputStyle::new("Default (Unstructured)", "")
    }
}

/// Pick a style by 1-based index or case-insensitive name.
pub fn resolve_style<'a>(styles: &'a [OutputStyle], selector: &str) -> Option<&'a OutputStyle> {
    if let Ok(index) = selector.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| styles.get(i));
    }
    styles
        .iter()
        .find(|s| s.name.eq_ignore_ascii_case(selector.trim()))
}
