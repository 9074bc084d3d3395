use std::collections::HashSet;
use std::path::Path;

use crate::{EvalBurnError, ProblemSpec, Result};

/// Load the ordered problem list from a JSON array file.
pub fn load_problems(path: &Path) -> Result<Vec<ProblemSpec>> {
    let content = std::fs::read_to_string(path)?;
    let problems: Vec<ProblemSpec> = serde_json::from_str(&content)?;

    let mut seen = HashSet::new();
    for problem in &problems {
        if !seen.insert(problem.title.as_str()) {
            tracing::warn!("Duplicate problem title in {}: {}", path.display(), problem.title);
        }
    }

    tracing::info!("Loaded {} problems from {}", problems.len(), path.display());
    Ok(problems)
}

pub fn find_problem<'a>(problems: &'a [ProblemSpec], title: &str) -> Result<&'a ProblemSpec> {
    problems
        .iter()
        .find(|p| p.title == title)
        .ok_or_else(|| EvalBurnError::ProblemNotFound(title.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PROBLEMS: &str = r#"[
        {
            "title": "Sort Colors",
            "prompt": "Sort nums in place.",
            "method_name": "sortColors",
            "inplace_modification": true,
            "test_cases": [{"input": {"nums": [2, 0, 1]}, "output": [0, 1, 2]}]
        },
        {
            "title": "Invert Binary Tree",
            "prompt": "Invert the tree.",
            "method_name": "invertTree",
            "output_is_tree": true,
            "test_cases": [{"input": {"root": [2, 1, 3]}, "output": [2, 3, 1]}]
        }
    ]"#;

    #[test]
    fn test_load_and_find() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PROBLEMS.as_bytes()).unwrap();

        let problems = load_problems(file.path()).unwrap();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].inplace_modification);
        assert!(problems[1].output_is_tree);

        let found = find_problem(&problems, "Invert Binary Tree").unwrap();
        assert_eq!(found.method_name, "invertTree");
        assert!(matches!(
            find_problem(&problems, "Missing"),
            Err(EvalBurnError::ProblemNotFound(_))
        ));
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{not json").unwrap();
        assert!(matches!(load_problems(file.path()), Err(EvalBurnError::Json(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_problems(&dir.path().join("problems.json"));
        assert!(matches!(result, Err(EvalBurnError::Io(_))));
    }
}
