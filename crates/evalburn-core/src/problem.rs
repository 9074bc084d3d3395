use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tree::build_tree;
use crate::Value;

/// Parameter names whose list values are decoded into trees before a call.
const TREE_PARAM_NAMES: [&str; 3] = ["p", "q", "root"];

pub fn is_tree_param(name: &str) -> bool {
    name.contains("tree") || TREE_PARAM_NAMES.contains(&name)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TestCase {
    pub input: BTreeMap<String, Value>,
    pub output: Value,
}

impl TestCase {
    /// Keyword arguments for one invocation, with tree parameters decoded.
    pub fn prepared_input(&self) -> BTreeMap<String, Value> {
        self.input
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::List(items) if is_tree_param(name) => Value::Tree(build_tree(items)),
                    other => other.clone(),
                };
                (name.clone(), value)
            })
            .collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProblemSpec {
    pub title: String,
    pub prompt: String,
    pub method_name: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    /// The method mutates `nums` in place; its post-call value is the output.
    #[serde(default)]
    pub inplace_modification: bool,
    /// The method returns a tree that is compared in level-order form.
    #[serde(default)]
    pub output_is_tree: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tree_param_names() {
        assert!(is_tree_param("root"));
        assert!(is_tree_param("p"));
        assert!(is_tree_param("q"));
        assert!(is_tree_param("tree"));
        assert!(is_tree_param("subtree_root"));
        assert!(!is_tree_param("nums"));
        assert!(!is_tree_param("pq"));
        assert!(!is_tree_param("roots"));
    }

    #[test]
    fn test_prepared_input_decodes_only_tree_lists() {
        let case: TestCase = serde_json::from_value(json!({
            "input": {"root": [1, null, 2], "nums": [3, 1, 2], "p": 5, "target": 7},
            "output": true
        }))
        .unwrap();

        let args = case.prepared_input();
        let Value::Tree(Some(root)) = &args["root"] else {
            panic!("root should be decoded");
        };
        assert_eq!(root.node_count(), 2);
        assert_eq!(args["nums"], Value::from(json!([3, 1, 2])));
        assert_eq!(args["p"], Value::Int(5));
        assert_eq!(args["target"], Value::Int(7));
    }

    #[test]
    fn test_empty_tree_list_becomes_absent_tree() {
        let case: TestCase =
            serde_json::from_value(json!({"input": {"root": []}, "output": 0})).unwrap();
        assert!(matches!(case.prepared_input()["root"], Value::Tree(None)));
    }

    #[test]
    fn test_problem_flags_default_to_false() {
        let problem: ProblemSpec = serde_json::from_value(json!({
            "title": "Two Sum",
            "prompt": "Solve it",
            "method_name": "twoSum",
            "test_cases": [{"input": {"nums": [2, 7], "target": 9}, "output": [0, 1]}]
        }))
        .unwrap();
        assert!(!problem.inplace_modification);
        assert!(!problem.output_is_tree);
        assert_eq!(problem.test_cases.len(), 1);
    }
}
