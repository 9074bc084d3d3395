// Domain modules
pub mod config;
pub mod error;
pub mod metrics;
pub mod problem;
pub mod problem_loader;
pub mod session;
pub mod style;
pub mod tree;
pub mod value;

pub use config::{EvalConfig, ExecutionConfig, OllamaConfig, SessionConfig};
pub use error::{EvalBurnError, Result};
pub use metrics::{EvalMetrics, EvalOutcome, NOT_MEASURED};
pub use problem::{is_tree_param, ProblemSpec, TestCase};
pub use problem_loader::{find_problem, load_problems};
pub use session::{GenerationStats, SessionLog, SessionLogEntry, SessionSummary};
pub use style::{resolve_style, OutputStyle};
pub use tree::{build_tree, tree_to_list, TreeNode};
pub use value::Value;
