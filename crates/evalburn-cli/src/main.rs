mod report;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use evalburn_core::{
    find_problem, load_problems, resolve_style, EvalConfig, OutputStyle, ProblemSpec, SessionLog,
};
use evalburn_harness::{EvaluationEvent, Evaluator, OllamaClient, ProblemRunner, PythonBackend};
use report::SessionFiles;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

type OllamaEvaluator = Evaluator<OllamaClient, PythonBackend>;

#[derive(Parser)]
#[command(name = "evalburn")]
#[command(about = "evalburn - LLM code generation evaluator", long_about = None)]
struct Cli {
    /// Problems file (overrides EVALBURN_PROBLEMS)
    #[arg(long, global = true)]
    problems: Option<PathBuf>,

    /// Ollama host URL (overrides OLLAMA_HOST)
    #[arg(long, global = true)]
    ollama_host: Option<String>,

    /// Directory for session logs and CSV reports (overrides EVALBURN_LOG_DIR)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available models
    Models,

    /// List output styles
    Styles,

    /// List problems from the problems file
    Problems,

    /// Evaluate a model against the problem set
    Run {
        /// Model index or name
        #[arg(short, long)]
        model: String,

        /// Output style index or name
        #[arg(short, long, default_value = "1")]
        style: String,

        /// Problem title to run; repeat to select several (default: all)
        #[arg(short, long)]
        problem: Vec<String>,

        /// Also save the summary report as CSV
        #[arg(long)]
        csv: bool,

        /// Also print the session totals as JSON
        #[arg(long)]
        json: bool,
    },
}

struct App {
    config: EvalConfig,
    client: OllamaClient,
    styles: Vec<OutputStyle>,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let mut config = EvalConfig::from_env()?;
        if let Some(host) = &cli.ollama_host {
            config.ollama.host = host.clone();
        }
        if let Some(path) = &cli.problems {
            config.session.problems_path = path.clone();
        }
        if let Some(dir) = &cli.log_dir {
            config.session.log_dir = dir.clone();
        }

        tracing::debug!("Resolved config: {:?}", config);
        let client = OllamaClient::from_config(&config.ollama)?;
        Ok(Self {
            config,
            client,
            styles: OutputStyle::builtin(),
        })
    }

    fn load_problems(&self) -> Result<Vec<ProblemSpec>> {
        let path = &self.config.session.problems_path;
        load_problems(path).with_context(|| format!("Failed to load problems from {}", path.display()))
    }

    fn evaluator(&self) -> OllamaEvaluator {
        let backend = PythonBackend::from_config(&self.config.execution);
        Evaluator::new(self.client.clone(), ProblemRunner::new(backend))
            .with_problem_delay(self.config.session.problem_delay())
    }

    fn session_files(&self) -> SessionFiles {
        SessionFiles::now(&self.config.session.log_dir)
    }

    fn resolve_style(&self, selector: &str) -> Result<&OutputStyle> {
        resolve_style(&self.styles, selector).with_context(|| {
            format!("Unknown style: {}. Use 1-{} or a style name", selector, self.styles.len())
        })
    }

    async fn resolve_model_id(&self, input: &str) -> Result<String> {
        if let Ok(index) = input.parse::<usize>() {
            let models = self.client.list_models().await?;
            if index == 0 || index > models.len() {
                anyhow::bail!("Invalid model index: {}. Use 1-{}", index, models.len());
            }
            return Ok(models[index - 1].id.clone());
        }
        Ok(input.to_string())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let app = App::new(&cli)?;

    match cli.command {
        Some(Commands::Models) => cmd_models(&app).await?,
        Some(Commands::Styles) => cmd_styles(&app),
        Some(Commands::Problems) => cmd_problems(&app)?,
        Some(Commands::Run {
            model,
            style,
            problem,
            csv,
            json,
        }) => cmd_run(&app, &model, &style, &problem, csv, json).await?,
        None => run_interactive(&app).await?,
    }

    Ok(())
}

async fn cmd_models(app: &App) -> Result<()> {
    let models = app.client.list_models().await?;

    println!();
    println!("Available Models:");
    println!("{:-<65}", "");
    println!("  {:<4} {:<40} {}", "#", "ID", "Quantization");
    println!("{:-<65}", "");
    for (i, m) in models.iter().enumerate() {
        let quant = m.quantization.as_deref().unwrap_or("-");
        println!("  {:<4} {:<40} {}", i + 1, m.id, quant);
    }
    println!();

    Ok(())
}

fn cmd_styles(app: &App) {
    println!();
    println!("Output Styles:");
    println!("{:-<65}", "");
    for (i, style) in app.styles.iter().enumerate() {
        println!("  {:<4} {}", i + 1, style.name);
    }
    println!();
}

fn cmd_problems(app: &App) -> Result<()> {
    let problems = app.load_problems()?;

    println!();
    println!("Problems ({}):", problems.len());
    println!("{:-<65}", "");
    for (i, p) in problems.iter().enumerate() {
        let mut flags = Vec::new();
        if p.inplace_modification {
            flags.push("in-place");
        }
        if p.output_is_tree {
            flags.push("tree output");
        }
        println!(
            "  {:<4} {:<40} {} cases {}",
            i + 1,
            p.title,
            p.test_cases.len(),
            flags.join(", ")
        );
    }
    println!();

    Ok(())
}

async fn cmd_run(
    app: &App,
    model: &str,
    style: &str,
    titles: &[String],
    csv: bool,
    json: bool,
) -> Result<()> {
    let all = app.load_problems()?;
    let selected: Vec<ProblemSpec> = match titles.is_empty() {
        true => all,
        false => titles
            .iter()
            .map(|t| find_problem(&all, t).cloned())
            .collect::<evalburn_core::Result<_>>()?,
    };

    let model = app.resolve_model_id(model).await?;
    let style = app.resolve_style(style)?.clone();
    let files = app.session_files();
    let evaluator = app.evaluator();
    let mut log = SessionLog::new();

    run_with_progress(&evaluator, &selected, &model, &style, &mut log).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&log.summary())?);
    }
    finish_session(&files, &log, csv)
}

/// Runs a batch while printing progress; Ctrl+C stops after the current problem.
async fn run_with_progress(
    evaluator: &OllamaEvaluator,
    problems: &[ProblemSpec],
    model: &str,
    style: &OutputStyle,
    log: &mut SessionLog,
) -> usize {
    if problems.is_empty() {
        println!("No problems selected.");
        return 0;
    }

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!();
            println!("  Cancelling after the current problem...");
            ctrl_c_token.cancel();
        }
    });

    let (tx, mut rx) = mpsc::channel(32);
    let run = async move {
        let ran = evaluator
            .run_batch(problems, model, style, log, &cancel, Some(&tx))
            .await;
        drop(tx);
        ran
    };
    let printer = async {
        while let Some(event) = rx.recv().await {
            print_event(&event);
        }
    };

    let (ran, ()) = tokio::join!(run, printer);
    ctrl_c.abort();
    ran
}

fn print_event(event: &EvaluationEvent) {
    match event {
        EvaluationEvent::Problem {
            current,
            total,
            title,
        } => {
            println!();
            println!("--- Running Problem [{}/{}]: {} ---", current, total, title);
        }
        EvaluationEvent::ProblemComplete { entry } => print!("{}", report::render_entry(entry)),
        EvaluationEvent::Cancelled => {
            println!();
            println!("Run cancelled.");
        }
        EvaluationEvent::Done { summary } => {
            println!();
            println!(
                "Run completed! {}/{} problems fully passed this session.",
                summary.fully_passed, summary.runs
            );
        }
    }
}

fn finish_session(files: &SessionFiles, log: &SessionLog, csv: bool) -> Result<()> {
    if log.is_empty() {
        println!("No actions were run, so no logs were created.");
        return Ok(());
    }

    println!();
    print!("{}", report::render_table(log.entries()));
    println!();
    print!("{}", report::render_summary(&log.summary()));
    println!();

    report::save_session_log(files, log.entries())
        .with_context(|| format!("Failed to write {}", files.log_path.display()))?;
    println!("Detailed session log saved to: {}", files.log_path.display());

    if csv {
        report::save_csv(files, log.entries())
            .with_context(|| format!("Failed to write {}", files.csv_path.display()))?;
        println!("Summary report saved as CSV to: {}", files.csv_path.display());
    }

    Ok(())
}

async fn run_interactive(app: &App) -> Result<()> {
    let problems = app.load_problems()?;
    let files = app.session_files();
    let evaluator = app.evaluator();
    let mut log = SessionLog::new();
    let mut model: Option<String> = None;
    let mut style = app.styles[0].clone();

    display_welcome();
    println!("  Loaded {} problems. Ollama host: {}", problems.len(), app.client.host());
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        println!(
            "Active Model: {}  |  Active Style: {}",
            model.as_deref().unwrap_or("(none)"),
            style.name
        );
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (cmd, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd.to_lowercase(), rest.trim()),
            None => (trimmed.to_lowercase(), ""),
        };

        match cmd.as_str() {
            "help" | "h" | "?" => display_help(),
            "models" | "m" => {
                if let Err(e) = cmd_models(app).await {
                    println!("Error: {}", e);
                }
            }
            "styles" => cmd_styles(app),
            "problems" | "p" => {
                if let Err(e) = cmd_problems(app) {
                    println!("Error: {}", e);
                }
            }
            "model" => match rest {
                "" => println!("Usage: model <#|name>"),
                input => match app.resolve_model_id(input).await {
                    Ok(id) => model = Some(id),
                    Err(e) => println!("Error: {}", e),
                },
            },
            "style" => match rest {
                "" => println!("Usage: style <#|name>"),
                input => match app.resolve_style(input) {
                    Ok(s) => style = s.clone(),
                    Err(e) => println!("Error: {}", e),
                },
            },
            "run" | "r" => match &model {
                Some(id) => {
                    run_with_progress(&evaluator, &problems, id, &style, &mut log).await;
                }
                None => println!("Select a model first: model <#|name>"),
            },
            "pick" => match (&model, rest) {
                (None, _) => println!("Select a model first: model <#|name>"),
                (Some(_), "") => println!("Usage: pick <problem title>"),
                (Some(id), title) => match find_problem(&problems, title) {
                    Ok(problem) => {
                        let picked = std::slice::from_ref(problem);
                        run_with_progress(&evaluator, picked, id, &style, &mut log).await;
                    }
                    Err(e) => println!("Error: {}", e),
                },
            },
            "report" => {
                if log.is_empty() {
                    println!("No results to display in the report.");
                } else {
                    println!();
                    print!("{}", report::render_table(log.entries()));
                    println!();
                }
            }
            "clear" | "cls" => {
                print!("\x1B[2J\x1B[1;1H");
                stdout.flush()?;
            }
            "exit" | "quit" | "q" => break,
            _ => {
                println!("Unknown command: {}. Type 'help' for available commands.", cmd);
            }
        }
    }

    println!();
    println!("--- Session Finished ---");
    let save_csv = match log.is_empty() {
        true => false,
        false => {
            print!("Save summary report as CSV? (y/N): ");
            stdout.flush()?;
            let mut confirm = String::new();
            stdin.lock().read_line(&mut confirm)?;
            confirm.trim().eq_ignore_ascii_case("y")
        }
    };
    finish_session(&files, &log, save_csv)?;
    println!("Goodbye!");

    Ok(())
}

fn display_welcome() {
    println!();
    println!("  evalburn - LLM Code Generation Evaluator");
    println!();
    println!("  model <#|name>         # Choose the model to evaluate");
    println!("  run                    # Run every problem");
    println!("  pick <title>           # Run one problem");
    println!("  help                   # Show all command options");
    println!("  quit                   # Show the report and save logs");
    println!();
}

fn display_help() {
    println!();
    println!("Available Commands:");
    println!("  models, m              List available Ollama models (with index numbers)");
    println!("  model <#|name>         Set the active model by index or name");
    println!("  styles                 List output styles");
    println!("  style <#|name>         Set the active output style");
    println!("  problems, p            List loaded problems");
    println!("  run, r                 Run all problems with the active model and style");
    println!("  pick <title>           Run a single problem by title");
    println!("  report                 Show the session report so far");
    println!("  clear, cls             Clear screen");
    println!("  help, h                Show this help message");
    println!("  exit, quit, q          Show the report, save logs and exit");
    println!();
    println!("Tip: Ctrl+C during a run stops after the current problem");
    println!();
}
