use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::Value as JsonValue;
use strsim::levenshtein;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::conclusion::GatePolicy;
use crate::conditions::{
    evaluate, parse_offset, AttributeKind, ConditionError, ConditionSet, EvalContext,
};
use crate::config::{self, Config, Gate};
use crate::snapshot::Snapshot;

use super::exit_codes;
use super::output::{
    self, CheckData, ConditionData, EvalData, JsonRpcError, OutputMode, SubjectData, VerifyData,
};

/// maximum edit distance for rule name suggestions
const RULE_SUGGESTION_THRESHOLD: usize = 3;

#[derive(Parser)]
#[command(name = "mergegate")]
#[command(about = "Evaluate merge rule conditions against pull request snapshots")]
#[command(version)]
pub struct Cli {
    /// Path to config file (overrides MERGEGATE_CONFIG env var and default location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (auto-enabled when stdout is piped)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Force text output even when stdout is piped
    #[arg(long, global = true, conflicts_with = "json")]
    pub no_json: bool,

    /// Suppress all output on success (errors still go to stderr)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log more (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a rule against pull request snapshots and print the gate conclusion
    Eval {
        /// JSON file holding a snapshot object or an array of them ("-" reads stdin)
        #[arg(short, long)]
        subjects: String,

        /// Rule name from the config file
        #[arg(short, long, required_unless_present = "condition")]
        rule: Option<String>,

        /// Condition expression or JSON group (repeatable), instead of a configured rule
        #[arg(
            short = 'c',
            long = "condition",
            action = ArgAction::Append,
            allow_hyphen_values = true,
            conflicts_with = "rule"
        )]
        condition: Vec<String>,

        /// Evaluation moment in RFC 3339 (defaults to the current time)
        #[arg(long)]
        now: Option<String>,

        /// UTC offset for clock conditions (defaults to settings.utc_offset)
        #[arg(long, allow_hyphen_values = true)]
        utc_offset: Option<String>,

        /// Gate policy (defaults to the rule's gate, merge for -c)
        #[arg(long, value_enum)]
        policy: Option<Gate>,

        /// Render per pull request lines for attributes that differ between them
        #[arg(long)]
        queue_summary: bool,
    },

    /// Parse condition expressions and report errors
    Check {
        /// Condition expressions or JSON groups
        #[arg(required = true, allow_hyphen_values = true)]
        expressions: Vec<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show config file path
    Path,
    /// Show default configuration with example rules
    Default,
    /// Verify configuration file for errors
    Verify,
}

/// a command error carrying its exit code
struct Failure {
    code: i32,
    message: String,
    suggestions: Vec<String>,
    details: Vec<String>,
}

impl Failure {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            suggestions: Vec::new(),
            details: Vec::new(),
        }
    }

    fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }
}

impl From<ConditionError> for Failure {
    fn from(e: ConditionError) -> Self {
        let code = if e.is_unsupported_combination() {
            exit_codes::UNSUPPORTED_COMBINATION
        } else {
            exit_codes::CONFIG_ERROR
        };
        let suggestions = e.suggestions().to_vec();
        Failure::new(code, e.to_string()).with_suggestions(suggestions)
    }
}

/// print a failure in the current output mode and return its exit code
fn report(mode: OutputMode, failure: Failure) -> i32 {
    if mode.is_json() {
        let error = if !failure.details.is_empty() {
            JsonRpcError::with_details(failure.code, &failure.message, failure.details)
        } else {
            JsonRpcError::with_suggestions(failure.code, &failure.message, failure.suggestions)
        };
        output::print_json_error(&error);
    } else {
        eprintln!("error: {}", failure.message);
        if let Some(s) = failure.suggestions.first() {
            eprintln!("  did you mean `{}`?", s);
        }
        for detail in &failure.details {
            eprintln!("  - {}", detail);
        }
    }
    failure.code
}

/// run the parsed command and return the process exit code
pub fn execute(cli: Cli) -> Result<i32> {
    let config_path = cli.config.as_deref();
    let output_mode = OutputMode::from_flags(cli.json, cli.no_json, cli.quiet);

    let outcome = match cli.command {
        Commands::Eval {
            subjects,
            rule,
            condition,
            now,
            utc_offset,
            policy,
            queue_summary,
        } => {
            let request = EvalRequest {
                subjects,
                rule,
                conditions: condition,
                now,
                utc_offset,
                policy,
                queue_summary,
            };
            run_eval(request, config_path, output_mode)
        }
        Commands::Check { expressions } => run_check(&expressions, output_mode),
        Commands::Config { command } => run_config(command, config_path, output_mode)?,
    };

    Ok(match outcome {
        Ok(code) => code,
        Err(failure) => report(output_mode, failure),
    })
}

// ============================================================================
// eval
// ============================================================================

struct EvalRequest {
    subjects: String,
    rule: Option<String>,
    conditions: Vec<String>,
    now: Option<String>,
    utc_offset: Option<String>,
    policy: Option<Gate>,
    queue_summary: bool,
}

fn run_eval(
    request: EvalRequest,
    config_path: Option<&Path>,
    mode: OutputMode,
) -> Result<i32, Failure> {
    let config = config::load_with_override(config_path)
        .map_err(|e| Failure::new(exit_codes::CONFIG_ERROR, format!("{:#}", e)))?;

    let (set, default_policy) = match &request.rule {
        Some(name) => {
            let rule = config.find_rule(name).ok_or_else(|| {
                Failure::new(
                    exit_codes::INVALID_ARGS,
                    format!("no rule named `{}` in the config", name),
                )
                .with_suggestions(suggest_rules(&config, name))
            })?;
            let set = rule.build().map_err(|e| {
                let mut failure = Failure::from(e);
                failure.message = format!("rule `{}`: {}", rule.name, failure.message);
                failure
            })?;
            (set, rule.policy())
        }
        None => {
            let inputs = expressions_to_json(&request.conditions)?;
            (ConditionSet::build(&inputs)?, GatePolicy::merge())
        }
    };

    let policy = request.policy.map(Gate::policy).unwrap_or(default_policy);
    let offset = resolve_offset(request.utc_offset.as_deref(), &config)?;
    let now = resolve_now(request.now.as_deref())?;
    let subjects = load_subjects(&request.subjects)?;

    let context = EvalContext::new(now).with_offset(offset);
    let evaluation = evaluate(&set, &subjects, &context);
    let conclusion = evaluation.conclusion(policy);
    log::debug!("batch of {} concluded {}", subjects.len(), conclusion);

    let summary = if request.queue_summary {
        evaluation.queue_summary()
    } else {
        evaluation.summary()
    };

    match mode {
        OutputMode::Json => {
            let subject_data = subjects
                .iter()
                .zip(evaluation.subject_results())
                .zip(evaluation.subject_conclusions(policy))
                .map(|((s, match_result), conclusion)| SubjectData {
                    label: s.label(),
                    match_result,
                    conclusion,
                })
                .collect();
            output::print_json(&EvalData {
                rule: request.rule.clone(),
                policy,
                now: context.now.to_rfc3339(),
                conclusion,
                match_result: evaluation.match_result(),
                subjects: subject_data,
                summary,
            });
        }
        OutputMode::Text => {
            print!("{}", summary);
            if !summary.is_empty() {
                println!();
            }
            println!("Conclusion: {}", conclusion);
        }
        OutputMode::Quiet => {}
    }

    Ok(exit_codes::for_conclusion(conclusion))
}

/// `-c` values: plain strings, or JSON objects for `or`/`and` groups
fn expressions_to_json(expressions: &[String]) -> Result<Vec<JsonValue>, Failure> {
    expressions
        .iter()
        .map(|e| {
            if e.trim_start().starts_with('{') {
                serde_json::from_str(e).map_err(|err| {
                    Failure::new(
                        exit_codes::INVALID_ARGS,
                        format!("invalid JSON group `{}`: {}", e, err),
                    )
                })
            } else {
                Ok(JsonValue::String(e.clone()))
            }
        })
        .collect()
}

fn suggest_rules(config: &Config, name: &str) -> Vec<String> {
    let mut candidates: Vec<_> = config
        .rules
        .iter()
        .map(|r| (levenshtein(name, &r.name), r.name.clone()))
        .filter(|(distance, _)| *distance <= RULE_SUGGESTION_THRESHOLD)
        .collect();
    candidates.sort();
    candidates.into_iter().map(|(_, n)| n).collect()
}

fn resolve_offset(flag: Option<&str>, config: &Config) -> Result<FixedOffset, Failure> {
    match flag {
        Some(s) => parse_offset(s).ok_or_else(|| {
            Failure::new(
                exit_codes::INVALID_ARGS,
                format!("invalid --utc-offset '{}': use UTC or ±HH:MM", s),
            )
        }),
        None => config.settings.offset().ok_or_else(|| {
            Failure::new(
                exit_codes::CONFIG_ERROR,
                format!(
                    "invalid settings.utc_offset '{}': use UTC or ±HH:MM",
                    config.settings.utc_offset
                ),
            )
        }),
    }
}

/// the only place the wall clock is read
fn resolve_now(flag: Option<&str>) -> Result<DateTime<Utc>, Failure> {
    match flag {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| {
                Failure::new(
                    exit_codes::INVALID_ARGS,
                    format!("invalid --now '{}': {}", s, e),
                )
            }),
        None => Ok(Utc::now()),
    }
}

fn load_subjects(source: &str) -> Result<Vec<Snapshot>, Failure> {
    let content = read_source(source)
        .map_err(|e| Failure::new(exit_codes::INVALID_ARGS, format!("{:#}", e)))?;

    let json: JsonValue = serde_json::from_str(&content).map_err(|e| {
        Failure::new(
            exit_codes::INVALID_ARGS,
            format!("invalid subjects JSON in {}: {}", source, e),
        )
    })?;

    let items = match json {
        JsonValue::Array(items) => items,
        single => vec![single],
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let mut snapshot = Snapshot::from_json(item).map_err(|e| {
                Failure::new(exit_codes::INVALID_ARGS, format!("subjects[{}]: {}", i, e))
            })?;
            snapshot.sync_checks();
            Ok(snapshot)
        })
        .collect()
}

fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read subjects from stdin")?;
        return Ok(content);
    }
    fs::read_to_string(source).with_context(|| format!("Failed to read subjects file: {}", source))
}

// ============================================================================
// check
// ============================================================================

fn run_check(expressions: &[String], mode: OutputMode) -> Result<i32, Failure> {
    let inputs = expressions_to_json(expressions)?;
    let set = ConditionSet::build(&inputs)?;

    let conditions: Vec<ConditionData> = set
        .atoms()
        .into_iter()
        .map(|atom| ConditionData {
            raw: atom.raw.clone(),
            attribute: atom.attribute.clone(),
            kind: AttributeKind::of(&atom.attribute)
                .map(|k| k.to_string())
                .unwrap_or_default(),
            operator: atom.operator.to_string(),
            negated: atom.negated,
            length: atom.length,
        })
        .collect();

    match mode {
        OutputMode::Json => output::print_json(&CheckData {
            valid: true,
            conditions,
        }),
        OutputMode::Text => {
            println!("✓ {} condition(s) valid", conditions.len());
            for c in &conditions {
                let mut notes = vec![c.kind.clone()];
                if c.negated {
                    notes.push("negated".to_string());
                }
                if c.length {
                    notes.push("length".to_string());
                }
                println!("  - `{}`: {} {} ({})", c.raw, c.attribute, c.operator, notes.join(", "));
            }
        }
        OutputMode::Quiet => {}
    }

    Ok(exit_codes::SUCCESS)
}

// ============================================================================
// config
// ============================================================================

fn run_config(
    command: ConfigCommands,
    config_path: Option<&Path>,
    mode: OutputMode,
) -> Result<Result<i32, Failure>> {
    match command {
        ConfigCommands::Show => {
            let config = match config::load_with_override(config_path) {
                Ok(config) => config,
                Err(e) => {
                    return Ok(Err(Failure::new(exit_codes::CONFIG_ERROR, format!("{:#}", e))))
                }
            };
            print_config(&config, mode)?;
            Ok(Ok(exit_codes::SUCCESS))
        }
        ConfigCommands::Path => {
            let path = config::get_config_path_with_override(config_path)?;
            match mode {
                OutputMode::Json => output::print_json(&path.display().to_string()),
                OutputMode::Text => println!("{}", path.display()),
                OutputMode::Quiet => {}
            }
            Ok(Ok(exit_codes::SUCCESS))
        }
        ConfigCommands::Default => {
            print_config(&config::default_with_examples(), mode)?;
            Ok(Ok(exit_codes::SUCCESS))
        }
        ConfigCommands::Verify => {
            let path = config::get_config_path_with_override(config_path)?;
            let errors = match config::verify(&path) {
                Ok(errors) => errors,
                Err(e) => {
                    return Ok(Err(Failure::new(exit_codes::CONFIG_ERROR, format!("{:#}", e))))
                }
            };

            if !errors.is_empty() {
                let message = format!(
                    "configuration has {} error(s): {}",
                    errors.len(),
                    path.display()
                );
                return Ok(Err(Failure::new(exit_codes::CONFIG_ERROR, message).with_details(errors)));
            }

            match mode {
                OutputMode::Json => {
                    let rules = config::load_with_override(Some(&path))?.rules.len();
                    output::print_json(&VerifyData {
                        path: path.display().to_string(),
                        valid: true,
                        rules,
                    });
                }
                OutputMode::Text => println!("✓ Configuration is valid: {}", path.display()),
                OutputMode::Quiet => {}
            }
            Ok(Ok(exit_codes::SUCCESS))
        }
    }
}

fn print_config(config: &Config, mode: OutputMode) -> Result<()> {
    match mode {
        OutputMode::Json => output::print_json(config),
        OutputMode::Text => {
            let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
            println!("{}", json);
        }
        OutputMode::Quiet => {}
    }
    Ok(())
}
