//! CLI command implementations
//!
//! Every command loads its configuration first, then the object file, then
//! runs. Nothing is cached between invocations.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::executor::{ExplainPlan, QueryExecutor};
use crate::model::{ObjectSource, ObjectStore, PwnMethod, StoreLoader};
use crate::observability::{log_event_with_fields, Event, Logger, QueryMetrics, Severity};
use crate::query::parse;

use super::args::{Cli, Command};
use super::errors::{CliError, CliErrorCode, CliResult};
use super::io::{object_json, read_filters, write_error, write_line, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Object file to load (required)
    pub objects_path: String,

    /// Attributes to index on top of the well-known indexed ones
    #[serde(default = "default_indexed_attributes")]
    pub indexed_attributes: Vec<String>,

    /// Seed for `_random100`; entropy when absent
    #[serde(default)]
    pub random_seed: Option<u64>,

    /// Cap on objects printed per query; never changes execution
    #[serde(default)]
    pub max_results: Option<usize>,
}

fn default_indexed_attributes() -> Vec<String> {
    [
        "distinguishedName",
        "name",
        "sAMAccountName",
        "objectGUID",
        "objectSid",
        "cn",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("objects_path", &config.objects_path),
                ("indexed", &config.indexed_attributes.join(",")),
            ],
        );

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.objects_path.trim().is_empty() {
            return Err(CliError::config_error("objects_path must not be empty"));
        }

        if let Some(name) = self.indexed_attributes.iter().find(|n| n.trim().is_empty()) {
            return Err(CliError::config_error(format!(
                "Invalid indexed attribute name: '{}'",
                name
            )));
        }

        if self.max_results == Some(0) {
            return Err(CliError::config_error("max_results must be > 0"));
        }

        Ok(())
    }

    /// Get the object file as Path
    pub fn objects_path(&self) -> &Path {
        Path::new(&self.objects_path)
    }

    /// Random source for one command run
    pub fn rng(&self) -> StdRng {
        match self.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    if cli.verbose {
        Logger::set_min_severity(Severity::Trace);
    }
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Query { config, filter } => query(&config, filter.as_deref()),
        Command::Explain { config, filter } => explain(&config, &filter),
        Command::Methods => methods(&mut io::stdout().lock()),
    }
}

/// Loads and indexes the configured object file
pub fn load_store(config: &Config) -> CliResult<ObjectStore> {
    let store = StoreLoader::new()
        .with_indexed(config.indexed_attributes.iter().cloned())
        .load_path(config.objects_path())?;

    let indexed: Vec<String> = store
        .indexed_attributes()
        .into_iter()
        .map(|a| store.registry().name(a))
        .collect();
    log_event_with_fields(
        Event::StoreLoaded,
        &[
            ("objects", &store.len().to_string()),
            ("indexed", &indexed.join(",")),
        ],
    );

    Ok(store)
}

/// Run one filter, or one per stdin line, and print matches
pub fn query(config_path: &Path, filter: Option<&str>) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let store = load_store(&config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match filter {
        Some(text) => run_filters(&config, &store, [Ok(text.to_string())], false, &mut out),
        None => run_filters(&config, &store, read_filters(), true, &mut out),
    }
}

/// Runs filters in order, writing matches and one summary line per filter.
///
/// In batch mode a rejected filter is reported inline and the run continues;
/// otherwise it ends the command.
pub fn run_filters<W: Write>(
    config: &Config,
    store: &ObjectStore,
    filters: impl IntoIterator<Item = CliResult<String>>,
    batch: bool,
    out: &mut W,
) -> CliResult<()> {
    let metrics = QueryMetrics::new();
    let executor = QueryExecutor::new(store).with_metrics(&metrics);
    let mut rng = config.rng();
    let cap = config.max_results.unwrap_or(usize::MAX);

    for text in filters {
        let text = text?;
        if Logger::enabled(Severity::Trace) {
            log_event_with_fields(Event::QueryReceived, &[("filter", &text)]);
        }

        let filter = match parse(&text, store.registry()) {
            Ok(filter) => {
                metrics.increment_parsed();
                if Logger::enabled(Severity::Trace) {
                    log_event_with_fields(
                        Event::QueryParsed,
                        &[
                            ("canonical", &filter.render(store.registry())),
                            ("root", filter.root().kind()),
                        ],
                    );
                }
                filter
            }
            Err(e) => {
                metrics.increment_rejected();
                log_event_with_fields(
                    Event::QueryRejected,
                    &[("code", e.code().code()), ("filter", &text)],
                );
                if batch {
                    write_error(out, CliErrorCode::QueryRejected.code(), &e.to_string())?;
                    continue;
                }
                return Err(e.into());
            }
        };

        let result = executor.execute_with_rng(&filter, &mut rng);
        let mut returned = 0;
        for id in result.iter().take(cap) {
            if let Some(object) = store.object(id) {
                write_line(out, &object_json(object))?;
                returned += 1;
            }
        }

        write_response(
            out,
            json!({
                "filter": text,
                "matched": result.len(),
                "returned": returned,
                "truncated": returned < result.len(),
                "strategy": result.strategy.as_str(),
                "examined": result.examined,
            }),
        )?;
    }

    if batch {
        write_response(out, json!({ "metrics": metrics.snapshot() }))?;
    }

    Ok(())
}

/// Print the explain plan for a filter
///
/// A rejected filter is explained too; the plan shows the rejection.
pub fn explain(config_path: &Path, filter: &str) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let store = load_store(&config)?;
    let stdout = io::stdout();
    explain_to(&store, filter, &mut stdout.lock())
}

/// Writes the explain plan for `filter` against `store`
pub fn explain_to<W: Write>(store: &ObjectStore, filter: &str, out: &mut W) -> CliResult<()> {
    let plan = match parse(filter, store.registry()) {
        Ok(parsed) => ExplainPlan::for_filter(&parsed, store),
        Err(e) => ExplainPlan::from_error(&e),
    };

    write!(out, "{}", plan)?;
    out.flush()?;

    log_event_with_fields(
        Event::ExplainComplete,
        &[(
            "status",
            if plan.accepted { "ACCEPTED" } else { "REJECTED" },
        )],
    );
    Ok(())
}

/// List attack method names, one per line
pub fn methods<W: Write>(out: &mut W) -> CliResult<()> {
    for method in PwnMethod::all() {
        writeln!(out, "{}", method.as_str())?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    fn write_fixture(temp_dir: &TempDir) -> std::path::PathBuf {
        let objects_path = temp_dir.path().join("objects.json");
        let objects = json!({
            "objects": [
                {
                    "dn": "CN=Helpdesk,OU=Groups,DC=corp",
                    "attributes": { "cn": "Helpdesk", "objectClass": ["top", "group"] },
                    "can_pwn": [ { "target": "CN=Alice,OU=Users,DC=corp", "method": "ResetPassword" } ]
                },
                {
                    "dn": "CN=Alice,OU=Users,DC=corp",
                    "sid": "S-1-5-21-1-1104",
                    "attributes": { "cn": "Alice", "objectClass": ["top", "user"], "department": "IT" }
                },
                {
                    "dn": "CN=Bob,OU=Users,DC=corp",
                    "attributes": { "cn": "Bob", "objectClass": ["top", "user"], "department": "IT" }
                }
            ]
        });
        fs::write(&objects_path, objects.to_string()).unwrap();

        let config_path = temp_dir.path().join("dirquery.json");
        let config = json!({
            "objects_path": objects_path.to_string_lossy(),
            "indexed_attributes": ["cn", "department"],
            "random_seed": 42
        });
        fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    fn lines(out: Vec<u8>) -> Vec<Value> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_config_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("dirquery.json");
        fs::write(&config_path, json!({ "objects_path": "objects.json" }).to_string()).unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.indexed_attributes.len(), 6);
        assert!(config.indexed_attributes.contains(&"sAMAccountName".to_string()));
        assert_eq!(config.random_seed, None);
        assert_eq!(config.max_results, None);
    }

    #[test]
    fn test_config_rejects_zero_max_results() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("dirquery.json");
        let config = json!({ "objects_path": "objects.json", "max_results": 0 });
        fs::write(&config_path, config.to_string()).unwrap();

        let err = Config::load(&config_path).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_missing_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = Config::load(&temp_dir.path().join("nope.json")).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_run_single_filter() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(&write_fixture(&temp_dir)).unwrap();
        let store = load_store(&config).unwrap();

        let mut out = Vec::new();
        run_filters(
            &config,
            &store,
            [Ok("(&(department=it)(objectClass=user))".to_string())],
            false,
            &mut out,
        )
        .unwrap();

        let lines = lines(out);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["dn"], "CN=Alice,OU=Users,DC=corp");
        assert_eq!(lines[0]["sid"], "S-1-5-21-1-1104");
        assert_eq!(lines[1]["dn"], "CN=Bob,OU=Users,DC=corp");
        assert_eq!(lines[2]["status"], "ok");
        assert_eq!(lines[2]["data"]["matched"], 2);
        assert_eq!(lines[2]["data"]["strategy"], "INDEX_VERIFIED");
    }

    #[test]
    fn test_single_filter_rejection_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(&write_fixture(&temp_dir)).unwrap();
        let store = load_store(&config).unwrap();

        let mut out = Vec::new();
        let err = run_filters(&config, &store, [Ok("(cn~x)".to_string())], false, &mut out)
            .unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::QueryRejected);
        assert!(out.is_empty());
    }

    #[test]
    fn test_batch_continues_after_rejection() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(&write_fixture(&temp_dir)).unwrap();
        let store = load_store(&config).unwrap();

        let filters = ["(bogus", "(_pwnable=ResetPassword)"]
            .into_iter()
            .map(|s| Ok(s.to_string()));
        let mut out = Vec::new();
        run_filters(&config, &store, filters, true, &mut out).unwrap();

        let lines = lines(out);
        assert_eq!(lines[0]["status"], "error");
        assert_eq!(lines[1]["dn"], "CN=Alice,OU=Users,DC=corp");
        assert_eq!(lines[2]["data"]["matched"], 1);
        assert_eq!(lines[3]["data"]["metrics"]["queries_rejected"], 1);
        assert_eq!(lines[3]["data"]["metrics"]["queries_executed"], 1);
    }

    #[test]
    fn test_max_results_truncates_output_only() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::load(&write_fixture(&temp_dir)).unwrap();
        config.max_results = Some(1);
        let store = load_store(&config).unwrap();

        let mut out = Vec::new();
        run_filters(&config, &store, [Ok("(cn=*)".to_string())], false, &mut out).unwrap();

        let lines = lines(out);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["data"]["matched"], 3);
        assert_eq!(lines[1]["data"]["returned"], 1);
        assert_eq!(lines[1]["data"]["truncated"], true);
    }

    #[test]
    fn test_explain_output() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(&write_fixture(&temp_dir)).unwrap();
        let store = load_store(&config).unwrap();

        let mut out = Vec::new();
        explain_to(&store, "(cn=alice)", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Strategy: INDEX_DIRECT"));

        let mut out = Vec::new();
        explain_to(&store, "(a)", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("DQ_QUERY_TOO_SHORT"));
    }

    #[test]
    fn test_methods_listing() {
        let mut out = Vec::new();
        methods(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), PwnMethod::all().len());
        assert!(text.lines().any(|l| l == "ResetPassword"));
    }
}
