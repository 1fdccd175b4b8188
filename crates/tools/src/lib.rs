//! Built-in tool implementations for Stepwise.
//!
//! Tools give the agent the ability to interact with the world. The
//! [`ToolCatalog`] maps configuration names to constructors; it is an
//! ordinary value built by the caller, so two executors can be wired with
//! different catalogs.

pub mod calculator;
pub mod sql_database;
pub mod web_search;

use std::collections::BTreeMap;
use std::sync::Arc;

use stepwise_config::AppConfig;
use stepwise_core::Error;
use stepwise_core::tool::Tool;
use tracing::debug;

pub use calculator::CalculatorTool;
pub use sql_database::{SqlDatabase, SqlDatabaseTool};
pub use web_search::{SearchEngine, SerpApi, WebSearchTool};

type Constructor = Box<dyn Fn() -> Result<Arc<dyn Tool>, Error> + Send + Sync>;

/// Name → constructor table for tools that can be enabled by configuration.
pub struct ToolCatalog {
    constructors: BTreeMap<String, Constructor>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// The catalog of tools shipped in this crate, with default settings.
    pub fn builtin() -> Self {
        Self::from_config(&AppConfig::default())
    }

    /// The shipped tools, configured from `config`'s tool sections.
    pub fn from_config(config: &AppConfig) -> Self {
        let mut catalog = Self::new();
        catalog.add("calculator", || Arc::new(CalculatorTool));

        let search = config.web_search.clone();
        catalog.try_add("web_search", move || {
            let tool = WebSearchTool::serpapi(search.api_key.clone())
                .map_err(|e| Error::config(e.to_string()))?
                .with_max_results(search.max_results);
            Ok(Arc::new(tool) as Arc<dyn Tool>)
        });

        let sql = config.sql_database.clone();
        catalog.try_add("sql_database", move || {
            let url = sql
                .url
                .as_deref()
                .ok_or_else(|| Error::config("tool 'sql_database' needs [sql_database].url"))?;
            let tool = SqlDatabaseTool::open(url, sql.read_only)
                .map_err(|e| Error::config(e.to_string()))?
                .with_max_rows(sql.max_rows);
            Ok(Arc::new(tool) as Arc<dyn Tool>)
        });

        catalog
    }

    /// Add or replace a constructor that cannot fail.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        constructor: impl Fn() -> Arc<dyn Tool> + Send + Sync + 'static,
    ) {
        self.try_add(name, move || Ok(constructor()));
    }

    /// Add or replace a constructor.
    pub fn try_add(
        &mut self,
        name: impl Into<String>,
        constructor: impl Fn() -> Result<Arc<dyn Tool>, Error> + Send + Sync + 'static,
    ) {
        self.constructors.insert(name.into(), Box::new(constructor));
    }

    /// Known names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(|s| s.as_str()).collect()
    }

    /// Construct one tool per requested name, in order.
    pub fn build(&self, names: &[String]) -> Result<Vec<Arc<dyn Tool>>, Error> {
        debug!(tools = ?names, "Building tools from catalog");
        names
            .iter()
            .map(|name| {
                let construct = self.constructors.get(name).ok_or_else(|| {
                    Error::config(format!(
                        "unknown tool '{}', available: {}",
                        name,
                        self.names().join(", ")
                    ))
                })?;
                construct()
            })
            .collect()
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_lists_tools() {
        assert_eq!(
            ToolCatalog::builtin().names(),
            vec!["calculator", "sql_database", "web_search"]
        );
    }

    #[test]
    fn build_preserves_requested_order() {
        let tools = ToolCatalog::builtin()
            .build(&["web_search".into(), "calculator".into()])
            .unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["web_search", "calculator"]);
    }

    #[test]
    fn unknown_tool_is_a_config_error() {
        let err = ToolCatalog::builtin()
            .build(&["wikipedia".into()])
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("wikipedia"));
    }

    #[test]
    fn sql_database_needs_a_url() {
        let err = ToolCatalog::builtin()
            .build(&["sql_database".into()])
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("[sql_database].url"));

        let mut config = AppConfig::default();
        config.sql_database.url = Some("sqlite::memory:".into());
        let tools = ToolCatalog::from_config(&config)
            .build(&["sql_database".into()])
            .unwrap();
        assert_eq!(tools[0].name(), "sql_database");
    }

    #[test]
    fn empty_catalog_builds_nothing() {
        assert!(ToolCatalog::new().build(&[]).unwrap().is_empty());
    }
}
