// src/core/engine.rs
use std::path::{Path, PathBuf};
use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn, debug};

use crate::config::{Config, CONFIG_CANDIDATES};
use crate::error::ReadorderError;
use super::parser::calculate_hash;
use super::{ParsedSource, ScopeAnalyzer, ScopeReport, SourceParser};

/// Scopes of one file that are not in readable order
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub scopes: Vec<ScopeReport>,
}

/// What a `fix` run did
#[derive(Debug, Clone, Default, Serialize)]
pub struct FixSummary {
    pub files_checked: usize,
    pub files_changed: Vec<PathBuf>,
}

/// Main orchestration engine for readorder
pub struct Engine {
    config: Config,
    parser: SourceParser,
    analyzer: ScopeAnalyzer,
}

impl Engine {
    /// Create a new engine instance from a config file or the defaults
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = Config::load_or_default(config_path)?;

        debug!("Loaded configuration: {:?}", config);

        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Result<Self> {
        let parser = SourceParser::new(&config.parsing)?;
        let analyzer = ScopeAnalyzer::new(&config.ordering);

        Ok(Self {
            config,
            parser,
            analyzer,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Report files whose functions are not in readable order; fails when any are found
    pub async fn check(&mut self, paths: Vec<PathBuf>, format: Option<String>) -> Result<()> {
        let format = format.unwrap_or_else(|| self.config.output.format.clone());
        let reports = self.check_files(&paths).await?;

        match format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&reports)?),
            "text" => {
                for report in &reports {
                    for scope in &report.scopes {
                        println!(
                            "{}:{}: {} not in readable order; expected: {}",
                            report.path.display(),
                            scope.line,
                            describe_scope(scope),
                            scope.order.join(", ")
                        );
                    }
                }
            }
            other => return Err(ReadorderError::Config(format!("Unsupported format: {}", other)).into()),
        }

        if reports.is_empty() {
            info!("✅ All functions read top to bottom");
            Ok(())
        } else {
            Err(ReadorderError::Validation(format!(
                "{} file(s) are not in readable order",
                reports.len()
            )).into())
        }
    }

    /// Analyze files and return the ones with scopes out of readable order
    pub async fn check_files(&mut self, paths: &[PathBuf]) -> Result<Vec<FileReport>> {
        let files = self.resolve_paths(paths)?;
        info!("🔍 Checking {} files", files.len());

        let mut reports = Vec::new();
        for path in files {
            let parsed = self.parser.parse_file(&path).await?;
            if parsed.has_syntax_errors() {
                warn!("Skipping {}: syntax errors", path.display());
                continue;
            }

            let scopes: Vec<ScopeReport> = self.analyzer
                .analyze(&parsed.source, &parsed.tree)
                .into_iter()
                .filter(ScopeReport::needs_reorder)
                .collect();

            if !scopes.is_empty() {
                reports.push(FileReport { path, scopes });
            }
        }

        Ok(reports)
    }

    /// Rewrite files so their functions read top to bottom
    pub async fn fix(&mut self, paths: Vec<PathBuf>, dry_run: bool) -> Result<FixSummary> {
        let files = self.resolve_paths(&paths)?;
        let mut summary = FixSummary::default();

        if dry_run {
            info!("📋 Dry run mode - showing what would be reordered");
        }

        for path in files {
            summary.files_checked += 1;

            let parsed = self.parser.parse_file(&path).await?;
            let original_hash = parsed.content_hash.clone();

            let Some(fixed) = self.reorder_until_stable(parsed)? else {
                continue;
            };

            if dry_run {
                println!("would reorder {}", path.display());
                summary.files_changed.push(path);
                continue;
            }

            // Refuse to clobber edits made while the fix was computed
            let current = tokio::fs::read_to_string(&path).await?;
            let current_hash = calculate_hash(&current);
            if current_hash != original_hash {
                warn!("{} changed on disk; not writing", path.display());
                return Err(ReadorderError::HashMismatch {
                    expected: original_hash,
                    actual: current_hash,
                }.into());
            }

            tokio::fs::write(&path, fixed).await?;
            info!("✅ Reordered {}", path.display());
            summary.files_changed.push(path);
        }

        info!(
            "🎉 {} of {} files reordered",
            summary.files_changed.len(),
            summary.files_checked
        );
        Ok(summary)
    }

    /// Rewrite a parsed file until it stops changing; `None` if it was
    /// already in order or cannot be rewritten safely
    ///
    /// Several passes are needed only when rewrites of nested scopes overlap.
    pub fn reorder_until_stable(&mut self, parsed: ParsedSource) -> Result<Option<String>> {
        let path = parsed.path.clone();
        let mut current = parsed;
        let mut changed = false;

        for pass in 0..self.config.ordering.max_passes {
            if current.has_syntax_errors() {
                if pass == 0 {
                    warn!("Skipping {}: syntax errors", path.display());
                } else {
                    warn!("Rewrite of {} did not parse cleanly; leaving it untouched", path.display());
                }
                return Ok(None);
            }

            let outcome = self.analyzer.reorder(&current.source, &current.tree);
            debug!(
                "Pass {} over {}: changed={}, deferred={}",
                pass + 1,
                path.display(),
                outcome.changed(),
                outcome.deferred
            );

            match outcome.new_text {
                Some(text) => {
                    current = self.parser.parse_content(&path, text)?;
                    changed = true;
                }
                None => return Ok(changed.then_some(current.source)),
            }
        }

        if current.has_syntax_errors() {
            warn!("Rewrite of {} did not parse cleanly; leaving it untouched", path.display());
            return Ok(None);
        }

        warn!(
            "{} still changing after {} passes; keeping the last result",
            path.display(),
            self.config.ordering.max_passes
        );
        Ok(changed.then_some(current.source))
    }

    /// Print units, call edges, cycles and the computed order of each scope
    pub async fn order(&mut self, file: PathBuf, format: Option<String>) -> Result<()> {
        let format = format.unwrap_or_else(|| self.config.output.format.clone());
        let parsed = self.parser.parse_file(&file).await?;
        if parsed.has_syntax_errors() {
            warn!("{} has syntax errors; ranges may be unreliable", file.display());
        }

        let reports: Vec<ScopeReport> = self.analyzer
            .analyze(&parsed.source, &parsed.tree)
            .into_iter()
            .filter(|report| !report.units.is_empty())
            .collect();

        match format.as_str() {
            "json" => println!("{}", serde_json::to_string_pretty(&reports)?),
            "text" => {
                for report in &reports {
                    println!("{} (line {})", describe_scope(report), report.line);
                    println!("  source order: {}", report.source_order.join(", "));
                    println!("  readable order: {}", report.order.join(", "));
                    for unit in &report.units {
                        if !unit.calls.is_empty() {
                            println!("  {} -> {}", unit.name, unit.calls.join(", "));
                        }
                    }
                    for cycle in &report.cycles {
                        println!("  cycle: {}", cycle.join(" -> "));
                    }
                    for duplicate in &report.duplicates {
                        println!("  duplicate: {}", duplicate);
                    }
                    if report.needs_reorder() {
                        println!("  needs reordering");
                    }
                }
            }
            other => return Err(ReadorderError::Config(format!("Unsupported format: {}", other)).into()),
        }

        Ok(())
    }

    /// Write a default configuration file
    pub async fn init(&self, path: Option<PathBuf>) -> Result<()> {
        let target_dir = match path {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        let config_path = target_dir.join(CONFIG_CANDIDATES[1]);

        if config_path.exists() {
            return Err(ReadorderError::Config(format!(
                "{} already exists",
                config_path.display()
            )).into());
        }

        tokio::fs::create_dir_all(&target_dir).await?;
        Config::default().save(&config_path)?;
        info!("Wrote {}", config_path.display());
        Ok(())
    }

    /// Expand the given paths (or the configured source dirs) into files
    fn resolve_paths(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let roots = if paths.is_empty() {
            self.config.project.source_dirs.clone()
        } else {
            paths.to_vec()
        };

        Ok(self.parser.collect_files(&roots, &self.config.project)?)
    }
}

fn describe_scope(report: &ScopeReport) -> String {
    match (&report.kind, &report.class_name) {
        (super::ScopeKind::Program, _) => "top-level functions".to_string(),
        (super::ScopeKind::Block, _) => "nested functions".to_string(),
        (super::ScopeKind::ClassBody, Some(name)) => format!("methods of class {}", name),
        (super::ScopeKind::ClassBody, None) => "methods of anonymous class".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::with_config(Config::default()).unwrap()
    }

    fn parsed(engine: &mut Engine, path: &str, source: &str) -> ParsedSource {
        engine.parser.parse_content(Path::new(path), source.to_string()).unwrap()
    }

    #[test]
    fn test_parsed_hash_is_the_hash_of_the_content() {
        let mut engine = engine();
        let source = "function b() {}\nfunction a() { b(); }\n";

        assert_eq!(parsed(&mut engine, "a.js", source).content_hash, calculate_hash(source));
    }

    #[test]
    fn test_reorder_until_stable() {
        let mut engine = engine();

        let out_of_order = parsed(&mut engine, "a.js", "function b() {}\nfunction a() { b(); }\n");
        assert_eq!(
            engine.reorder_until_stable(out_of_order).unwrap().as_deref(),
            Some("function a() { b(); }\n\nfunction b() {}\n")
        );

        let in_order = parsed(&mut engine, "a.js", "function a() { b(); }\n\nfunction b() {}\n");
        assert!(engine.reorder_until_stable(in_order).unwrap().is_none());
    }

    #[test]
    fn test_syntax_errors_are_not_rewritten() {
        let mut engine = engine();
        let broken = parsed(&mut engine, "a.js", "function b() {}\nfunction a() { b(; }\n");

        assert!(engine.reorder_until_stable(broken).unwrap().is_none());
    }
}
