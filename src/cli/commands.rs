//! CLI command implementations
//!
//! This module contains the implementation for each CLI command.

use crate::cli::DataSourceType;
use crate::data_source::mock;
use crate::labels::LabelDictionary;
use crate::{Config, Result};
use std::path::Path;

/// Dictionary from the command line, then the config file.
///
/// The mock source carries its own labels; anything else starts empty so
/// canonical hex ids still work.
fn load_dictionary(
    labels: Option<&Path>,
    config: &Config,
    source: DataSourceType,
) -> Result<LabelDictionary> {
    let path = labels.or(config.labels.dictionary.as_deref());
    match (path, source) {
        (Some(path), _) => {
            tracing::info!("Loading labels from {:?}", path);
            LabelDictionary::from_file(path)
        }
        (None, DataSourceType::Mock) => Ok(mock::dictionary()),
        (None, DataSourceType::Json) => {
            tracing::warn!("No label dictionary given, only hex motion ids will resolve");
            Ok(LabelDictionary::new())
        }
    }
}

/// Search command implementation
pub mod search {
    use super::*;
    use crate::cli::{OutputFormat, SearchArgs, output};
    use crate::data_source::{create_replay_sources, ingest};
    use crate::session::SequenceSearchModel;
    use anyhow::Context;

    /// Execute the search command
    pub fn execute(args: SearchArgs, config: &Config) -> Result<()> {
        let dict = load_dictionary(args.labels.as_deref(), config, args.source)?;
        let mut model = SequenceSearchModel::new(dict, config.search.clone());

        for source in create_replay_sources(args.source, &args.replay)? {
            let replay = source
                .load()
                .with_context(|| format!("Failed to load replay {}", source.describe()))?;
            let session = ingest(&mut model, &replay)?;
            tracing::info!(
                "Session {}: {} frame(s) from {}",
                session,
                replay.frame_count(),
                source.describe()
            );
        }

        if let Some(fighter_id) = args.fighter {
            crate::ensure!(
                model.select_fighter_id(fighter_id),
                "Fighter {} does not appear in the loaded replays",
                fighter_id
            );
        }

        for query in &args.query {
            model.add_query(query);
        }
        let compiled = model.compile_all();
        let applied = model.apply_all();

        let stdout = &mut std::io::stdout();
        match args.output {
            OutputFormat::Table => output::output_table(stdout, &model)?,
            OutputFormat::Json => output::output_json(stdout, &model)?,
            OutputFormat::Dot => output::output_dot(stdout, &model)?,
        }

        if args.export {
            export_graphs(&model, &config.export_directory())?;
        }

        if compiled && applied {
            Ok(())
        } else {
            let failed = (0..model.query_count())
                .filter(|&i| model.query_error(i).is_some())
                .count();
            Err(crate::custom_error!("{} query(ies) failed", failed))
        }
    }

    /// One DOT file per applied query, each in its own subdirectory
    fn export_graphs(model: &SequenceSearchModel, dir: &Path) -> Result<()> {
        for index in 0..model.query_count() {
            let (Some(fighter), Some(results)) =
                (model.query_fighter(index), model.results(index))
            else {
                continue;
            };
            let path = results.graph.export_dot(
                &dir.join(format!("query-{}", index)),
                |state| model.display_label(fighter, state),
            )?;
            println!("Exported query {} to {}", index, path.display());
        }
        Ok(())
    }
}

/// Check command implementation
pub mod check {
    use super::*;
    use crate::cli::CheckArgs;
    use crate::query::{compile, parse};

    /// Execute the check command
    pub fn execute(args: CheckArgs, config: &Config) -> Result<()> {
        let ast = match parse(&args.query) {
            Ok(ast) => ast,
            Err(e) => {
                eprintln!("{}", args.query);
                eprintln!("{}^", " ".repeat(e.span.start));
                eprintln!("❌ {}", e);
                return Err(e.into());
            }
        };

        println!("📋 Query Check");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("Input:     {}", args.query);
        println!("Canonical: {}", ast);
        println!("Labels:    {}", ast.label_count());

        let Some(fighter_id) = args.fighter_id else {
            println!();
            println!("✅ Query parses (pass --fighter-id to compile it)");
            return Ok(());
        };

        let dict = load_dictionary(args.labels.as_deref(), config, DataSourceType::Json)?;
        match compile(&ast, &dict, fighter_id) {
            Ok(query) => {
                println!("Fighter:   {}", fighter_id);
                println!("Matchers:  {}", query.matchers().len() - 1);
                println!();
                println!("✅ Query compiles");
                Ok(())
            }
            Err(e) => {
                println!();
                println!("❌ {}", e);
                Err(e.into())
            }
        }
    }
}

/// Labels command implementation
pub mod labels {
    use super::*;
    use crate::cli::LabelsArgs;

    /// Execute the labels command
    pub fn execute(args: LabelsArgs, config: &Config) -> Result<()> {
        let dict = load_dictionary(args.labels.as_deref(), config, DataSourceType::Json)?;
        let fighters = match args.fighter_id {
            Some(id) => vec![id],
            None => dict.fighter_ids(),
        };

        println!("📋 Label Dictionary");
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        println!("Layers: {}", dict.layers().join(", "));
        println!();

        for fighter in fighters {
            let Some(name) = dict.fighter_name(fighter) else {
                println!("Fighter {}: not in dictionary", fighter);
                continue;
            };
            let entries = dict.user_labels(fighter);
            println!("{} ({}): {} label(s)", name, fighter, entries.len());
            for entry in entries {
                let canonical = dict.canonical_name(entry.motion).unwrap_or("-");
                println!(
                    "    - {:<16} {:<24} {} [{}]",
                    entry.label, canonical, entry.motion, entry.layer
                );
            }
            println!();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CheckArgs, LabelsArgs, OutputFormat, SearchArgs};
    use crate::state::FighterId;

    #[test]
    fn test_load_dictionary_fallbacks() {
        let config = Config::default();
        let dict = load_dictionary(None, &config, DataSourceType::Mock).unwrap();
        assert_eq!(dict.fighter_name(mock::MOCK_FIGHTER), Some("pikachu"));

        let dict = load_dictionary(None, &config, DataSourceType::Json).unwrap();
        assert!(dict.fighter_ids().is_empty());

        let missing = Path::new("/nonexistent/labels.toml");
        assert!(load_dictionary(Some(missing), &config, DataSourceType::Mock).is_err());
    }

    fn mock_search(queries: &[&str], fighter: Option<FighterId>) -> SearchArgs {
        SearchArgs {
            replay: Vec::new(),
            source: DataSourceType::Mock,
            labels: None,
            query: queries.iter().map(|q| q.to_string()).collect(),
            fighter,
            output: OutputFormat::Json,
            export: false,
        }
    }

    #[test]
    fn test_search_mock() {
        let config = Config::default();
        assert!(search::execute(mock_search(&["grab"], None), &config).is_ok());
        let opponent = mock_search(&["shield"], Some(mock::MOCK_OPPONENT));
        assert!(search::execute(opponent, &config).is_ok());
    }

    #[test]
    fn test_search_failures() {
        let config = Config::default();
        assert!(search::execute(mock_search(&["grab"], Some(99)), &config).is_err());
        let err = search::execute(mock_search(&["grab", "zair"], None), &config).unwrap_err();
        assert_eq!(err.to_string(), "1 query(ies) failed");
    }

    #[test]
    fn test_search_export() {
        let dir = std::env::temp_dir()
            .join(format!("sequence-search-export-{}", std::process::id()));
        let mut config = Config::default();
        config.export.directory = Some(dir.clone());

        let mut args = mock_search(&["nair -> nair -> utilt", "grab"], None);
        args.export = true;
        search::execute(args, &config).unwrap();

        for index in 0..2 {
            let files: Vec<_> = std::fs::read_dir(dir.join(format!("query-{}", index)))
                .unwrap()
                .collect();
            assert_eq!(files.len(), 1);
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_check() {
        let config = Config::default();
        let args = |query: &str, fighter_id: Option<FighterId>| CheckArgs {
            query: query.to_string(),
            labels: None,
            fighter_id,
        };
        assert!(check::execute(args("a -> (b | c){2}", None), &config).is_ok());
        assert!(check::execute(args("a ->", None), &config).is_err());
        assert!(check::execute(args("0x10 -> 0x20", Some(8)), &config).is_ok());
        assert!(check::execute(args("nair", Some(8)), &config).is_err());
    }

    #[test]
    fn test_labels_without_dictionary() {
        let args = LabelsArgs {
            labels: None,
            fighter_id: Some(8),
        };
        assert!(labels::execute(args, &Config::default()).is_ok());
    }
}
