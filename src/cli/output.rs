//! Output formatting module
//!
//! This module formats query results of a loaded model for the different
//! output formats.

use crate::Result;
use crate::session::{QueryResults, SequenceSearchModel};
use crate::state::{Range, Sequence, State};
use serde_json::{Value, json};

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Labels of a merged match, joined the way queries are written
fn sequence_label(model: &SequenceSearchModel, fighter: usize, seq: &Sequence) -> String {
    let Some(owner) = model.fighters().get(fighter) else {
        return String::new();
    };
    seq.states(owner.states.states())
        .map(|state| model.display_label(fighter, state))
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// First and last frame covered by a match
fn frame_span(states: &[State], range: Range) -> Option<(u32, u32)> {
    let first = states.get(range.start)?;
    let last = states.get(range.end.checked_sub(1)?)?;
    Some((first.frame, last.frame))
}

fn fighter_json(model: &SequenceSearchModel, fighter: usize) -> Value {
    match model.fighters().get(fighter) {
        Some(f) => json!({
            "fighter_id": f.info.fighter_id,
            "player_tag": f.info.player_tag,
            "name": f.info.name,
        }),
        None => Value::Null,
    }
}

fn results_json(model: &SequenceSearchModel, fighter: usize, results: &QueryResults) -> Value {
    let states = model
        .fighters()
        .get(fighter)
        .map(|f| f.states.states())
        .unwrap_or(&[]);
    let stats = results.graph.stats();
    json!({
        "matches": results.matches.iter().zip(&results.merged).map(|(range, seq)| {
            let span = frame_span(states, *range);
            json!({
                "start": range.start,
                "end": range.end,
                "first_frame": span.map(|s| s.0),
                "last_frame": span.map(|s| s.1),
                "path": sequence_label(model, fighter, seq),
            })
        }).collect::<Vec<_>>(),
        "graph": {
            "states": stats.total_states,
            "transitions": stats.total_transitions,
            "total_weight": stats.total_weight,
            "max_weight": stats.max_weight,
            "initial_states": stats.initial_states,
            "terminal_states": stats.terminal_states,
            "islands": stats.islands,
        },
    })
}

/// Output every query slot as JSON
pub fn output_json(w: &mut impl std::io::Write, model: &SequenceSearchModel) -> Result<()> {
    let queries: Vec<Value> = (0..model.query_count())
        .map(|index| {
            let mut entry = json!({
                "index": index,
                "query": model.query_text(index),
                "state": model.query_state(index).map(|s| s.name()),
                "error": model.query_error(index),
            });
            if let (Some(fighter), Some(results)) =
                (model.query_fighter(index), model.results(index))
            {
                entry["fighter"] = fighter_json(model, fighter);
                entry["results"] = results_json(model, fighter, results);
                entry["sessions"] = model
                    .session_results(index)
                    .iter()
                    .map(|s| {
                        json!({
                            "session": s.session,
                            "matches": s.results.matches.len(),
                        })
                    })
                    .collect::<Vec<_>>()
                    .into();
            }
            entry
        })
        .collect();

    let output = json!({
        "summary": {
            "sessions": model.sessions().len(),
            "fighters": model.fighters().len(),
            "current_fighter": model.current_fighter().map(|f| fighter_json(model, f)),
            "queries": model.query_count(),
        },
        "queries": queries,
    });

    serde_json::to_writer_pretty(&mut *w, &output)?;
    writeln!(w)?;
    Ok(())
}

/// Output every query slot as a text table followed by its matches
pub fn output_table(w: &mut impl std::io::Write, model: &SequenceSearchModel) -> Result<()> {
    writeln!(w, "Sequence Search - Query Results")?;
    writeln!(w, "{}", "=".repeat(80))?;
    writeln!(w)?;

    writeln!(w, "Summary:")?;
    writeln!(w, "  Sessions: {}", model.sessions().len())?;
    if let Some(fighter) = model.current_fighter().and_then(|f| model.fighters().get(f)) {
        writeln!(
            w,
            "  Fighter:  {} ({}) [{}]",
            fighter.info.name, fighter.info.fighter_id, fighter.info.player_tag
        )?;
    }
    writeln!(w, "  Queries:  {}", model.query_count())?;
    writeln!(w)?;

    if model.query_count() == 0 {
        return Ok(());
    }

    writeln!(w, "Queries:")?;
    writeln!(w, "{:-<80}", "")?;
    writeln!(
        w,
        "{:<4} {:<36} {:<9} {:>8} {:>7} {:>7}",
        "#", "Query", "State", "Matches", "Nodes", "Edges"
    )?;
    writeln!(w, "{:-<80}", "")?;
    for index in 0..model.query_count() {
        let text = model.query_text(index).unwrap_or_default();
        let state = model.query_state(index).map(|s| s.name()).unwrap_or("-");
        let (matches, nodes, edges) = match model.results(index) {
            Some(r) => (
                r.matches.len().to_string(),
                r.graph.node_count().to_string(),
                r.graph.edge_count().to_string(),
            ),
            None => ("-".to_string(), "-".to_string(), "-".to_string()),
        };
        writeln!(
            w,
            "{:<4} {:<36} {:<9} {:>8} {:>7} {:>7}",
            index,
            truncate(text, 36),
            state,
            matches,
            nodes,
            edges
        )?;
    }
    writeln!(w)?;

    for index in 0..model.query_count() {
        if let Some(error) = model.query_error(index) {
            writeln!(w, "Query {} failed: {}", index, error)?;
            continue;
        }
        let (Some(fighter), Some(results)) = (model.query_fighter(index), model.results(index))
        else {
            continue;
        };
        if results.matches.is_empty() {
            continue;
        }
        let states = model
            .fighters()
            .get(fighter)
            .map(|f| f.states.states())
            .unwrap_or(&[]);

        writeln!(w, "Matches of query {}:", index)?;
        writeln!(w, "{:-<80}", "")?;
        writeln!(w, "{:<16} {:<63}", "Frames", "Path")?;
        writeln!(w, "{:-<80}", "")?;
        for (range, seq) in results.matches.iter().zip(&results.merged) {
            let frames = match frame_span(states, *range) {
                Some((first, last)) => format!("{}-{}", first, last),
                None => "-".to_string(),
            };
            let path = truncate(&sequence_label(model, fighter, seq), 63);
            writeln!(w, "{:<16} {:<63}", frames, path)?;
        }
        writeln!(w)?;
    }

    Ok(())
}

/// Output the transition graph of every applied query as DOT
pub fn output_dot(w: &mut impl std::io::Write, model: &SequenceSearchModel) -> Result<()> {
    for index in 0..model.query_count() {
        let (Some(fighter), Some(results)) = (model.query_fighter(index), model.results(index))
        else {
            continue;
        };
        writeln!(w, "// query {}: {}", index, model.query_text(index).unwrap_or_default())?;
        let dot = results
            .graph
            .to_dot(|state| model.display_label(fighter, state));
        writeln!(w, "{}", dot)?;
    }
    Ok(())
}
