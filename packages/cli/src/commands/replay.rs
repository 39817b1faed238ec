use super::load_document;
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use gridkit_editor::{serialize, Action, EditorConfig, Event, GridDocument, Store};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Grid file to load
    pub file: PathBuf,

    /// JSON array of actions to dispatch
    pub actions: PathBuf,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// What a replay produced
#[derive(Debug)]
pub struct ReplayOutcome {
    pub events: Vec<Event>,
    /// Actions rejected without effect (e.g. a drop with nothing hovered)
    pub skipped: Vec<String>,
    pub documents: Vec<String>,
}

/// Register `document` in a fresh store and run the JSON `actions` against it
pub fn run_script(
    document: GridDocument,
    actions: &str,
    config: EditorConfig,
) -> Result<ReplayOutcome> {
    let actions: Vec<Action> =
        serde_json::from_str(actions).context("actions must be a JSON array of actions")?;

    let mut store = Store::with_config(config);
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    store.subscribe("**", move |event| {
        sink.borrow_mut().push(event.clone());
        Ok(())
    });
    store.add_grid(document)?;

    let mut skipped = Vec::new();
    for (index, action) in actions.into_iter().enumerate() {
        let described = format!("#{} {:?}", index, action);
        match store.dispatch(action) {
            Ok(()) => {}
            Err(err) if err.is_no_op() => {
                tracing::warn!("[replay] skipped {}: {}", described, err);
                skipped.push(format!("{}: {}", described, err));
            }
            Err(err) => return Err(anyhow!("action {} failed: {}", described, err)),
        }
    }

    let documents = store
        .grids()
        .map(|name| store.document(name).map(serialize))
        .collect::<Result<Vec<_>, _>>()?;
    let events = events.borrow().clone();
    Ok(ReplayOutcome {
        events,
        skipped,
        documents,
    })
}

pub fn replay(args: ReplayArgs, config_dir: &str) -> Result<()> {
    let config = EditorConfig::load(config_dir)?;
    let (_, doc) = load_document(&args.file)?;
    let script = fs::read_to_string(&args.actions)
        .with_context(|| format!("Cannot read {}", args.actions.display()))?;

    let outcome = run_script(doc, &script, config)?;

    for event in &outcome.events {
        if args.json {
            println!("{}", serde_json::to_string(event)?);
        } else {
            println!(
                "  {} {} {}",
                "→".bright_blue(),
                event.name.bold(),
                event.document.dimmed()
            );
        }
    }
    for skipped in &outcome.skipped {
        println!("  {} {}", "⚠️".yellow(), skipped);
    }
    if !args.json {
        println!();
        for document in &outcome.documents {
            print!("{}", document);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridkit_parser::parse;

    const GRID: &str = r#"<mainGrid name="G"><content><row>
        <cell component="A" id="a"/><cell component="B" id="b"/>
    </row></content></mainGrid>"#;

    #[test]
    fn test_replay_collects_events() {
        let script = r#"[
            {"action": "enterDesignMode", "grid": "G"},
            {"action": "drop", "grid": "G"},
            {"action": "startDragging", "grid": "G", "module": "b"},
            {"action": "cancelDragging", "grid": "G"},
            {"action": "exitDesignMode", "grid": "G"}
        ]"#;
        let outcome = run_script(parse(GRID).unwrap(), script, EditorConfig::default()).unwrap();
        let names: Vec<_> = outcome.events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "grid.add",
                "grid.designMode.enter",
                "grid.designMode.dragging.start",
                "grid.designMode.dragging.stop",
                "grid.designMode.exit",
            ]
        );
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.documents.len(), 1);
        assert!(outcome.documents[0].contains("id=\"a\""));
    }

    #[test]
    fn test_replay_stops_on_real_errors() {
        let script = r#"[{"action": "startDragging", "grid": "Missing", "module": "a"}]"#;
        assert!(run_script(parse(GRID).unwrap(), script, EditorConfig::default()).is_err());
        assert!(run_script(parse(GRID).unwrap(), "{}", EditorConfig::default()).is_err());
    }
}
