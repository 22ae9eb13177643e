use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use serde_json::{json, Value};

use crate::call_site::CallSite;
use crate::config::EngineConfig;
use crate::node::NodeId;
use crate::script_value::ScriptValue;
use crate::scripting::ScriptEngine;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct NodeArgs {
    /// Node script (rhai)
    #[arg(long)]
    script: PathBuf,

    /// Initial datums as a JSON object, e.g. '{"a": 1.0}'
    #[arg(long)]
    datums: Option<String>,

    /// Engine configuration (JSON file)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Node name used in logs and diagnostics
    #[arg(long, default_value = "node")]
    name: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a node script once and print its controls
    Eval {
        #[command(flatten)]
        node: NodeArgs,
    },
    /// Evaluate a node script, drag one of its points and print the result
    Drag {
        #[command(flatten)]
        node: NodeArgs,

        /// Source line of the `point(..)` call to drag
        #[arg(long)]
        line: u32,

        /// Drag delta as dx,dy,dz
        #[arg(long, value_parser = parse_delta, allow_hyphen_values = true)]
        delta: Vec3,
    },
}

fn parse_delta(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected dx,dy,dz, got '{s}'"));
    }
    let mut v = [0.0_f32; 3];
    for (slot, part) in v.iter_mut().zip(parts) {
        *slot = part
            .parse()
            .map_err(|e| format!("invalid delta component '{part}': {e}"))?;
    }
    Ok(Vec3::from_array(v))
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let report = match cli.command {
        Commands::Eval { node } => {
            let (mut engine, id) = load_node(&node)?;
            engine.evaluate(id);
            report(&mut engine, id)
        }
        Commands::Drag { node, line, delta } => {
            let (mut engine, id) = load_node(&node)?;
            if !engine.evaluate(id) {
                bail!(
                    "initial evaluation failed: {}",
                    engine.last_error.clone().unwrap_or_default()
                );
            }
            let site = CallSite::from_line(line);
            engine.begin_drag(id, site)?;
            let dragged = engine.drag(id, site, delta);
            engine.end_drag(id, site).ok();
            if let Err(e) = dragged {
                log::warn!("{:#}", e);
            }
            report(&mut engine, id)
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path),
        None => Ok(EngineConfig::default()),
    }
}

fn load_node(args: &NodeArgs) -> Result<(ScriptEngine, NodeId)> {
    let config = load_config(args.config.as_deref())?;
    let script = fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read script {}", args.script.display()))?;

    let mut engine = ScriptEngine::with_config(config);
    let id = engine.add_node(&args.name);

    if let Some(datums) = &args.datums {
        let parsed: Value = serde_json::from_str(datums).context("--datums is not valid JSON")?;
        let Value::Object(map) = parsed else {
            bail!("--datums must be a JSON object");
        };
        for (name, value) in &map {
            engine.set_datum(id, name, ScriptValue::from_json(value));
        }
    }

    if !engine.set_script(id, &script) {
        bail!(
            "failed to compile {}: {}",
            args.script.display(),
            engine.last_error.clone().unwrap_or_default()
        );
    }
    Ok((engine, id))
}

fn report(engine: &mut ScriptEngine, id: NodeId) -> Value {
    let datums: serde_json::Map<String, Value> = engine
        .node(id)
        .map(|handle| {
            handle
                .borrow()
                .datums()
                .iter()
                .map(|d| (d.name.clone(), d.value.to_json()))
                .collect()
        })
        .unwrap_or_default();

    json!({
        "datums": datums,
        "controls": engine.snapshot(),
        "diagnostics": engine.take_diagnostics(),
    })
}
