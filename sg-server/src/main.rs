mod scenario;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use bevy::prelude::*;
use clap::{ArgAction, Parser};
use sg_check::{AntiCheatPlugin, Decision, EngineConfig, MovingEngine, Verdict, VerdictQueue};
use sg_utils::report_channel;
use tracing::{Level, info};

use crate::scenario::{Scenario, stream};

#[derive(Parser, Debug)]
#[command(name = "sg-server")]
#[command(about = "Replays recorded player movement through the moving checks", long_about = None)]
struct Cli {
    /// Engine configuration (TOML); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Recorded scenario (JSON)
    #[arg(long)]
    scenario: PathBuf,

    /// -v for debug output, -vv for trace
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Default)]
struct Summary {
    moves: usize,
    violations: usize,
    reverts: usize,
}

impl Summary {
    fn add(&mut self, verdict: &Verdict) {
        self.moves += 1;
        if verdict.is_violation() {
            self.violations += 1;
        }
        if verdict.decision.is_revert() {
            self.reverts += 1;
        }
    }
}

fn print_verdict(verdict: &Verdict) {
    let decision = match verdict.decision {
        Decision::Allow => "allow".to_string(),
        Decision::Revert(set_back) => format!(
            "revert to ({:.3}, {:.3}, {:.3})",
            set_back.look.pos.x, set_back.look.pos.y, set_back.look.pos.z
        ),
    };
    let mut line = format!(
        "tick {:>4} entity {}: h_excess={:.4} y_excess={:.4} vl={:.1} {}",
        verdict.tick, verdict.entity_id, verdict.h_excess, verdict.y_excess, verdict.level, decision
    );
    if let Some(hit) = verdict.passable {
        line.push_str(&format!(" passable=({}, {}, {})", hit.block.x, hit.block.y, hit.block.z));
    }
    if !verdict.workarounds.is_empty() {
        line.push_str(&format!(" workarounds={}", verdict.workarounds.join(",")));
    }
    println!("{line}");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .without_time()
        .compact()
        .with_max_level(level)
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let engine = MovingEngine::new(config)?;
    let scenario = Scenario::load(&cli.scenario)?;
    let world = scenario.build_world()?;
    info!(path = %cli.scenario.display(), events = scenario.events.len(), "scenario loaded");

    let (sender, receiver) = report_channel();
    let pending = receiver.clone();
    let loader = thread::spawn(move || stream(&scenario, &sender));

    let mut app = App::new();
    app.add_plugins(AntiCheatPlugin::new(engine))
        .insert_resource(world)
        .insert_resource(receiver);

    let mut summary = Summary::default();
    loop {
        app.update();
        let verdicts = app.world_mut().resource_mut::<VerdictQueue>().take_verdicts();
        for verdict in &verdicts {
            print_verdict(verdict);
            summary.add(verdict);
        }
        if app.world().resource::<MovingEngine>().is_shut_down() {
            break;
        }
        // A failed loader never sends the shutdown.
        if loader.is_finished() && pending.0.is_empty() {
            break;
        }
        if verdicts.is_empty() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    let streamed = loader
        .join()
        .map_err(|_| "scenario loader panicked")??;
    info!(
        streamed,
        checked = summary.moves,
        violations = summary.violations,
        reverts = summary.reverts,
        "replay finished"
    );
    println!(
        "{} moves, {} violations, {} reverts",
        summary.moves, summary.violations, summary.reverts
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_config_loads() {
        let config = EngineConfig::from_toml_str(include_str!("../stoneguard.toml"));
        assert!(config.is_ok_and(|config| config.moving == EngineConfig::default().moving));
    }

    #[test]
    fn verbosity_is_counted() {
        let cli = Cli::parse_from(["sg-server", "--scenario", "walk.json", "-vv"]);
        assert_eq!(cli.verbose, 2);
        assert!(cli.config.is_none());
    }
}
