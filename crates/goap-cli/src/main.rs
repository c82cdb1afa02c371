//! `goap` - run and inspect reactive GOAP scenarios.
//!
//! - `goap run <scenario>` - simulate every agent in a scenario file
//! - `goap plan <scenario> --agent A --goal G` - show the plan one agent would make from the seed

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use goap_agent::ScenarioConfig;
use goap_core::Action;
use goap_tools::{TraceEvent, TraceLog};

#[derive(Parser)]
#[command(name = "goap")]
#[command(about = "Reactive goal-oriented action planning", version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a scenario, printing agent state transitions
    Run {
        /// Scenario file (YAML)
        scenario: PathBuf,

        /// Number of ticks to simulate
        #[arg(long, default_value_t = 100)]
        ticks: u64,

        /// Stop early once this store key holds `true`
        #[arg(long)]
        until: Option<String>,

        /// Print every trace event, not just transitions and plans
        #[arg(long)]
        trace: bool,
    },

    /// Plan one goal for one agent against the scenario seed
    Plan {
        /// Scenario file (YAML)
        scenario: PathBuf,

        /// Agent name
        #[arg(long)]
        agent: String,

        /// Goal name
        #[arg(long)]
        goal: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            ticks,
            until,
            trace,
        } => run_scenario(&scenario, ticks, until.as_deref(), trace),
        Commands::Plan {
            scenario,
            agent,
            goal,
        } => show_plan(&scenario, &agent, &goal),
    }
}

fn run_scenario(path: &Path, ticks: u64, until: Option<&str>, all_events: bool) -> Result<()> {
    let config = ScenarioConfig::load(path)?;
    let log = TraceLog::new();
    let mut sim = config
        .build_traced(&log)
        .with_context(|| format!("Failed to build scenario {}", path.display()))?;

    tracing::info!(
        scenario = %path.display(),
        agents = sim.agents().len(),
        ticks,
        "Starting simulation"
    );

    let mut printed = print_events(&log, 0, all_events);
    for _ in 0..ticks {
        if until.is_some_and(|key| sim.store().is_true(key)) {
            break;
        }
        sim.step();
        printed = print_events(&log, printed, all_events);
    }

    println!();
    println!("Finished after {} ticks", sim.tick());
    for agent in sim.agents() {
        let controller = agent.borrow();
        let stats = controller.stats();
        println!(
            "  {:<12} {:<10} goal={:<12} plans={} interrupts={} completed={} cancelled={}",
            controller.name(),
            controller.state().to_string(),
            controller.current_goal().unwrap_or("-"),
            stats.plans_adopted,
            stats.interrupts,
            stats.actions_completed,
            stats.actions_cancelled,
        );
    }

    println!();
    println!("World state:");
    for (key, value) in &sim.store().snapshot() {
        println!("  {key} = {value}");
    }

    Ok(())
}

/// Print events after `from`; returns the new high-water mark.
fn print_events(log: &TraceLog, from: usize, all_events: bool) -> usize {
    let events = log.events();
    for event in events.iter().skip(from) {
        if all_events || is_headline(event) {
            println!(
                "[{:>4}] {:<8} {:<22} {}",
                event.tick, event.agent, event.tag, event.detail
            );
        }
    }
    events.len()
}

fn is_headline(event: &TraceEvent) -> bool {
    matches!(
        event.tag.as_ref(),
        "agent.state" | "agent.plan.adopt" | "agent.interrupt"
    )
}

fn show_plan(path: &Path, agent: &str, goal: &str) -> Result<()> {
    let config = ScenarioConfig::load(path)?;
    let Some(agent_config) = config.agent(agent) else {
        bail!("Scenario {} has no agent `{agent}`", path.display());
    };
    let goals = agent_config.goals();
    let Some(goal) = goals.iter().find(|g| g.name() == goal) else {
        bail!("Agent `{agent}` has no goal `{goal}`");
    };
    let actions: Vec<Rc<Action>> = agent_config.actions().into_iter().map(Rc::new).collect();

    let plan = config
        .planner()
        .plan(&config.seed, &actions, goal)
        .with_context(|| format!("Agent `{agent}` cannot reach `{}`", goal.name()))?;

    if plan.is_empty() {
        println!("`{}` already holds in the seed state", goal.name());
        return Ok(());
    }

    for (i, action) in plan.steps().iter().enumerate() {
        println!("{:>3}. {:<16} cost={}", i + 1, action.name(), action.cost());
    }
    println!("total cost: {}", plan.total_cost());
    Ok(())
}
