//! `humanoid-cli` – runs the behaviour engine against a simulated robot.
//!
//! 1. Loads `~/.humanoid/config.toml`, writing defaults on first run.
//! 2. Wires the demo option tree to a simulated motion controller and world.
//! 3. Runs the think loop at `think_hz` until Ctrl-C (or `--cycles N`).
//!
//! `--dot` prints every FSM as Graphviz and exits.

mod config;
mod demo;

use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use humanoid_behavior::{OptionTree, init_tracing};
use humanoid_hal::{SimMotion, spawn_speech_sink};
use humanoid_middleware::{EventBus, StateStore, Topic, TopicReceiver};
use humanoid_types::{Event, EventPayload, SystemClock};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::demo::{Robot, SimWorld};

/// Run the behaviour engine against a simulated robot.
#[derive(Debug, Parser)]
#[command(name = "humanoid", version, long_about = None)]
struct Args {
    /// Print every FSM as Graphviz and exit.
    #[arg(long)]
    dot: bool,

    /// Stop after this many think cycles.
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,
}

fn main() {
    let _guard = init_tracing("humanoid");

    let args = Args::parse();

    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            info!(path = %config::config_path().display(), "config loaded");
            cfg
        }
        Ok(None) => {
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => warn!(error = %e, "could not write default config"),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {e}", "Config error".red());
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    let bus = EventBus::default();
    let robot = Robot {
        store: StateStore::new(),
        motion: Arc::new(SimMotion::new()),
        settings: cfg.live_settings(),
        bus: bus.clone(),
        clock: Arc::new(SystemClock),
    };

    let tree = match demo::build_tree(&robot, &cfg.behavior()) {
        Ok(tree) => tree,
        Err(e) => {
            error!(error = %e, "behaviour graph is miswired");
            eprintln!("{}: {e}", "Behaviour graph error".red().bold());
            process::exit(1);
        }
    };

    if args.dot {
        print!("{}", tree.fsms_to_dot());
        return;
    }

    print_banner();

    // Subscribed before the handler exists so a Ctrl-C always has a listener.
    let alerts = bus.subscribe_to(Topic::SystemAlerts);
    let bus_ctrlc = bus.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the think loop …".yellow().bold());
        let stop = Event::new(
            "humanoid-cli",
            EventPayload::Fault {
                component: "cli".to_string(),
                message: "operator Ctrl-C".to_string(),
            },
        );
        if let Err(e) = bus_ctrlc.publish_to(Topic::SystemAlerts, stop) {
            eprintln!("{}: {e}", "Could not signal the think loop".red());
            process::exit(130);
        }
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; stop with SIGKILL");
    }

    if let Err(e) = spawn_speech_sink(&bus, |text| {
        println!("  {} {}", "say:".dimmed(), text.italic());
    }) {
        warn!(error = %e, "speech sink not started; announcements will be dropped");
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {e}", "Failed to start runtime".red());
            process::exit(1);
        }
    };

    let world = SimWorld::new(robot.store.clone(), robot.motion.clone());
    let cycles = runtime.block_on(async {
        tokio::spawn(watch_fsm_states(bus.clone()));
        think_loop(tree, world, robot.motion, cfg.think_hz, args.cycles, alerts).await
    });

    println!("{}", format!("  ✓ Stopped after {cycles} think cycles.").green());
}

/// Drive the option tree at `hz` until a fault arrives on `alerts`, the tree
/// has no root, or `max_cycles` have run.  Returns the number of cycles run.
async fn think_loop(
    mut tree: OptionTree,
    mut world: SimWorld,
    motion: Arc<SimMotion>,
    hz: u32,
    max_cycles: Option<u64>,
    mut alerts: TopicReceiver,
) -> u64 {
    let period = Duration::from_secs_f64(1.0 / f64::from(hz.max(1)));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(hz, "think loop started");

    loop {
        tokio::select! {
            biased;
            alert = alerts.recv() => match alert {
                Ok(Event {
                    source,
                    payload: EventPayload::Fault { component, message },
                    ..
                }) => {
                    warn!(%source, %component, %message, "fault raised, stopping the think loop");
                    break;
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(n)) => {
                    warn!(dropped = n, "alert receiver lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
            _ = ticker.tick() => {}
        }
        world.step();
        motion.step();
        let Some(snapshot) = tree.run() else {
            break;
        };
        if max_cycles.is_some_and(|max| snapshot.cycle >= max) {
            break;
        }
    }
    tree.cycle()
}

/// Print each FSM state change seen on the telemetry topic.
async fn watch_fsm_states(bus: EventBus) {
    let mut rx = bus.subscribe_to(Topic::Telemetry);
    let mut last: Vec<(String, String)> = Vec::new();
    loop {
        match rx.recv().await {
            Ok(Event {
                payload: EventPayload::OptionTree(snapshot),
                ..
            }) => {
                for s in snapshot.fsm_states {
                    let entry = (s.fsm, s.state);
                    if last.contains(&entry) {
                        continue;
                    }
                    println!(
                        "  {:>6} {} → {}",
                        snapshot.cycle.to_string().dimmed(),
                        entry.0.bold(),
                        entry.1.cyan()
                    );
                    last.retain(|(fsm, _)| fsm != &entry.0);
                    last.push(entry);
                }
            }
            Ok(_) => {}
            Err(RecvError::Lagged(n)) => {
                warn!(dropped = n, "state watcher lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_banner() {
    println!();
    println!("{}", "  ╔══════════════════════════════════════╗".bold().cyan());
    println!("{}", "  ║     humanoid · behaviour engine      ║".bold().cyan());
    println!("{}", "  ╚══════════════════════════════════════╝".bold().cyan());
    println!();
    println!("  Simulated robot; press {} to stop.\n", "Ctrl-C".bold());
}

#[cfg(test)]
mod tests {
    use super::*;
    use humanoid_behavior::BehaviorConfig;
    use humanoid_middleware::Settings;
    use humanoid_types::ManualClock;

    fn sim_robot() -> Robot {
        Robot {
            store: StateStore::new(),
            motion: Arc::new(SimMotion::new()),
            settings: Settings::new(),
            bus: EventBus::default(),
            clock: Arc::new(ManualClock::new()),
        }
    }

    #[test]
    fn parses_dot_and_cycles() {
        let args = Args::try_parse_from(["humanoid", "--dot", "--cycles", "120"]).expect("valid args");
        assert!(args.dot);
        assert_eq!(args.cycles, Some(120));
    }

    #[test]
    fn defaults_run_forever_without_dot() {
        let args = Args::try_parse_from(["humanoid"]).expect("valid args");
        assert!(!args.dot);
        assert_eq!(args.cycles, None);
    }

    #[test]
    fn rejects_bad_cycle_count_and_unknown_flags() {
        assert!(Args::try_parse_from(["humanoid", "--cycles", "many"]).is_err());
        assert!(Args::try_parse_from(["humanoid", "--fast"]).is_err());
    }

    #[tokio::test]
    async fn fault_alert_stops_the_think_loop() {
        let robot = sim_robot();
        let tree = demo::build_tree(&robot, &BehaviorConfig::default()).expect("valid graph");
        let world = SimWorld::new(robot.store.clone(), robot.motion.clone());
        let alerts = robot.bus.subscribe_to(Topic::SystemAlerts);

        let fault = Event::new(
            "humanoid-cli",
            EventPayload::Fault {
                component: "cli".to_string(),
                message: "operator Ctrl-C".to_string(),
            },
        );
        assert_eq!(robot.bus.publish_to(Topic::SystemAlerts, fault), Ok(1));

        let cycles = think_loop(tree, world, robot.motion.clone(), 1000, None, alerts).await;
        assert_eq!(cycles, 0);
    }

    #[tokio::test]
    async fn non_fault_alerts_are_ignored() {
        let robot = sim_robot();
        let tree = demo::build_tree(&robot, &BehaviorConfig::default()).expect("valid graph");
        let world = SimWorld::new(robot.store.clone(), robot.motion.clone());
        let alerts = robot.bus.subscribe_to(Topic::SystemAlerts);

        let notice = Event::new("humanoid-cli", EventPayload::Announce("hello".to_string()));
        robot.bus.publish_to(Topic::SystemAlerts, notice).expect("listener");

        let cycles = think_loop(tree, world, robot.motion.clone(), 1000, Some(3), alerts).await;
        assert_eq!(cycles, 3);
    }
}
