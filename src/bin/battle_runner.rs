//! Headless Battle Runner
//!
//! Plays seeded coups or invasions to completion and reports who won, for
//! balancing `BattleConfig` values.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use clap::{Parser, ValueEnum};
use kingdom_battle::battle::{CombatantProfile, MatchSetup, MatchSnapshot, MatchTarget};
use kingdom_battle::core::types::{KingdomId, MatchType, PlayerId, Side, TerritoryId};
use kingdom_battle::{BattleConfig, BattleError, MatchRegistry};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;

// Keeps profile draws independent from the roll stream of the same seed
const PROFILE_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

// Safety stop for configs where neither side can make progress
const MAX_STEPS: u32 = 10_000;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Coup,
    Invasion,
}

impl From<Kind> for MatchType {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Coup => MatchType::Coup,
            Kind::Invasion => MatchType::Invasion,
        }
    }
}

/// Headless Battle Runner - seeded matches for balancing
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Simulate kingdom battles and report outcomes")]
struct Args {
    /// Match type to simulate
    #[arg(long, value_enum, default_value_t = Kind::Coup)]
    kind: Kind,

    /// Attackers, the initiator included
    #[arg(long, default_value_t = 3)]
    attackers: u64,

    /// Defenders
    #[arg(long, default_value_t = 3)]
    defenders: u64,

    /// Wall level of the target kingdom
    #[arg(long, default_value_t = 0)]
    wall_level: u32,

    /// Treasury of the target kingdom
    #[arg(long, default_value_t = 10_000)]
    treasury: u64,

    /// Number of matches to run, seeded `seed..seed + matches`
    #[arg(long, default_value_t = 1)]
    matches: u64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// TOML file overriding the default battle config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

/// Result of one simulated match
#[derive(Serialize)]
struct MatchSummary {
    seed: u64,
    winner: Side,
    cause: String,
    attacker_captures: usize,
    defender_captures: usize,
    rolls: u32,
    battle_minutes: i64,
    loot: u64,
    wall_damage: u32,
    ruler_changed: bool,
}

#[derive(Serialize)]
struct RunReport {
    match_type: MatchType,
    matches: usize,
    attacker_wins: usize,
    attacker_win_rate: f64,
    mean_rolls: f64,
    results: Vec<MatchSummary>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kingdom_battle=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => BattleConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Failed to load config '{}': {}", path.display(), e);
            std::process::exit(1);
        }),
        None => BattleConfig::default(),
    };

    let seed = args.seed.unwrap_or_else(rand::random);
    let start = Utc::now();

    let results: Result<Vec<MatchSummary>, BattleError> = (0..args.matches)
        .into_par_iter()
        .map(|offset| simulate(seed.wrapping_add(offset), &args, &config, start))
        .collect();

    let results = results.unwrap_or_else(|e| {
        eprintln!("Simulation failed: {}", e);
        std::process::exit(1);
    });

    let attacker_wins = results.iter().filter(|r| r.winner == Side::Attackers).count();
    let total_rolls: u32 = results.iter().map(|r| r.rolls).sum();
    let matches = results.len().max(1) as f64;
    let report = RunReport {
        match_type: args.kind.into(),
        matches: results.len(),
        attacker_wins,
        attacker_win_rate: attacker_wins as f64 / matches,
        mean_rolls: f64::from(total_rolls) / matches,
        results,
    };

    match args.format.as_str() {
        "text" => print_text(&report),
        "json" => print_json(&report),
        other => {
            eprintln!("Unknown format '{}', defaulting to json", other);
            print_json(&report);
        }
    }
}

fn print_json(report: &RunReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize report: {}", e),
    }
}

fn print_text(report: &RunReport) {
    println!("Battle Report ({:?})", report.match_type);
    println!("=============");
    for result in &report.results {
        println!(
            "seed {:>20}  {:?} by {:<10} captures {}-{}  rolls {:>4}  {:>4} min  loot {}",
            result.seed,
            result.winner,
            result.cause,
            result.attacker_captures,
            result.defender_captures,
            result.rolls,
            result.battle_minutes,
            result.loot,
        );
    }
    println!();
    println!(
        "Attackers won {}/{} ({:.1}%), mean rolls {:.1}",
        report.attacker_wins,
        report.matches,
        report.attacker_win_rate * 100.0,
        report.mean_rolls
    );
}

fn random_profile(rng: &mut ChaCha8Rng) -> CombatantProfile {
    CombatantProfile::new(
        rng.gen_range(1..=20),
        rng.gen_range(1..=20),
        rng.gen_range(0..=5),
        rng.gen_range(1..=30),
    )
}

/// Contested territory where `side` is closest to a capture
fn pick_target(snapshot: &MatchSnapshot, side: Side) -> Option<TerritoryId> {
    snapshot
        .contested()
        .max_by(|a, b| {
            let lean_a = a.bar_position * side.bar_direction();
            let lean_b = b.bar_position * side.bar_direction();
            lean_a.total_cmp(&lean_b)
        })
        .map(|t| t.id)
}

fn simulate(
    seed: u64,
    args: &Args,
    config: &BattleConfig,
    start: DateTime<Utc>,
) -> Result<MatchSummary, BattleError> {
    let registry = MatchRegistry::with_seed(config.clone(), seed)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ PROFILE_SEED_SALT);

    let initiator = PlayerId(1);
    let target = MatchTarget {
        kingdom_id: KingdomId(seed),
        ruler: Some(PlayerId(1_000)),
        wall_level: args.wall_level,
        treasury: args.treasury,
    };
    let profile = random_profile(&mut rng);
    let setup = match MatchType::from(args.kind) {
        MatchType::Coup => MatchSetup::coup(initiator, profile, target),
        MatchType::Invasion => MatchSetup::invasion(initiator, profile, target),
    };

    let id = registry.create_match(setup, start)?;
    for n in 2..=args.attackers {
        registry.join(id, PlayerId(n), Side::Attackers, random_profile(&mut rng), start)?;
    }
    for n in 0..args.defenders {
        registry.join(id, PlayerId(1_000 + n), Side::Defenders, random_profile(&mut rng), start)?;
    }
    registry.start_battle(id, start)?;

    let step = config.cooldown().max(Duration::minutes(1));
    let mut now = start;
    let mut rolls = 0u32;

    for step_index in 0..MAX_STEPS {
        let snapshot = registry.get_status(id)?;
        if snapshot.status.is_terminal() {
            break;
        }

        // Alternate who moves first so neither side always gets the last word
        let order = if step_index % 2 == 0 {
            [Side::Attackers, Side::Defenders]
        } else {
            [Side::Defenders, Side::Attackers]
        };

        for side in order {
            let players = match side {
                Side::Attackers => &snapshot.attackers,
                Side::Defenders => &snapshot.defenders,
            };
            for &player in players {
                let current = registry.get_status(id)?;
                let Some(territory) = pick_target(&current, side) else {
                    break;
                };
                match registry.roll(id, player, territory, now) {
                    Ok(_) => rolls += 1,
                    Err(
                        BattleError::CooldownNotElapsed { .. }
                        | BattleError::Injured { .. }
                        | BattleError::RollBudgetExceeded { .. }
                        | BattleError::InvalidMatchState { .. },
                    ) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        now += step;
        registry.tick(now)?;
    }

    let outcome = registry.resolve(id, now)?;
    let battle_minutes = (outcome.resolved_at - start).num_minutes();
    tracing::info!(seed, winner = ?outcome.winner, rolls, "Simulated match finished");

    Ok(MatchSummary {
        seed,
        winner: outcome.winner,
        cause: format!("{:?}", outcome.cause),
        attacker_captures: outcome.attacker_captures,
        defender_captures: outcome.defender_captures,
        rolls,
        battle_minutes,
        loot: outcome.loot,
        wall_damage: outcome.wall_damage,
        ruler_changed: outcome.ruler_change.is_some(),
    })
}
