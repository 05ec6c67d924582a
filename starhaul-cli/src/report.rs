use colored::Colorize;
use serde::Serialize;
use starhaul_game::{AutopilotReport, LoadReport, SimSession, narrative::clock_stamp};
use std::collections::BTreeMap;
use std::io::Write;

use crate::driver::RunTally;

const LOG_TAIL: usize = 8;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipLine {
    pub id: String,
    pub name: String,
    pub rarity: String,
    pub combat_power: u64,
    pub integrity: f64,
    pub max_integrity: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineSummary {
    pub trips: u32,
    pub simulated_ms: u64,
    pub xp: u64,
    pub resources: BTreeMap<String, i64>,
    pub capsules: usize,
}

impl OfflineSummary {
    fn from_report(report: &AutopilotReport) -> Self {
        Self {
            trips: report.trips,
            simulated_ms: report.simulated_ms,
            xp: report.gains.xp,
            resources: report
                .gains
                .resources
                .iter()
                .map(|(id, amount)| (id.key().to_string(), amount))
                .collect(),
            capsules: report.gains.capsules.len(),
        }
    }
}

/// Everything printed at the end of a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub seed: u64,
    pub start_ms: u64,
    pub end_ms: u64,
    pub ticks: u64,
    pub launched: u32,
    pub claimed: u32,
    pub successes: u32,
    pub events_resolved: u32,
    pub autopilot_trips: u32,
    pub autopilot_stop: Option<String>,
    pub autopilot_remaining_ms: u64,
    pub missions_completed: u32,
    pub narrated: usize,
    pub level: u32,
    pub xp: u64,
    pub xp_to_next_level: u64,
    pub resources: BTreeMap<String, u64>,
    pub ships: Vec<ShipLine>,
    pub offline: Option<OfflineSummary>,
    pub saved_to: Option<String>,
    pub log: Vec<String>,
}

impl RunSummary {
    pub fn collect(
        session: &SimSession,
        tally: &RunTally,
        load: Option<&LoadReport>,
        start_ms: u64,
        end_ms: u64,
    ) -> Self {
        let state = session.state();
        let autopilot_log = if state.auto_pilot_state.log.is_empty() {
            state
                .autopilot_report
                .as_ref()
                .map(|report| report.log.as_slice())
                .unwrap_or_default()
        } else {
            state.auto_pilot_state.log.as_slice()
        };
        let skip = autopilot_log.len().saturating_sub(LOG_TAIL);
        Self {
            seed: state.seed,
            start_ms,
            end_ms,
            ticks: tally.ticks,
            launched: tally.launched,
            claimed: tally.claimed,
            successes: tally.successes,
            events_resolved: tally.events_resolved,
            autopilot_trips: tally.autopilot_trips,
            autopilot_stop: tally.autopilot_stop.map(|reason| format!("{reason:?}")),
            autopilot_remaining_ms: state.auto_pilot_state.remaining_time_ms,
            missions_completed: tally.missions_completed,
            narrated: tally.narrated,
            level: state.player_state.level,
            xp: state.player_state.xp,
            xp_to_next_level: state.player_state.xp_to_next_level,
            resources: state
                .resources
                .iter()
                .filter(|(_, amount)| *amount > 0)
                .map(|(id, amount)| (id.key().to_string(), amount))
                .collect(),
            ships: state
                .ships
                .iter()
                .map(|ship| ShipLine {
                    id: ship.id.to_string(),
                    name: ship.name.clone(),
                    rarity: format!("{:?}", ship.rarity),
                    combat_power: ship.combat_power,
                    integrity: ship.stats.integrity,
                    max_integrity: ship.stats.max_integrity,
                })
                .collect(),
            offline: load
                .and_then(|report| report.offline_autopilot.as_ref())
                .map(OfflineSummary::from_report),
            saved_to: None,
            log: autopilot_log[skip..]
                .iter()
                .map(|line| line.display().to_string())
                .collect(),
        }
    }
}

pub fn write_json(out: &mut dyn Write, summary: &RunSummary) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, summary)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_console(out: &mut dyn Write, summary: &RunSummary) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Run Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============".cyan())?;
    writeln!(
        out,
        "Seed {} from {} to {} ({} ticks)",
        summary.seed,
        clock_stamp(summary.start_ms),
        clock_stamp(summary.end_ms),
        summary.ticks
    )?;
    writeln!(
        out,
        "Commander level {} ({}/{} xp)",
        summary.level, summary.xp, summary.xp_to_next_level
    )?;
    writeln!(
        out,
        "Expeditions: {} launched, {} claimed, {} successful",
        summary.launched,
        summary.claimed,
        summary.successes.to_string().green()
    )?;
    writeln!(out, "Events answered: {}", summary.events_resolved)?;
    writeln!(out, "Missions completed: {}", summary.missions_completed)?;

    let stop = summary.autopilot_stop.as_deref().unwrap_or("running");
    writeln!(
        out,
        "Autopilot: {} trips, {stop}, {} ms left",
        summary.autopilot_trips, summary.autopilot_remaining_ms
    )?;

    if let Some(offline) = &summary.offline {
        writeln!(out)?;
        writeln!(out, "{}", "🛰️  Offline Progress".bright_yellow().bold())?;
        writeln!(
            out,
            "Replayed {} trips over {} ms (+{} xp, {} capsules)",
            offline.trips, offline.simulated_ms, offline.xp, offline.capsules
        )?;
        for (resource, amount) in &offline.resources {
            writeln!(out, "   {resource}: {amount:+}")?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", "🚀 Hangar".bright_blue().bold())?;
    for ship in &summary.ships {
        writeln!(
            out,
            "   {} {} [{}] power {} hull {:.0}/{:.0}",
            ship.id,
            ship.name.bold(),
            ship.rarity,
            ship.combat_power,
            ship.integrity,
            ship.max_integrity
        )?;
    }

    writeln!(out)?;
    writeln!(out, "{}", "📦 Hold".bright_blue().bold())?;
    for (resource, amount) in &summary.resources {
        writeln!(out, "   {resource:20} {amount}")?;
    }

    if !summary.log.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}", "📜 Autopilot Log".bright_magenta().bold())?;
        for line in &summary.log {
            writeln!(out, "   {line}")?;
        }
    }
    if let Some(slot) = &summary.saved_to {
        writeln!(out)?;
        writeln!(out, "💾 Saved to {}", slot.green())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{RunPlan, play};
    use starhaul_game::{GameContent, NoNarrator};

    fn sample() -> RunSummary {
        let mut session = SimSession::new(GameContent::load_from_static(), 42);
        let plan = RunPlan {
            duration_ms: 10 * 60 * 1_000,
            tick_ms: 1_000,
            route: vec![1],
            autopilot_modules: 1,
            take_missions: false,
        };
        let tally = play(&mut session, &plan, 0, &mut NoNarrator).unwrap();
        RunSummary::collect(&session, &tally, None, 0, plan.duration_ms)
    }

    #[test]
    fn json_report_uses_camel_case() {
        let mut out = Vec::new();
        write_json(&mut out, &sample()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["seed"], 42);
        assert_eq!(value["ticks"], 600);
        assert!(value["autopilotTrips"].as_u64().unwrap() > 0);
        assert!(value["resources"]["credits"].is_u64());
        assert!(value["offline"].is_null());
    }

    #[test]
    fn console_report_lists_sections() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        write_console(&mut out, &sample()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Run Summary"));
        assert!(text.contains("Seed 42 from 00:00:00 to 00:10:00 (600 ticks)"));
        assert!(text.contains("Hangar"));
        assert!(text.contains("Autopilot Log"));
    }
}
