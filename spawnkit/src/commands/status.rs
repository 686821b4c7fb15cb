//! Fleet dashboard.
//!
//! Runs one refresh (falling back to demo data when the provider is down)
//! and prints agents, sub-tasks, missions and crons.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use spawnkit_core::{AgentStatus, CanonicalSnapshot, Mode, SubTaskStatus};
use spawnkit_sdk::DebugInfo;
use spawnkit_sdk::utils::{now_ms, relative_time};

use crate::config::Config;

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    engine: &'a DebugInfo,
    snapshot: &'a CanonicalSnapshot,
}

pub async fn execute(json: bool, config: &Config) -> Result<()> {
    let kit = super::open(config, config.one_shot_engine())?;
    kit.init().await;

    let info = kit.debug_info().await;
    let snapshot = kit.snapshot();

    if json {
        let report = StatusReport {
            engine: &info,
            snapshot: &snapshot,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_dashboard(&info, &snapshot, now_ms());
    }
    Ok(())
}

fn status_badge(status: AgentStatus) -> colored::ColoredString {
    match status {
        AgentStatus::Active => "ACTIVE".green().bold(),
        AgentStatus::Idle => "IDLE".yellow(),
        AgentStatus::Offline => "OFFLINE".red(),
    }
}

fn print_dashboard(info: &DebugInfo, snapshot: &CanonicalSnapshot, now: i64) {
    println!();
    print!("  {} ", "Source:".cyan().bold());
    match info.mode {
        Mode::Live => println!("{} ({})", "LIVE".green().bold(), info.provider),
        Mode::Demo => {
            println!("{} ({} unavailable)", "DEMO".yellow().bold(), info.provider);
            if let Some(err) = &info.last_error {
                println!("    Last error: {}", err.dimmed());
            }
        }
    }

    println!();
    println!("  {}", "Agents".cyan().bold());
    if snapshot.agents.is_empty() {
        println!("    {}", "(none)".dimmed());
    }
    for agent in &snapshot.agents {
        println!(
            "    {:<12} {:<8} {:>10} tok  {:<10} {}",
            agent.display_name,
            status_badge(agent.status),
            agent.tokens_used,
            relative_time(agent.last_active_at_ms, now),
            agent.current_task.dimmed()
        );
    }

    if !snapshot.subtasks.is_empty() {
        println!();
        println!("  {}", "Sub-tasks".cyan().bold());
        for subtask in &snapshot.subtasks {
            let marker = match subtask.status {
                SubTaskStatus::Running => "●".green(),
                SubTaskStatus::Completed => "✓".dimmed(),
            };
            println!(
                "    {} {:<26} {}",
                marker,
                subtask.structured_name.as_deref().unwrap_or(&subtask.id),
                subtask.task
            );
        }
    }

    if !snapshot.missions.is_empty() {
        println!();
        println!("  {}", "Missions".cyan().bold());
        for mission in &snapshot.missions {
            println!(
                "    [{:<6}] {:>3.0}%  {}",
                mission.priority.to_string(),
                mission.progress * 100.0,
                mission.title
            );
        }
    }

    if !snapshot.crons.is_empty() {
        println!();
        println!("  {}", "Crons".cyan().bold());
        for cron in &snapshot.crons {
            let name = if cron.enabled {
                cron.name.normal()
            } else {
                cron.name.dimmed()
            };
            println!(
                "    {:<20} {:<18} last {}",
                name,
                cron.human_readable_schedule,
                relative_time(cron.last_run_at_ms, now)
            );
        }
    }

    let metrics = &snapshot.metrics;
    println!();
    println!(
        "  {} {} active agents, {} running sub-tasks, {} tokens (~${:.2})",
        "Totals:".cyan().bold(),
        metrics.active_agents,
        metrics.active_subtasks,
        metrics.total_tokens,
        metrics.cost_estimate
    );
    println!();
}
