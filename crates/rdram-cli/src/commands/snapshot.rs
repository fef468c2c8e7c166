//! Snapshot command implementation.

use std::time::Duration;

use anyhow::{Result, bail};
use chrono::Local;
use owo_colors::OwoColorize;
use rdram_core::{BridgeConfig, Error, GameMonitor, GameStateSnapshot};
use tracing::warn;

use super::{attach, build_monitor, install_shutdown};

/// Print one snapshot, or keep printing until Ctrl+C
pub async fn run(
    config: &BridgeConfig,
    pid: Option<u32>,
    title: Option<&str>,
    watch: bool,
    interval: Duration,
    json: bool,
) -> Result<()> {
    let memory = attach(config, pid)?;
    let monitor = build_monitor(config, memory, title)?;

    if !watch {
        let snapshot = monitor.snapshot().map_err(|e| anyhow::anyhow!(e.status_message()))?;
        print_snapshot(&monitor, &snapshot, json)?;
        return Ok(());
    }

    let shutdown = install_shutdown()?;
    loop {
        match monitor.snapshot() {
            Ok(snapshot) => print_snapshot(&monitor, &snapshot, json)?,
            Err(e) if e.is_terminal() => bail!("{}", e.status_message()),
            Err(Error::RegionNotFound(reason)) => warn!("Console RAM not found yet: {}", reason),
            Err(e) => return Err(e.into()),
        }
        if shutdown.wait(interval).await {
            break;
        }
    }
    Ok(())
}

fn print_snapshot(monitor: &GameMonitor, snapshot: &GameStateSnapshot, json: bool) -> Result<()> {
    let timestamp = Local::now().format("%H:%M:%S%.3f");

    if json {
        let line = serde_json::json!({
            "time": timestamp.to_string(),
            "title": monitor.title(),
            "snapshot": snapshot,
            "is_game_over": snapshot.is_game_over(),
            "is_out_of_lives": snapshot.is_out_of_lives(),
            "is_out_of_health": snapshot.is_out_of_health(),
            "is_paused": snapshot.is_paused(),
        });
        println!("{}", serde_json::to_string(&line)?);
        return Ok(());
    }

    println!("[{}] {}", timestamp, monitor.title().unwrap_or("untitled").bold());
    match snapshot.position() {
        Some(pos) => println!("  position: ({:.1}, {:.1}, {:.1})", pos.x, pos.y, pos.z),
        None => println!("  position: -"),
    }
    println!("  health:   {}", show(snapshot.health));
    println!("  lives:    {}", show(snapshot.lives));
    println!("  coins:    {}", show(snapshot.coins));
    println!("  stars:    {}", show(snapshot.stars));
    println!("  score:    {}", show(snapshot.score));
    println!("  state:    {}", show(snapshot.game_state));

    if snapshot.is_game_over() {
        println!("  {}", "GAME OVER".red().bold());
    } else if snapshot.is_paused() {
        println!("  {}", "PAUSED".yellow());
    }
    if !snapshot.unreadable.is_empty() {
        let names: Vec<String> = snapshot.unreadable.iter().map(|f| f.to_string()).collect();
        println!("  {} {}", "unreadable:".yellow(), names.join(", "));
    }
    Ok(())
}

fn show<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
