use keyspace_rt::config::MonitorConfig;
use keyspace_rt::prelude::*;
use keyspace_rt::utils::config_io::load_cfg;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const DEFAULT_CONFIG: &str = "example/config/monitor.json";

/// Turns key-space notifications on for the database behind `db`.
fn enable_notifications(db: &DbConfig) -> anyhow::Result<()> {
    let mut conn = Connection::connect(db)?;
    conn.command(&["CONFIG", "SET", "notify-keyspace-events", "KA"])?;
    Ok(())
}

pub fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let cfg: MonitorConfig = load_cfg(&path)?;
    let _guard = cfg.logger.init()?;

    let registry = DbRegistry::new(cfg.registry.clone());
    let terminate = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGTERM, terminate.clone())?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, terminate.clone())?;

    let mut select = Select::new()?;
    let mut subscribers: Vec<Rc<RefCell<PatternSubscriber>>> = Vec::new();
    for sub_cfg in &cfg.subscribers {
        enable_notifications(registry.get(&sub_cfg.db)?)?;
        let sub = PatternSubscriber::from_config(&registry, sub_cfg)?.into_shared();
        select.add_selectable(&sub)?;
        subscribers.push(sub);
    }
    tracing::info!(
        "[Monitor] watching {} subscribers, capacity {}",
        subscribers.len(),
        select.capacity()
    );

    let timeout = cfg.event_loop.select_timeout_ms();
    let interrupt = cfg.event_loop.interrupt_on_signal();
    while !terminate.load(Ordering::Relaxed) {
        match select.select(timeout, interrupt) {
            SelectOutcome::Object(selected) => {
                let Some(sub) = subscribers.iter().find(|s| selected.is(s)) else {
                    continue;
                };
                let messages = sub.borrow_mut().pops();
                for msg in messages {
                    println!("{}", serde_json::to_string(&msg)?);
                }
            }
            SelectOutcome::Timeout => tracing::trace!("[Monitor] select timeout"),
            SelectOutcome::Signal => tracing::debug!("[Monitor] interrupted by signal"),
            SelectOutcome::Error => {
                tracing::error!("[Monitor] select error, exiting");
                anyhow::bail!("select failed");
            }
        }
    }

    tracing::info!("[Monitor] stopped");
    Ok(())
}
