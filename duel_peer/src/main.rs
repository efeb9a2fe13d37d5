//! Headless duel peer.
//!
//! Usage:
//!   cargo run -p duel_peer -- [--config duel.json] [--name ID] [--peer ID]
//!       [--peer-addr HOST:PORT] [--bind ADDR] [--role host|guest]
//!       [--tick-hz N] [--assets DIR]
//!
//! Connects to the other peer, then runs the duel at a fixed tick rate.
//! Input comes from console lines.
//!
//! Console commands:
//!   jump | fire | die       - Press a button for the next tick
//!   turn <degrees>          - Rotate the view
//!   walk <units>            - Move along the view direction
//!   status                  - Show player and link status
//!   quit                    - Exit

use std::env;
use std::io::{BufRead, Write};
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use duel_peer::identity::{machine_name, resolve_local_identity};
use duel_peer::input::{ConsoleInput, InputSource, WalkNavigator};
use duel_peer::log_presenter::TracingPresentation;
use duel_peer::session::{DuelSession, SessionDeps};
use duel_shared::assets::{AssetCatalog, LoaderChain};
use duel_shared::collision::BoxWorld;
use duel_shared::config::{GameConfig, Role};
use duel_shared::lifecycle::LifeState;
use duel_shared::link::{connect, RetryPolicy};
use duel_shared::net::{PeerIdentity, UdpOpener};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn};

fn parse_args() -> anyhow::Result<GameConfig> {
    let args: Vec<String> = env::args().collect();

    // The config file is the base; flags override it.
    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) if i + 1 < args.len() => GameConfig::load(&args[i + 1])?,
        _ => GameConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => i += 2,
            "--name" if i + 1 < args.len() => {
                cfg.link.local_identity = args[i + 1].clone();
                i += 2;
            }
            "--peer" if i + 1 < args.len() => {
                cfg.link.peer_identity = args[i + 1].clone();
                i += 2;
            }
            "--peer-addr" if i + 1 < args.len() => {
                cfg.link.peer_addr = Some(args[i + 1].clone());
                i += 2;
            }
            "--bind" if i + 1 < args.len() => {
                cfg.link.bind_addr = args[i + 1].clone();
                i += 2;
            }
            "--role" if i + 1 < args.len() => {
                let role: Role = args[i + 1].parse()?;
                cfg.link.role = Some(role);
                i += 2;
            }
            "--tick-hz" if i + 1 < args.len() => {
                cfg.tick_hz = args[i + 1].parse().context("--tick-hz")?;
                i += 2;
            }
            "--assets" if i + 1 < args.len() => {
                cfg.assets_dir = args[i + 1].clone();
                i += 2;
            }
            _ => i += 1,
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn prompt_peer_identity() -> anyhow::Result<PeerIdentity> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("Enter the other player's computer name: ");
        stdout.flush().context("flush stdout")?;
        let mut line = String::new();
        let read = stdin.lock().read_line(&mut line).context("read peer name")?;
        if read == 0 {
            anyhow::bail!("stdin closed before a peer name was entered");
        }
        let id = PeerIdentity::new(&line);
        if !id.is_empty() {
            return Ok(id);
        }
    }
}

fn opener(cfg: &GameConfig) -> anyhow::Result<UdpOpener> {
    let bind_addr: SocketAddr = cfg
        .link
        .bind_addr
        .parse()
        .with_context(|| format!("bind address {}", cfg.link.bind_addr))?;
    let peer_addr = cfg
        .link
        .peer_addr
        .as_deref()
        .map(|a| a.parse::<SocketAddr>().with_context(|| format!("peer address {a}")))
        .transpose()?;
    Ok(UdpOpener {
        bind_addr,
        port: cfg.link.port,
        peer_addr,
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args().context("configuration")?;
    let local = resolve_local_identity(&cfg.link.local_identity, machine_name())?;
    let peer = if cfg.link.peer_identity.trim().is_empty() {
        prompt_peer_identity()?
    } else {
        PeerIdentity::new(&cfg.link.peer_identity)
    };
    info!(%local, %peer, tick_hz = cfg.tick_hz, assets = %cfg.assets_dir, "Starting peer");

    let opener = opener(&cfg)?;
    let policy = RetryPolicy::from_config(&cfg.link);
    let link = connect(&opener, local, peer, &policy)
        .await
        .context("connect to peer")?;

    let mut chain = LoaderChain::standard(&cfg.assets_dir);
    let assets = AssetCatalog::load(&mut chain);
    let deps = SessionDeps {
        oracle: Box::new(BoxWorld::warehouse()),
        presentation: TracingPresentation::new(),
        assets,
    };
    let tick_dt = cfg.tick_dt();
    let mut session = DuelSession::new(cfg, link, deps).context("start session")?;

    let (console_tx, console_rx) = mpsc::channel::<String>(32);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    let spawn = session.local().position();
    let mut input = ConsoleInput::new(console_rx, WalkNavigator::new(spawn, 0.0));

    println!("Connected. Type 'status' for info, 'quit' to exit.");
    println!();

    let tick_interval = Duration::from_secs_f32(tick_dt);
    let started = Instant::now();
    let mut next_tick = started;

    loop {
        let frame = input.sample();
        if input.quit_requested {
            break;
        }
        if input.status_requested {
            input.status_requested = false;
            for line in session.status_lines() {
                println!("{line}");
            }
        }

        let was_dead = session.local().life_state() == LifeState::Dead;
        let now = started.elapsed().as_secs_f64();
        let report = session.tick(now, tick_dt, frame).await;
        if was_dead && session.local().is_alive() {
            input.place(session.local().position());
        }

        if !report.broadcast_ok && report.tick % u64::from(session.config().tick_hz) == 0 {
            warn!(tick = report.tick, "Peer unreachable");
        }

        next_tick += tick_interval;
        tokio::time::sleep_until(next_tick).await;
    }

    info!(ticks = session.ticks(), score = %session.scoreboard().text(), "Exiting");
    Ok(())
}
