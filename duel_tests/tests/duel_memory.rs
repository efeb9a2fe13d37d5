//! Two full sessions talking over an in-memory channel.

use duel_peer::input::{InputButtons, InputFrame};
use duel_shared::config::{GameConfig, Role};
use duel_shared::event::LifecycleEvent;
use duel_shared::kinematics::Contact;
use duel_shared::lifecycle::{FireOutcome, FireRejection, LifeState, ShotTarget};
use duel_shared::link::LinkError;
use duel_shared::net::PeerIdentity;
use duel_shared::presentation::Entity;
use duel_tests::{facing, idle, init_tracing, session_pair, shoot_at, Clock};

#[tokio::test]
async fn both_sides_agree_on_spawns() -> anyhow::Result<()> {
    init_tracing();
    let cfg = GameConfig::default();
    let (alpha, beta) = session_pair(&cfg, "alpha", "beta")?;

    // "BETA" > "ALPHA": beta wins the roll and takes spawn A.
    assert!(beta.spawns().local_wins);
    assert!(!alpha.spawns().local_wins);
    assert_eq!(beta.local().position(), cfg.spawns.a);
    assert_eq!(alpha.local().position(), cfg.spawns.b);
    assert_eq!(alpha.spawns().remote, beta.spawns().local);
    assert_eq!(beta.spawns().remote, alpha.spawns().local);
    Ok(())
}

#[tokio::test]
async fn role_override_breaks_name_tie() -> anyhow::Result<()> {
    let mut host_cfg = GameConfig::default();
    host_cfg.link.role = Some(Role::Host);
    let (host, _guest) = session_pair(&host_cfg, "lab-pc", "LAB-PC")?;
    assert_eq!(host.local().position(), host_cfg.spawns.a);

    let err = session_pair(&GameConfig::default(), "lab-pc", "LAB-PC").err();
    let collision = err
        .as_ref()
        .and_then(|e| e.downcast_ref::<LinkError>())
        .cloned();
    assert_eq!(
        collision,
        Some(LinkError::IdentityCollision(PeerIdentity::new("lab-pc")))
    );
    Ok(())
}

#[tokio::test]
async fn movement_replicates_last_writer_wins() -> anyhow::Result<()> {
    init_tracing();
    let cfg = GameConfig::default();
    let (mut alpha, mut beta) = session_pair(&cfg, "alpha", "beta")?;
    let mut clock = Clock::new(cfg.tick_hz);

    // Three alpha ticks before beta drains anything.
    let start = alpha.local().position();
    for step in 1..=3 {
        let now = clock.advance();
        let frame = InputFrame {
            buttons: InputButtons::empty(),
            view: facing(start, beta.local().position(), 100.0 - step as f32),
        };
        let r = alpha.tick(now, clock.dt, frame).await;
        assert!(r.broadcast_ok);
    }

    let r = beta.tick(clock.advance(), clock.dt, InputFrame::default()).await;
    assert_eq!(r.inbound_applied, 3);
    assert_eq!(beta.remote().position(), alpha.local().position());
    assert_eq!(beta.remote().orientation(), alpha.local().orientation());

    // Alpha learns about beta too.
    let r = alpha.tick(clock.advance(), clock.dt, InputFrame::default()).await;
    assert_eq!(r.inbound_applied, 1);
    assert_eq!(alpha.remote().position(), beta.local().position());
    Ok(())
}

#[tokio::test]
async fn jump_is_visible_to_the_other_side() -> anyhow::Result<()> {
    let cfg = GameConfig::default();
    let (mut alpha, mut beta) = session_pair(&cfg, "alpha", "beta")?;
    let mut clock = Clock::new(cfg.tick_hz);
    let ground = alpha.local().position().y;

    let r = alpha
        .tick(clock.advance(), clock.dt, InputFrame::pressed(InputButtons::JUMP))
        .await;
    assert_eq!(r.contact, Some(Contact::Airborne));
    idle(&mut alpha, &mut beta, &mut clock, 20).await;
    assert!(beta.remote().position().y > ground + 1.0);

    // Back on the floor well within two seconds.
    let mut landed = false;
    for _ in 0..120 {
        let r = alpha.tick(clock.advance(), clock.dt, InputFrame::default()).await;
        if r.contact == Some(Contact::Landed) {
            landed = true;
            break;
        }
    }
    assert!(landed);
    assert!((alpha.local().position().y - ground).abs() < 1e-3);
    Ok(())
}

#[tokio::test]
async fn kill_respawn_and_scoreboard() -> anyhow::Result<()> {
    init_tracing();
    let cfg = GameConfig::default();
    let (mut alpha, mut beta) = session_pair(&cfg, "alpha", "beta")?;
    let mut clock = Clock::new(cfg.tick_hz);
    idle(&mut alpha, &mut beta, &mut clock, 2).await;

    let now = clock.advance();
    let r = alpha.tick(now, clock.dt, shoot_at(&alpha, 20.0)).await;
    let shot = r.fire.and_then(|f| f.shot().copied());
    assert_eq!(
        shot.map(|s| s.target),
        Some(ShotTarget::Opponent { killed: true })
    );
    assert_eq!(
        r.events,
        vec![
            LifecycleEvent::Death {
                player: PeerIdentity::new("beta")
            },
            LifecycleEvent::Kill {
                shooter: PeerIdentity::new("alpha")
            },
        ]
    );
    assert_eq!(alpha.remote().life_state(), LifeState::Dead);
    assert_eq!(alpha.scoreboard().text(), "Kills: 1 | Deaths: 0");
    assert_eq!(alpha.presentation().visibility(Entity::RemoteAvatar), Some(false));

    // Only transforms cross the wire, so beta's own machine keeps it alive.
    beta.tick(now, clock.dt, InputFrame::default()).await;
    assert!(beta.local().is_alive());
    assert_eq!(beta.scoreboard().deaths, 0);

    // Still dead just before the delay; back at the spawn right after.
    alpha.tick(now + 2.9, clock.dt, InputFrame::default()).await;
    assert_eq!(alpha.remote().life_state(), LifeState::Dead);
    let r = alpha.tick(now + 3.0, clock.dt, InputFrame::default()).await;
    assert!(r.events.contains(&LifecycleEvent::Respawn {
        player: PeerIdentity::new("beta")
    }));
    assert_eq!(alpha.remote().health(), cfg.combat.max_health);
    assert_eq!(alpha.presentation().visibility(Entity::RemoteAvatar), Some(true));
    assert_eq!(alpha.scoreboard().text(), "Kills: 1 | Deaths: 0");
    Ok(())
}

#[tokio::test]
async fn trigger_respects_cooldown() -> anyhow::Result<()> {
    let cfg = GameConfig::default();
    let (mut alpha, _beta) = session_pair(&cfg, "alpha", "beta")?;

    // Aim away from the opponent so every shot lands in the world.
    let mut away = shoot_at(&alpha, 20.0);
    if let Some(v) = away.view.as_mut() {
        v.orientation = duel_shared::math::Quat::from_yaw(0.0);
    }

    let r = alpha.tick(10.0, cfg.tick_dt(), away).await;
    assert!(matches!(r.fire, Some(FireOutcome::Fired(_))));
    let r = alpha.tick(10.3, cfg.tick_dt(), away).await;
    assert_eq!(r.fire, Some(FireOutcome::Rejected(FireRejection::Cooldown)));
    let r = alpha.tick(10.5, cfg.tick_dt(), away).await;
    assert!(matches!(r.fire, Some(FireOutcome::Fired(_))));
    assert_eq!(alpha.presentation().effects().count(), 2);
    assert!(alpha.remote().is_alive());
    Ok(())
}

#[tokio::test]
async fn self_destruct_counts_a_death_and_freezes_view() -> anyhow::Result<()> {
    let cfg = GameConfig::default();
    let (mut alpha, mut beta) = session_pair(&cfg, "alpha", "beta")?;
    let mut clock = Clock::new(cfg.tick_hz);

    let now = clock.advance();
    beta.tick(now, clock.dt, InputFrame::pressed(InputButtons::SELF_DESTRUCT))
        .await;
    assert_eq!(beta.local().life_state(), LifeState::Dead);
    assert_eq!(beta.scoreboard().text(), "Kills: 0 | Deaths: 1");
    assert_eq!(beta.presentation().visibility(Entity::DeathOverlay), Some(true));
    assert_eq!(beta.presentation().visibility(Entity::Gun), Some(false));

    // Input is ignored while dead; the view stays put.
    let frozen = beta.local().position();
    let walk = InputFrame {
        buttons: InputButtons::JUMP,
        view: facing(frozen, alpha.local().position(), 5.0),
    };
    let r = beta.tick(clock.advance(), clock.dt, walk).await;
    assert_eq!(r.contact, None);
    assert_eq!(beta.local().position(), frozen);

    // Alpha only ever sees the frozen transform.
    alpha.tick(clock.advance(), clock.dt, InputFrame::default()).await;
    assert_eq!(alpha.remote().position(), frozen);
    assert_eq!(alpha.scoreboard().kills, 0);

    let r = beta
        .tick(clock.advance_secs(cfg.combat.respawn_delay), clock.dt, InputFrame::default())
        .await;
    assert!(r.events.contains(&LifecycleEvent::Respawn {
        player: PeerIdentity::new("beta")
    }));
    assert_eq!(beta.local().position(), beta.spawns().local);
    assert_eq!(beta.presentation().visibility(Entity::DeathOverlay), Some(false));
    Ok(())
}

#[tokio::test]
async fn silent_peer_does_not_stop_the_tick() -> anyhow::Result<()> {
    let cfg = GameConfig::default();
    let (mut alpha, beta) = session_pair(&cfg, "alpha", "beta")?;
    let shadow = alpha.remote().position();
    drop(beta);

    let mut clock = Clock::new(cfg.tick_hz);
    for _ in 0..5 {
        let r = alpha.tick(clock.advance(), clock.dt, InputFrame::default()).await;
        assert!(!r.broadcast_ok);
        assert_eq!(r.inbound_applied, 0);
    }
    assert_eq!(alpha.link().stats().send_failures, 5);
    assert_eq!(alpha.remote().position(), shadow);
    Ok(())
}
