use clap::Parser;
use client::game::{ActorChange, WorldView};
use client::input::{InputSampler, DEFAULT_MOUSE_SENSITIVITY, DEFAULT_PITCH_LIMIT};
use client::network::{ClientConfig, ClientEvent, SessionClient, DEFAULT_FIRE_COOLDOWN};
use log::{info, warn};
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:7777")]
    server: String,

    /// Display name in the lobby
    #[arg(short = 'n', long, default_value = "Player")]
    name: String,

    /// Input samples sent per second
    #[arg(long, default_value_t = shared::INPUT_SEND_RATE)]
    send_rate: f32,

    /// Mark ourselves ready right after joining
    #[arg(short = 'r', long)]
    ready: bool,

    /// Ask the host to start once everyone listed is ready
    #[arg(long)]
    start: bool,

    /// Send the legacy INPUT command instead of INPUTW
    #[arg(long)]
    legacy_input: bool,

    /// Degrees per second the bot turns while walking
    #[arg(long, default_value = "30")]
    turn_rate: f32,

    /// Seconds between shots, 0 to never fire
    #[arg(long, default_value = "0")]
    fire_interval: f32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut client = SessionClient::new(ClientConfig {
        name: args.name.clone(),
        send_rate: args.send_rate,
        fire_cooldown: DEFAULT_FIRE_COOLDOWN,
        ..Default::default()
    });
    let mut events = client.subscribe();

    info!("Connecting to: {}", args.server);
    client.connect(&args.server)?;
    if args.ready {
        client.set_ready(true);
    }

    let mut sampler = InputSampler::new(DEFAULT_MOUSE_SENSITIVITY, DEFAULT_PITCH_LIMIT);
    sampler.set_legacy(args.legacy_input);

    let mut view = WorldView::new();
    let mut frames = interval(Duration::from_millis(16));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_update = Instant::now();
    let mut since_shot = 0.0f32;
    let mut start_requested = false;

    loop {
        tokio::select! {
            _ = frames.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, leaving...");
                client.leave();
                break;
            }
        }

        let now = Instant::now();
        let dt = (now - last_update).as_secs_f32();
        last_update = now;

        if view.is_started() {
            // Wander in a slow circle.
            sampler.look(args.turn_rate * dt / DEFAULT_MOUSE_SENSITIVITY, 0.0);
            sampler.set_axes(0.0, 1.0);
            client.set_input(sampler.sample(false));

            since_shot += dt;
            if args.fire_interval > 0.0 && since_shot >= args.fire_interval && client.fire() {
                since_shot = 0.0;
            }
        }

        client.update(dt);

        while let Ok(event) = events.try_recv() {
            for change in view.apply(&event) {
                log_change(&change, view.find_by_name(&args.name));
            }
            match event {
                ClientEvent::Room(room) => {
                    let names: Vec<String> = room
                        .players
                        .iter()
                        .map(|p| format!("{}{}", p.name, if p.ready { "*" } else { "" }))
                        .collect();
                    info!("Lobby: {}", names.join(", "));
                }
                ClientEvent::Start => info!("Match started"),
                ClientEvent::Command { command, payload } => info!("{}: {}", command, payload),
                ClientEvent::State(_) => {}
                ClientEvent::Disconnected => {
                    warn!("Disconnected from host");
                    return Ok(());
                }
            }
        }

        if args.start && !start_requested && !view.is_started() && view.all_ready() {
            start_requested = client.request_start();
        }
    }

    Ok(())
}

fn log_change(change: &ActorChange, own_id: Option<u32>) {
    let who = |id: u32| {
        if Some(id) == own_id {
            "we".to_string()
        } else {
            format!("actor {}", id)
        }
    };

    match *change {
        ActorChange::Damaged { id, amount, hp } => {
            info!("{} took {} damage, {} hp left", who(id), amount, hp)
        }
        ActorChange::Respawned { id } => info!("{} respawned", who(id)),
        ActorChange::Appeared { .. } | ActorChange::Vanished { .. } => {}
    }
}
