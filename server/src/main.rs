use clap::Parser;
use log::{error, info, warn};
use server::config::{parse_spawn_point, SessionConfig, SimulationConfig, SpawnSelection};
use server::session::{ServerSession, SessionEvent};
use shared::{Vec3, HOST_PARTICIPANT_ID};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Simulation ticks per second
    #[arg(short, long, default_value_t = shared::TICK_RATE)]
    tick_rate: f32,

    /// Frames per second of the session loop
    #[arg(long, default_value = "60")]
    frame_rate: u32,

    /// Seconds between periodic ROOM broadcasts
    #[arg(long, default_value_t = shared::ROOM_BROADCAST_INTERVAL)]
    room_interval: f32,

    /// Maximum simultaneous connections
    #[arg(short, long, default_value = "16")]
    max_clients: usize,

    /// Do not list the hosting process as participant 0
    #[arg(long)]
    no_host_player: bool,

    /// Display name of the host participant
    #[arg(long, default_value = "Host")]
    host_name: String,

    /// Spawn point as x,y,z (repeatable)
    #[arg(long = "spawn", value_parser = parse_spawn_point)]
    spawns: Vec<Vec3>,

    /// Pick respawn points at random instead of in turn
    #[arg(long)]
    random_spawns: bool,
}

/// Commands typed on the host console.
#[derive(Debug)]
enum HostCommand {
    Start,
    Ready(bool),
    Name(String),
    Fire,
    Say(String),
    Quit,
}

impl HostCommand {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
        match word {
            "start" => Some(HostCommand::Start),
            "ready" => Some(HostCommand::Ready(rest.trim() != "0")),
            "name" if !rest.trim().is_empty() => Some(HostCommand::Name(rest.trim().to_string())),
            "fire" => Some(HostCommand::Fire),
            "say" => Some(HostCommand::Say(rest.to_string())),
            "quit" | "exit" => Some(HostCommand::Quit),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let session_config = SessionConfig {
        host: args.host,
        port: args.port,
        room_broadcast_interval: args.room_interval,
        include_host_in_room: !args.no_host_player,
        host_name: args.host_name,
        max_clients: args.max_clients,
    };

    let mut sim_config = SimulationConfig {
        tick_rate: args.tick_rate,
        spawn_selection: if args.random_spawns {
            SpawnSelection::Random
        } else {
            SpawnSelection::RoundRobin
        },
        ..Default::default()
    };
    if !args.spawns.is_empty() {
        sim_config.spawn_points = args.spawns;
    }

    let mut session = ServerSession::new(session_config, sim_config);
    let addr = session.start()?;
    info!("Listening on {} at {} ticks/s", addr, args.tick_rate);
    info!("Console: start | ready [0|1] | name <name> | fire | say <text> | quit");

    let (console_tx, console_rx) = mpsc::unbounded_channel();
    tokio::spawn(read_console(console_tx));

    tokio::select! {
        _ = run_session(&mut session, console_rx, args.frame_rate) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    if let Err(e) = session.stop() {
        warn!("{}", e);
    }
    Ok(())
}

/// Forwards console lines into the session loop.
async fn read_console(tx: mpsc::UnboundedSender<HostCommand>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match HostCommand::parse(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None => warn!("Unknown console command: {}", line.trim()),
            },
            Ok(None) => break,
            Err(e) => {
                error!("Console read failed: {}", e);
                break;
            }
        }
    }
}

/// Drives the session once per frame until the console asks to quit.
async fn run_session(
    session: &mut ServerSession,
    mut console: mpsc::UnboundedReceiver<HostCommand>,
    frame_rate: u32,
) {
    let mut frames = interval(Duration::from_secs_f32(1.0 / frame_rate.max(1) as f32));
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut events = session.subscribe();
    let mut last_update = Instant::now();

    loop {
        frames.tick().await;

        while let Ok(command) = console.try_recv() {
            match command {
                HostCommand::Start => {
                    if !session.host_start() {
                        warn!("Session already active");
                    }
                }
                HostCommand::Ready(ready) => {
                    session.host_set_ready(ready);
                }
                HostCommand::Name(name) => {
                    session.host_set_name(&name);
                }
                HostCommand::Fire => session.inject_command(HOST_PARTICIPANT_ID, "FIRE", ""),
                HostCommand::Say(text) => session.broadcast_line(&format!("SAY|{}", text)),
                HostCommand::Quit => return,
            }
        }

        let now = Instant::now();
        let dt = (now - last_update).as_secs_f32();
        last_update = now;
        session.update(dt);

        while let Ok(event) = events.try_recv() {
            match event {
                SessionEvent::ClientConnected { client_id } => {
                    info!("Client {} joined the lobby", client_id)
                }
                SessionEvent::ClientRemoved { client_id } => {
                    info!("Client {} left the session", client_id)
                }
                SessionEvent::Started => info!("Match started"),
                SessionEvent::Gameplay {
                    from,
                    command,
                    payload,
                } => info!("{} from {}: {}", command, from, payload),
                SessionEvent::Room(_) | SessionEvent::State(_) => {}
            }
        }
    }
}
