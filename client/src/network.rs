//! Client side of a session: one TCP stream to the host, polled once per frame

use log::{debug, info, warn};
use shared::protocol::{format_line, split_line, Command};
use shared::{
    InputSample, LineFramer, RoomSnapshot, SessionError, StateSnapshot, INPUT_SEND_RATE,
};
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tokio::sync::mpsc;

pub const DEFAULT_FIRE_COOLDOWN: f32 = 0.08;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Display name sent with `JOIN`
    pub name: String,
    /// Input samples per second
    pub send_rate: f32,
    pub connect_timeout: Duration,
    /// Minimum seconds between two `FIRE` sends
    pub fire_cooldown: f32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            send_rate: INPUT_SEND_RATE,
            connect_timeout: Duration::from_secs(5),
            fire_cooldown: DEFAULT_FIRE_COOLDOWN,
        }
    }
}

/// What the host sent, decoded for presentation code
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Room(RoomSnapshot),
    Start,
    State(StateSnapshot),
    /// Any other command, passed through untouched
    Command { command: String, payload: String },
    Disconnected,
}

pub struct SessionClient {
    config: ClientConfig,
    framer: Option<LineFramer<TcpStream>>,
    server_addr: Option<SocketAddr>,
    input: Option<InputSample>,
    send_timer: f32,
    since_fire: f32,
    started: bool,
    subscribers: Vec<mpsc::UnboundedSender<ClientEvent>>,
}

impl SessionClient {
    pub fn new(config: ClientConfig) -> Self {
        let since_fire = config.fire_cooldown;
        Self {
            config,
            framer: None,
            server_addr: None,
            input: None,
            send_timer: 0.0,
            since_fire,
            started: false,
            subscribers: Vec::new(),
        }
    }

    /// Connects to the host and announces ourselves with `JOIN`.
    pub fn connect(&mut self, addr: &str) -> Result<SocketAddr, SessionError> {
        if self.framer.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        let connect_error = |source| SessionError::Connect {
            addr: addr.to_string(),
            source,
        };

        let mut last_error =
            io::Error::new(io::ErrorKind::InvalidInput, "address resolved to nothing");
        let mut connected = None;
        for candidate in addr.to_socket_addrs().map_err(connect_error)? {
            match TcpStream::connect_timeout(&candidate, self.config.connect_timeout) {
                Ok(stream) => {
                    connected = Some((stream, candidate));
                    break;
                }
                Err(e) => {
                    debug!("Connect to {} failed: {}", candidate, e);
                    last_error = e;
                }
            }
        }
        let (stream, server_addr) = connected.ok_or_else(|| connect_error(last_error))?;

        stream.set_nonblocking(true).map_err(connect_error)?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("TCP_NODELAY not set: {}", e);
        }

        let mut framer = LineFramer::new(stream);
        framer.write(&format_line(Command::Join.as_str(), &self.config.name));

        info!("Connected to {} as '{}'", server_addr, self.config.name);
        self.framer = Some(framer);
        self.server_addr = Some(server_addr);
        self.send_timer = 0.0;
        self.since_fire = self.config.fire_cooldown;
        self.started = false;
        Ok(server_addr)
    }

    pub fn is_connected(&self) -> bool {
        self.framer.is_some()
    }

    /// Whether `START` has been received on this connection.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server_addr
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ClientEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Replaces the sample sent on the next send slot.
    pub fn set_input(&mut self, input: InputSample) {
        self.input = Some(input);
    }

    /// Polls the stream and sends at most one input sample.
    pub fn update(&mut self, dt: f32) {
        if self.framer.is_none() {
            return;
        }

        self.poll_receive();

        self.since_fire += dt;
        self.send_timer += dt;

        let interval = if self.config.send_rate > 0.0 {
            1.0 / self.config.send_rate
        } else {
            f32::INFINITY
        };
        if self.started && self.send_timer >= interval {
            self.send_timer = 0.0;
            if let Some(input) = self.input {
                self.write_line(&input.to_line());
            }
        }
    }

    fn poll_receive(&mut self) {
        let Some(framer) = self.framer.as_mut() else {
            return;
        };
        let lines = framer.drain();
        let closed = framer.is_closed();

        for line in lines {
            self.dispatch(&line);
        }

        if closed {
            info!("Connection to host lost");
            self.close();
        }
    }

    fn dispatch(&mut self, line: &str) {
        let (command, payload) = split_line(line);
        if command.is_empty() {
            return;
        }

        match Command::parse(command) {
            Some(Command::Room) => match RoomSnapshot::from_json(payload) {
                Ok(room) => self.emit(ClientEvent::Room(room)),
                Err(e) => warn!("Bad ROOM payload: {}", e),
            },
            Some(Command::Start) => {
                info!("Match started");
                self.started = true;
                self.send_timer = 0.0;
                self.emit(ClientEvent::Start);
            }
            Some(Command::State) => match StateSnapshot::from_json(payload) {
                Ok(state) => self.emit(ClientEvent::State(state)),
                Err(e) => warn!("Bad STATE payload: {}", e),
            },
            _ => self.emit(ClientEvent::Command {
                command: command.to_string(),
                payload: payload.to_string(),
            }),
        }
    }

    /// Sends `FIRE` unless the local cooldown is still running.
    pub fn fire(&mut self) -> bool {
        if self.framer.is_none() || self.since_fire < self.config.fire_cooldown {
            return false;
        }
        self.since_fire = 0.0;
        self.write_line(Command::Fire.as_str())
    }

    pub fn set_ready(&mut self, ready: bool) -> bool {
        self.send_line(Command::Ready.as_str(), if ready { "1" } else { "0" })
    }

    /// Asks the host to start the match.
    pub fn request_start(&mut self) -> bool {
        self.send_line(Command::Start.as_str(), "")
    }

    /// Sends an arbitrary command. Returns false when not connected.
    pub fn send_line(&mut self, command: &str, payload: &str) -> bool {
        self.write_line(&format_line(command, payload))
    }

    fn write_line(&mut self, line: &str) -> bool {
        match self.framer.as_mut() {
            Some(framer) => {
                framer.write(line);
                true
            }
            None => false,
        }
    }

    /// Says goodbye with `LEAVE`, then disconnects.
    pub fn leave(&mut self) -> bool {
        if !self.send_line(Command::Leave.as_str(), "") {
            return false;
        }
        self.disconnect()
    }

    /// Closes the connection. Returns false if it was already closed.
    pub fn disconnect(&mut self) -> bool {
        if self.framer.is_none() {
            return false;
        }
        info!("Disconnecting");
        self.close();
        true
    }

    fn close(&mut self) {
        if let Some(mut framer) = self.framer.take() {
            framer.flush();
            if let Err(e) = framer.get_ref().shutdown(Shutdown::Both) {
                debug!("Shutdown ignored: {}", e);
            }
            self.started = false;
            self.emit(ClientEvent::Disconnected);
        }
    }

    fn emit(&mut self, event: ClientEvent) {
        for subscriber in &self.subscribers {
            let _ = subscriber.send(event.clone());
        }
        self.subscribers.retain(|tx| !tx.is_closed());
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::time::Instant;

    /// A plain blocking socket playing the host.
    struct FakeHost {
        reader: BufReader<TcpStream>,
        writer: TcpStream,
    }

    impl FakeHost {
        fn read_line(&mut self) -> String {
            let mut line = String::new();
            self.reader.read_line(&mut line).unwrap();
            line.trim_end().to_string()
        }

        fn send(&mut self, line: &str) {
            self.writer.write_all(line.as_bytes()).unwrap();
            self.writer.write_all(b"\n").unwrap();
        }
    }

    fn connected(config: ClientConfig) -> (SessionClient, FakeHost) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = SessionClient::new(config);
        client.connect(&addr.to_string()).unwrap();

        let (stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let writer = stream.try_clone().unwrap();
        (
            client,
            FakeHost {
                reader: BufReader::new(stream),
                writer,
            },
        )
    }

    fn pump_until<F: Fn(&[ClientEvent]) -> bool>(
        client: &mut SessionClient,
        rx: &mut mpsc::UnboundedReceiver<ClientEvent>,
        done: F,
    ) -> Vec<ClientEvent> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut events = Vec::new();
        while !done(events.as_slice()) && Instant::now() < deadline {
            client.update(0.001);
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        events
    }

    #[test]
    fn test_connect_sends_join() {
        let (client, mut host) = connected(ClientConfig {
            name: "Alice".to_string(),
            ..Default::default()
        });
        assert!(client.is_connected());
        assert_eq!(host.read_line(), "JOIN|Alice");
    }

    #[test]
    fn test_connect_refused() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let mut client = SessionClient::new(ClientConfig::default());
        let result = client.connect(&addr.to_string());
        assert!(matches!(result, Err(SessionError::Connect { .. })));
        assert!(!client.is_connected());
    }

    #[test]
    fn test_connect_twice_fails() {
        let (mut client, _host) = connected(ClientConfig::default());
        assert!(matches!(
            client.connect("127.0.0.1:1"),
            Err(SessionError::AlreadyRunning)
        ));
    }

    #[test]
    fn test_received_commands_become_events() {
        let (mut client, mut host) = connected(ClientConfig::default());
        let mut rx = client.subscribe();

        host.send(r#"ROOM|{"players":[{"id":1,"name":"Alice","ready":true}]}"#);
        host.send("START");
        host.send(r#"STATE|{"players":[{"id":1,"x":1.000,"y":0.000,"z":-2.500,"yaw":90.0,"hp":75}]}"#);
        host.send("SAY|hello|world");
        host.send("STATE|not json");

        let events = pump_until(&mut client, &mut rx, |e| e.len() >= 4);
        assert_eq!(events.len(), 4);

        match &events[0] {
            ClientEvent::Room(room) => assert!(room.get(1).unwrap().ready),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(events[1], ClientEvent::Start);
        match &events[2] {
            ClientEvent::State(state) => {
                let actor = state.get(1).unwrap();
                assert_eq!(actor.z, -2.5);
                assert_eq!(actor.hp, 75);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            events[3],
            ClientEvent::Command {
                command: "SAY".to_string(),
                payload: "hello|world".to_string()
            }
        );
        assert!(client.is_started());
    }

    #[test]
    fn test_input_is_sent_at_bounded_rate_after_start() {
        let (mut client, mut host) = connected(ClientConfig {
            send_rate: 10.0,
            ..Default::default()
        });
        let mut rx = client.subscribe();
        assert!(host.read_line().starts_with("JOIN"));

        client.set_input(InputSample::default());
        client.update(0.5);
        assert!(!client.is_started());

        host.send("START");
        pump_until(&mut client, &mut rx, |e| e.contains(&ClientEvent::Start));

        // One long frame still yields a single send.
        client.update(1.0);
        client.update(0.06);
        client.update(0.06);
        client.send_line("MARK", "");

        assert_eq!(host.read_line(), "INPUTW|0.000,0.000,0.0,0.0");
        assert_eq!(host.read_line(), "INPUTW|0.000,0.000,0.0,0.0");
        assert_eq!(host.read_line(), "MARK");
    }

    #[test]
    fn test_fire_respects_local_cooldown() {
        let (mut client, mut host) = connected(ClientConfig::default());
        host.read_line();

        assert!(client.fire());
        assert!(!client.fire());
        client.update(0.05);
        assert!(!client.fire());
        client.update(0.05);
        assert!(client.fire());

        assert_eq!(host.read_line(), "FIRE");
        assert_eq!(host.read_line(), "FIRE");
    }

    #[test]
    fn test_ready_start_and_leave() {
        let (mut client, mut host) = connected(ClientConfig::default());
        let mut rx = client.subscribe();
        host.read_line();

        assert!(client.set_ready(true));
        assert!(client.set_ready(false));
        assert!(client.request_start());
        assert!(client.leave());
        assert!(!client.is_connected());
        assert!(!client.leave());
        assert!(!client.disconnect());
        assert!(!client.fire());

        assert_eq!(host.read_line(), "READY|1");
        assert_eq!(host.read_line(), "READY|0");
        assert_eq!(host.read_line(), "START");
        assert_eq!(host.read_line(), "LEAVE");
        assert_eq!(rx.try_recv().unwrap(), ClientEvent::Disconnected);
    }

    #[test]
    fn test_host_closing_is_detected() {
        let (mut client, host) = connected(ClientConfig::default());
        let mut rx = client.subscribe();
        drop(host);

        let events = pump_until(&mut client, &mut rx, |e| {
            e.contains(&ClientEvent::Disconnected)
        });
        assert!(events.contains(&ClientEvent::Disconnected));
        assert!(!client.is_connected());
    }
}
