/// NetworkTables 4 client
///
/// Connects to the robot's NT server over WebSocket
/// (`ws://<address>:<port>/nt/<client>`, subprotocol
/// `networktables.first.wpi.edu`). Control messages are JSON text frames,
/// topic values are MessagePack binary frames `[id, time_us, type, value]`.
///
/// A single background thread owns the socket: connect, subscribe, publish,
/// apply announced values to a cache, reconnect. The UI thread never touches
/// it. Reads come from the cache and only while a session is up; writes are
/// queued with `try_send` and dropped if the queue is full.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tungstenite::http::HeaderValue;
use tungstenite::{client::IntoClientRequest, Message, WebSocket};

use crate::periodic::CancellationToken;
use crate::remote_table::{RemoteTable, TableValue};

pub const NT_SUBPROTOCOL: &str = "networktables.first.wpi.edu";
pub const CLIENT_NAME: &str = "frc_dashboard";

const WRITE_QUEUE_DEPTH: usize = 256;
const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);
const READ_POLL: Duration = Duration::from_millis(50);
const TIME_SYNC_PERIOD: Duration = Duration::from_secs(3);

/// Topic id reserved for clock synchronisation
const TIME_SYNC_ID: i64 = -1;

// NT4 data type codes used in value frames
const TYPE_DOUBLE: u8 = 1;
const TYPE_INT: u8 = 2;
const TYPE_FLOAT: u8 = 3;
const TYPE_STRING: u8 = 4;

/// `/RobotData/` style prefix covering every key of a table
pub fn table_prefix(table: &str) -> String {
    format!("/{}/", table)
}

pub fn topic_name(table: &str, key: &str) -> String {
    format!("/{}/{}", table, key)
}

fn type_name(value: &TableValue) -> &'static str {
    match value {
        TableValue::Number(_) => "double",
        TableValue::String(_) => "string",
    }
}

fn type_code(value: &TableValue) -> u8 {
    match value {
        TableValue::Number(_) => TYPE_DOUBLE,
        TableValue::String(_) => TYPE_STRING,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscribeOptions {
    #[serde(default)]
    pub prefix: bool,
}

/// JSON control message (one element of a text frame)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "lowercase")]
pub enum ControlMessage {
    Publish {
        name: String,
        pubuid: i64,
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        properties: serde_json::Map<String, serde_json::Value>,
    },
    Unpublish {
        pubuid: i64,
    },
    Subscribe {
        topics: Vec<String>,
        subuid: i64,
        #[serde(default)]
        options: SubscribeOptions,
    },
    Announce {
        name: String,
        id: i64,
        #[serde(rename = "type")]
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pubuid: Option<i64>,
        #[serde(default)]
        properties: serde_json::Map<String, serde_json::Value>,
    },
    Unannounce {
        name: String,
        id: i64,
    },
}

pub fn encode_control(messages: &[ControlMessage]) -> Result<String> {
    Ok(serde_json::to_string(messages)?)
}

/// Decode a text frame. Elements with an unknown method are skipped so one
/// unsupported message does not hide the rest of the frame.
pub fn decode_control(text: &str) -> Result<Vec<ControlMessage>> {
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(text).with_context(|| format!("Malformed control frame: {:?}", text))?;
    let mut messages = Vec::with_capacity(raw.len());
    for element in raw {
        match serde_json::from_value::<ControlMessage>(element) {
            Ok(msg) => messages.push(msg),
            Err(e) => debug!(target: "nt_client", "Skipping control message: {}", e),
        }
    }
    Ok(messages)
}

/// One decoded value frame. `value` is None for types the dashboard does
/// not read (booleans, arrays, raw).
#[derive(Debug, Clone, PartialEq)]
pub struct ValueFrame {
    pub id: i64,
    pub timestamp_us: i64,
    pub type_code: u8,
    pub value: Option<TableValue>,
    /// Integer payload, kept for time sync replies
    pub raw_int: Option<i64>,
}

fn msgpack_value(value: &TableValue) -> rmpv::Value {
    match value {
        TableValue::Number(v) => rmpv::Value::from(*v),
        TableValue::String(s) => rmpv::Value::from(s.as_str()),
    }
}

fn write_frame(buf: &mut Vec<u8>, id: i64, timestamp_us: i64, type_code: u8, payload: rmpv::Value) -> Result<()> {
    let frame = rmpv::Value::Array(vec![
        rmpv::Value::from(id),
        rmpv::Value::from(timestamp_us),
        rmpv::Value::from(type_code),
        payload,
    ]);
    rmpv::encode::write_value(buf, &frame).map_err(|e| anyhow!("MessagePack encode failed: {}", e))
}

pub fn encode_value_frame(id: i64, timestamp_us: i64, value: &TableValue) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_frame(&mut buf, id, timestamp_us, type_code(value), msgpack_value(value))?;
    Ok(buf)
}

fn encode_time_sync(client_time_us: i64) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_frame(&mut buf, TIME_SYNC_ID, 0, TYPE_INT, rmpv::Value::from(client_time_us))?;
    Ok(buf)
}

fn parse_frame(frame: &rmpv::Value) -> Result<ValueFrame> {
    let items = frame
        .as_array()
        .filter(|items| items.len() == 4)
        .ok_or_else(|| anyhow!("Value frame is not a 4 element array: {}", frame))?;
    let id = items[0].as_i64().ok_or_else(|| anyhow!("Bad topic id in {}", frame))?;
    let timestamp_us = items[1].as_i64().unwrap_or(0);
    let type_code = items[2]
        .as_u64()
        .and_then(|t| u8::try_from(t).ok())
        .ok_or_else(|| anyhow!("Bad type code in {}", frame))?;
    let payload = &items[3];
    let value = match type_code {
        TYPE_DOUBLE | TYPE_INT | TYPE_FLOAT => payload.as_f64().map(TableValue::Number),
        TYPE_STRING => payload.as_str().map(|s| TableValue::String(s.to_string())),
        _ => None,
    };
    Ok(ValueFrame {
        id,
        timestamp_us,
        type_code,
        value,
        raw_int: payload.as_i64(),
    })
}

/// Decode a binary frame, which may carry several value messages back to back
pub fn decode_value_frames(mut data: &[u8]) -> Result<Vec<ValueFrame>> {
    let mut frames = Vec::new();
    while !data.is_empty() {
        let frame = rmpv::decode::read_value(&mut data).map_err(|e| anyhow!("MessagePack decode failed: {}", e))?;
        frames.push(parse_frame(&frame)?);
    }
    Ok(frames)
}

enum Outgoing {
    Subscribe(String),
    Put(String, TableValue),
}

#[derive(Debug, Default)]
struct Shared {
    /// Topic values for the current session: server updates plus local puts
    cache: Mutex<HashMap<String, TableValue>>,
    /// Values written by this client, republished after every (re)connect
    published: Mutex<HashMap<String, TableValue>>,
    tables: Mutex<Vec<String>>,
    connected: AtomicBool,
}

impl Shared {
    /// Nothing is answered from the cache without a live session
    fn lookup(&self, topic: &str) -> Option<TableValue> {
        if !self.connected.load(Ordering::SeqCst) {
            return None;
        }
        let cache = self.cache.lock().ok()?;
        cache.get(topic).cloned()
    }

    fn store(&self, topic: &str, value: TableValue) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(topic.to_string(), value);
        }
    }

    fn forget(&self, topic: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(topic);
        }
    }

    fn published_snapshot(&self) -> Vec<(String, TableValue)> {
        self.published
            .lock()
            .map(|p| p.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Seed the cache with our own values before going live
    fn begin_session(&self) {
        let seed = self.published_snapshot();
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
            cache.extend(seed);
        }
    }

    /// Drop everything the server told us; reads fall back to defaults
    fn end_session(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

/// Connection to one NT server. Returns immediately; connecting happens in
/// the background and is retried until the token is cancelled.
pub struct TableClient {
    endpoint: String,
    shared: Arc<Shared>,
    write_tx: Sender<Outgoing>,
    token: CancellationToken,
}

impl TableClient {
    pub fn connect(endpoint: &str, reconnect_delay: Duration, token: CancellationToken) -> Self {
        let shared = Arc::new(Shared::default());
        let (write_tx, write_rx) = bounded(WRITE_QUEUE_DEPTH);

        let thread_endpoint = endpoint.to_string();
        let thread_shared = Arc::clone(&shared);
        let thread_token = token.clone();
        thread::spawn(move || {
            connection_thread(thread_endpoint, reconnect_delay, thread_shared, write_rx, thread_token);
        });

        Self {
            endpoint: endpoint.to_string(),
            shared,
            write_tx,
            token,
        }
    }

    /// Namespaced view of one table. Subscribes to the table prefix on the
    /// current session and on every later reconnect.
    pub fn get_table(&self, name: &str) -> TableHandle {
        if let Ok(mut tables) = self.shared.tables.lock() {
            if !tables.iter().any(|t| t == name) {
                tables.push(name.to_string());
            }
        }
        // Registered first so a session starting concurrently either replays
        // the table or delivers this message.
        let _ = self.write_tx.try_send(Outgoing::Subscribe(name.to_string()));
        TableHandle {
            table: name.to_string(),
            shared: Arc::clone(&self.shared),
            write_tx: self.write_tx.clone(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn shutdown(&self) {
        self.token.cancel();
    }
}

/// `RemoteTable` over the NT topics `/<table>/<key>`
#[derive(Clone)]
pub struct TableHandle {
    table: String,
    shared: Arc<Shared>,
    write_tx: Sender<Outgoing>,
}

impl TableHandle {
    pub fn name(&self) -> &str {
        &self.table
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    fn put(&mut self, key: &str, value: TableValue) {
        let topic = topic_name(&self.table, key);
        self.shared.store(&topic, value.clone());
        if let Ok(mut published) = self.shared.published.lock() {
            published.insert(topic.clone(), value.clone());
        }
        match self.write_tx.try_send(Outgoing::Put(topic.clone(), value)) {
            Ok(_) => {}
            Err(TrySendError::Full(_)) => {
                warn!(target: "nt_client", "Write queue full (falling behind) - dropping write to {}", topic);
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!(target: "nt_client", "Connection thread gone - write to {} not sent", topic);
            }
        }
    }

    fn lookup(&self, key: &str) -> Option<TableValue> {
        self.shared.lookup(&topic_name(&self.table, key))
    }
}

impl RemoteTable for TableHandle {
    fn put_string(&mut self, key: &str, value: &str) {
        self.put(key, TableValue::String(value.to_string()));
    }

    fn put_number(&mut self, key: &str, value: f64) {
        self.put(key, TableValue::Number(value));
    }

    fn get_number(&self, key: &str, default: f64) -> f64 {
        self.lookup(key).and_then(|v| v.as_number()).unwrap_or(default)
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        self.lookup(key)
            .and_then(|v| v.as_string().map(str::to_string))
            .unwrap_or_else(|| default.to_string())
    }
}

fn open_socket(endpoint: &str) -> Result<WebSocket<TcpStream>> {
    let addr = endpoint
        .to_socket_addrs()
        .with_context(|| format!("Cannot resolve NT server {}", endpoint))?
        .next()
        .ok_or_else(|| anyhow!("No address for NT server {}", endpoint))?;
    let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
        .with_context(|| format!("Connection to {} failed", endpoint))?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;

    let mut request = format!("ws://{}/nt/{}", endpoint, CLIENT_NAME).into_client_request()?;
    request
        .headers_mut()
        .insert("Sec-WebSocket-Protocol", HeaderValue::from_static(NT_SUBPROTOCOL));
    let (socket, _response) =
        tungstenite::client(request, stream).map_err(|e| anyhow!("WebSocket handshake with {} failed: {}", endpoint, e))?;
    socket.get_ref().set_read_timeout(Some(READ_POLL))?;
    Ok(socket)
}

fn connection_thread(
    endpoint: String,
    reconnect_delay: Duration,
    shared: Arc<Shared>,
    write_rx: Receiver<Outgoing>,
    token: CancellationToken,
) {
    info!(target: "nt_client", "NT client thread started for {}", endpoint);
    let mut was_connected = false;

    while !token.is_cancelled() {
        match open_socket(&endpoint) {
            Ok(socket) => {
                let mut session = Session::new(socket);
                if let Err(e) = session.run(&shared, &write_rx, &token) {
                    warn!(target: "nt_client", "NT session with {} ended: {:#}", endpoint, e);
                }
                session.close();
                shared.end_session();
                was_connected = true;
            }
            Err(e) => {
                if was_connected {
                    info!(target: "nt_client", "Reconnect to {} failed: {:#}", endpoint, e);
                    was_connected = false;
                } else {
                    debug!(target: "nt_client", "Connect to {} failed: {:#}", endpoint, e);
                }
            }
        }

        // Writes made while offline are covered by the published replay
        while write_rx.try_recv().is_ok() {}

        let mut waited = Duration::ZERO;
        while waited < reconnect_delay && !token.is_cancelled() {
            let step = READ_POLL.min(reconnect_delay - waited);
            thread::sleep(step);
            waited += step;
        }
    }

    shared.end_session();
    info!(target: "nt_client", "NT client thread for {} stopped", endpoint);
}

/// Per-connection protocol state
struct Session {
    socket: WebSocket<TcpStream>,
    started: Instant,
    /// Server clock minus local clock, once a time sync reply arrived
    server_offset_us: Option<i64>,
    next_uid: i64,
    /// topic -> (pubuid, NT type name)
    publishers: HashMap<String, (i64, &'static str)>,
    /// announced topic id -> topic
    topics: HashMap<i64, String>,
}

impl Session {
    fn new(socket: WebSocket<TcpStream>) -> Self {
        Self {
            socket,
            started: Instant::now(),
            server_offset_us: None,
            next_uid: 1,
            publishers: HashMap::new(),
            topics: HashMap::new(),
        }
    }

    fn local_time_us(&self) -> i64 {
        i64::try_from(self.started.elapsed().as_micros()).unwrap_or(i64::MAX)
    }

    /// 0 asks the server to stamp the value itself
    fn server_time_us(&self) -> i64 {
        self.server_offset_us.map(|off| self.local_time_us() + off).unwrap_or(0)
    }

    fn alloc_uid(&mut self) -> i64 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    fn send_control(&mut self, messages: &[ControlMessage]) -> Result<()> {
        let text = encode_control(messages)?;
        self.socket.send(Message::Text(text)).context("NT control write failed")
    }

    fn send_time_sync(&mut self) -> Result<()> {
        let frame = encode_time_sync(self.local_time_us())?;
        self.socket.send(Message::Binary(frame)).context("NT time sync write failed")
    }

    fn subscribe(&mut self, table: &str) -> Result<()> {
        let subuid = self.alloc_uid();
        debug!(target: "nt_client", "Subscribing to {} (subuid {})", table_prefix(table), subuid);
        self.send_control(&[ControlMessage::Subscribe {
            topics: vec![table_prefix(table)],
            subuid,
            options: SubscribeOptions { prefix: true },
        }])
    }

    fn put(&mut self, topic: &str, value: &TableValue) -> Result<()> {
        let kind = type_name(value);
        let pubuid = match self.publishers.get(topic).copied() {
            Some((pubuid, existing)) if existing == kind => pubuid,
            previous => {
                // A key changing type needs a fresh publisher
                if let Some((old, _)) = previous {
                    self.send_control(&[ControlMessage::Unpublish { pubuid: old }])?;
                }
                let pubuid = self.alloc_uid();
                self.send_control(&[ControlMessage::Publish {
                    name: topic.to_string(),
                    pubuid,
                    kind: kind.to_string(),
                    properties: Default::default(),
                }])?;
                self.publishers.insert(topic.to_string(), (pubuid, kind));
                pubuid
            }
        };
        let frame = encode_value_frame(pubuid, self.server_time_us(), value)?;
        self.socket.send(Message::Binary(frame)).context("NT value write failed")
    }

    fn run(&mut self, shared: &Shared, write_rx: &Receiver<Outgoing>, token: &CancellationToken) -> Result<()> {
        // Drain before reading the replay lists; anything queued after this
        // point is delivered normally.
        while write_rx.try_recv().is_ok() {}

        self.send_time_sync()?;
        let tables: Vec<String> = shared.tables.lock().map(|t| t.clone()).unwrap_or_default();
        for table in &tables {
            self.subscribe(table)?;
        }
        let published = shared.published_snapshot();
        for (topic, value) in &published {
            self.put(topic, value)?;
        }

        shared.begin_session();
        shared.connected.store(true, Ordering::SeqCst);
        info!(target: "nt_client", "Connected to NT server at {} ({} tables, republished {} values)",
              self.socket.get_ref().peer_addr().map(|a| a.to_string()).unwrap_or_default(),
              tables.len(), published.len());

        let mut last_sync = Instant::now();
        loop {
            if token.is_cancelled() {
                return Ok(());
            }
            loop {
                match write_rx.try_recv() {
                    Ok(Outgoing::Subscribe(table)) => self.subscribe(&table)?,
                    Ok(Outgoing::Put(topic, value)) => self.put(&topic, &value)?,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => return Ok(()),
                }
            }
            if last_sync.elapsed() >= TIME_SYNC_PERIOD {
                self.send_time_sync()?;
                last_sync = Instant::now();
            }

            match self.socket.read() {
                Ok(Message::Text(text)) => self.handle_text(shared, &text),
                Ok(Message::Binary(data)) => self.handle_binary(shared, &data),
                Ok(Message::Close(_)) => bail!("server closed the connection"),
                Ok(_) => {}
                Err(tungstenite::Error::Io(e)) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(e) => return Err(e).context("NT read failed"),
            }
        }
    }

    fn handle_text(&mut self, shared: &Shared, text: &str) {
        let messages = match decode_control(text) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(target: "nt_client", "{:#}", e);
                return;
            }
        };
        for msg in messages {
            match msg {
                ControlMessage::Announce { name, id, kind, .. } => {
                    debug!(target: "nt_client", "announce {} id={} type={}", name, id, kind);
                    self.topics.insert(id, name);
                }
                ControlMessage::Unannounce { name, id } => {
                    debug!(target: "nt_client", "unannounce {} id={}", name, id);
                    self.topics.remove(&id);
                    shared.forget(&name);
                }
                other => {
                    debug!(target: "nt_client", "Ignoring unexpected message from server: {:?}", other);
                }
            }
        }
    }

    fn handle_binary(&mut self, shared: &Shared, data: &[u8]) {
        let frames = match decode_value_frames(data) {
            Ok(frames) => frames,
            Err(e) => {
                warn!(target: "nt_client", "{:#}", e);
                return;
            }
        };
        for frame in frames {
            if frame.id == TIME_SYNC_ID {
                if let Some(sent_at) = frame.raw_int {
                    let now = self.local_time_us();
                    let half_rtt = (now - sent_at).max(0) / 2;
                    self.server_offset_us = Some(frame.timestamp_us + half_rtt - now);
                }
                continue;
            }
            match (self.topics.get(&frame.id), frame.value) {
                (Some(topic), Some(value)) => {
                    debug!(target: "nt_client", "update {} = {:?}", topic, value);
                    shared.store(topic, value);
                }
                (Some(topic), None) => {
                    debug!(target: "nt_client", "Ignoring {} value of type {}", topic, frame.type_code);
                }
                (None, _) => {
                    debug!(target: "nt_client", "Value for unannounced topic id {}", frame.id);
                }
            }
        }
    }

    fn close(&mut self) {
        let _ = self.socket.close(None);
        let _ = self.socket.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetryPoller;
    use std::net::TcpListener;

    type ServerSocket = WebSocket<TcpStream>;

    fn wait_until<F: Fn() -> bool>(cond: F) -> bool {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(5) {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    fn nt_server() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();
        (listener, endpoint)
    }

    fn accept(listener: &TcpListener) -> ServerSocket {
        let (stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        tungstenite::accept(stream).unwrap()
    }

    /// Read from the client until a control message matches
    fn expect_control<F: Fn(&ControlMessage) -> bool>(ws: &mut ServerSocket, pred: F) -> ControlMessage {
        loop {
            if let Message::Text(text) = ws.read().expect("client frame") {
                if let Some(msg) = decode_control(&text).unwrap().into_iter().find(|m| pred(m)) {
                    return msg;
                }
            }
        }
    }

    /// Read from the client until a value frame for `id` arrives
    fn expect_value(ws: &mut ServerSocket, id: i64) -> ValueFrame {
        loop {
            if let Message::Binary(data) = ws.read().expect("client frame") {
                if let Some(frame) = decode_value_frames(&data).unwrap().into_iter().find(|f| f.id == id) {
                    return frame;
                }
            }
        }
    }

    fn announce(ws: &mut ServerSocket, name: &str, id: i64, kind: &str) {
        let msg = ControlMessage::Announce {
            name: name.into(),
            id,
            kind: kind.into(),
            pubuid: None,
            properties: Default::default(),
        };
        ws.send(Message::Text(encode_control(&[msg]).unwrap())).unwrap();
    }

    fn send_value(ws: &mut ServerSocket, id: i64, value: TableValue) {
        ws.send(Message::Binary(encode_value_frame(id, 1_000, &value).unwrap())).unwrap();
    }

    #[test]
    fn test_control_wire_format() {
        let text = encode_control(&[ControlMessage::Subscribe {
            topics: vec![table_prefix("RobotData")],
            subuid: 3,
            options: SubscribeOptions { prefix: true },
        }])
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json[0]["method"], "subscribe");
        assert_eq!(json[0]["params"]["topics"][0], "/RobotData/");
        assert_eq!(json[0]["params"]["options"]["prefix"], true);

        let frame = r#"[{"method":"announce","params":{"name":"/RobotData/speed","id":7,"type":"double","properties":{}}},
                        {"method":"properties","params":{"name":"/RobotData/speed","update":{}}}]"#;
        let decoded = decode_control(frame).unwrap();
        assert_eq!(decoded.len(), 1);
        assert!(matches!(&decoded[0], ControlMessage::Announce { name, id: 7, kind, .. }
                         if name == "/RobotData/speed" && kind == "double"));
        assert!(decode_control("{not json").is_err());
    }

    #[test]
    fn test_value_frames() {
        let mut data = encode_value_frame(7, 1_000, &TableValue::Number(3.5)).unwrap();
        data.extend(encode_value_frame(8, 1_000, &TableValue::String("red".into())).unwrap());
        let mut int_frame = Vec::new();
        write_frame(&mut int_frame, 9, 0, TYPE_INT, rmpv::Value::from(42i64)).unwrap();
        data.extend(int_frame);

        let frames = decode_value_frames(&data).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].value, Some(TableValue::Number(3.5)));
        assert_eq!(frames[0].type_code, TYPE_DOUBLE);
        assert_eq!(frames[1].value, Some(TableValue::String("red".into())));
        assert_eq!(frames[2].value, Some(TableValue::Number(42.0)));

        // Booleans are valid NT values the dashboard has no use for
        let mut flag = Vec::new();
        write_frame(&mut flag, 10, 0, 0, rmpv::Value::from(true)).unwrap();
        assert_eq!(decode_value_frames(&flag).unwrap()[0].value, None);

        assert!(decode_value_frames(&[0x93, 0x01]).is_err());
    }

    #[test]
    fn test_unreachable_reads_default() {
        // Nothing listens on this port once the listener is dropped
        let (listener, endpoint) = nt_server();
        drop(listener);
        let token = CancellationToken::new();
        let client = TableClient::connect(&endpoint, Duration::from_millis(50), token.clone());
        let mut table = client.get_table("RobotData");
        assert_eq!(table.get_number("speed", 0.0), 0.0);
        assert_eq!(table.get_string("allianceColor", "UNKNOWN"), "UNKNOWN");
        table.put_number("motorPower", 0.5);
        assert!(!client.is_connected());
        token.cancel();
    }

    #[test]
    fn test_announced_values_and_puts() {
        let (listener, endpoint) = nt_server();
        let token = CancellationToken::new();
        let client = TableClient::connect(&endpoint, Duration::from_millis(50), token.clone());
        let mut table = client.get_table("RobotData");

        let mut server = accept(&listener);
        expect_control(&mut server, |m| {
            matches!(m, ControlMessage::Subscribe { topics, options, .. } if topics == &["/RobotData/"] && options.prefix)
        });
        assert!(wait_until(|| client.is_connected()));

        announce(&mut server, "/RobotData/speed", 7, "double");
        announce(&mut server, "/Other/speed", 8, "double");
        server.send(Message::Text("garbage".into())).unwrap();
        send_value(&mut server, 8, TableValue::Number(9.0));
        send_value(&mut server, 7, TableValue::Number(3.14159));
        assert!(wait_until(|| table.get_number("speed", 0.0) == 3.14159));
        // Wrong type gives the default
        assert_eq!(table.get_string("speed", "none"), "none");

        table.put_string("selectedAuto", "blueLeave");
        let publish = expect_control(&mut server, |m| matches!(m, ControlMessage::Publish { .. }));
        let pubuid = match publish {
            ControlMessage::Publish { name, pubuid, kind, .. } => {
                assert_eq!(name, "/RobotData/selectedAuto");
                assert_eq!(kind, "string");
                pubuid
            }
            _ => unreachable!(),
        };
        let frame = expect_value(&mut server, pubuid);
        assert_eq!(frame.type_code, TYPE_STRING);
        assert_eq!(frame.value, Some(TableValue::String("blueLeave".into())));
        // Local writes are visible immediately
        assert_eq!(table.get_string("selectedAuto", ""), "blueLeave");

        token.cancel();
    }

    #[test]
    fn test_disconnect_falls_back_to_defaults() {
        let (listener, endpoint) = nt_server();
        let token = CancellationToken::new();
        let client = TableClient::connect(&endpoint, Duration::from_secs(10), token.clone());
        let table = client.get_table("RobotData");

        let mut server = accept(&listener);
        expect_control(&mut server, |m| matches!(m, ControlMessage::Subscribe { .. }));
        assert!(wait_until(|| client.is_connected()));
        announce(&mut server, "/RobotData/speed", 1, "double");
        announce(&mut server, "/RobotData/allianceColor", 2, "string");
        send_value(&mut server, 1, TableValue::Number(3.14159));
        send_value(&mut server, 2, TableValue::String("red".into()));
        assert!(wait_until(|| table.get_string("allianceColor", "UNKNOWN") == "red"));

        let live = TelemetryPoller::new().read(&table);
        assert_eq!(live.speed_text(), "Speed: 3.14");
        assert_eq!(live.alliance_text(), "Alliance: RED");

        // Robot goes away
        drop(server);
        assert!(wait_until(|| !client.is_connected()));

        let stale = TelemetryPoller::new().read(&table);
        assert_eq!(stale.speed_text(), "Speed: 0.00");
        assert_eq!(stale.alliance_text(), "Alliance: UNKNOWN");
        token.cancel();
    }

    #[test]
    fn test_reconnect_republishes_writes() {
        let (listener, endpoint) = nt_server();
        let token = CancellationToken::new();
        let client = TableClient::connect(&endpoint, Duration::from_millis(50), token.clone());
        let mut table = client.get_table("Auto Chooser");

        let mut server = accept(&listener);
        expect_control(&mut server, |m| matches!(m, ControlMessage::Subscribe { .. }));
        assert!(wait_until(|| client.is_connected()));
        table.put_string("allianceColor", "Blue");
        expect_control(&mut server, |m| matches!(m, ControlMessage::Publish { .. }));

        drop(server);
        assert!(wait_until(|| !client.is_connected()));

        let mut server = accept(&listener);
        expect_control(&mut server, |m| {
            matches!(m, ControlMessage::Subscribe { topics, .. } if topics == &["/Auto Chooser/"])
        });
        let publish = expect_control(&mut server, |m| matches!(m, ControlMessage::Publish { .. }));
        let pubuid = match publish {
            ControlMessage::Publish { name, pubuid, .. } => {
                assert_eq!(name, "/Auto Chooser/allianceColor");
                pubuid
            }
            _ => unreachable!(),
        };
        assert_eq!(expect_value(&mut server, pubuid).value, Some(TableValue::String("Blue".into())));
        assert!(wait_until(|| client.is_connected()));
        assert_eq!(table.get_string("allianceColor", ""), "Blue");
        token.cancel();
    }
}
