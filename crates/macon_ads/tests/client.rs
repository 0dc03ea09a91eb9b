//! ADS client tests against a fake controller on a loopback socket.

use macon_ads::frame::{
    encode_frame, parse_tcp_header, split_body, AmsHeader, Command, IG_SYM_HNDBYNAME,
    IG_SYM_RELEASEHND, IG_SYM_VALBYHND, TCP_HEADER_SIZE,
};
use macon_ads::{AdsClient, AdsConfig};
use macon_document::Value;
use macon_sync_engine::{DeviceError, DeviceInterface, RetryConfig, ValueType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Default)]
struct PlcState {
    memory: HashMap<String, Vec<u8>>,
    handles: HashMap<u32, String>,
    next_handle: u32,
    handle_requests: usize,
    releases: usize,
    drop_next: bool,
    stop: bool,
}

/// Serves one connection at a time, answering symbol handle requests and
/// reads and writes by handle.
struct FakePlc {
    addr: SocketAddr,
    state: Arc<Mutex<PlcState>>,
    thread: Option<JoinHandle<()>>,
}

impl FakePlc {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(PlcState {
            next_handle: 0x1000,
            ..PlcState::default()
        }));

        let shared = Arc::clone(&state);
        let thread = std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                serve(stream, &shared);
                if shared.lock().stop {
                    break;
                }
            }
        });

        Self {
            addr,
            state,
            thread: Some(thread),
        }
    }

    fn define(&self, symbol: &str, bytes: Vec<u8>) {
        self.state.lock().memory.insert(symbol.to_string(), bytes);
    }

    fn memory(&self, symbol: &str) -> Vec<u8> {
        self.state.lock().memory[symbol].clone()
    }

    fn client(&self, reconnect: RetryConfig) -> AdsClient {
        let config = AdsConfig::new("127.0.0.1")
            .with_tcp_port(self.addr.port())
            .with_timeout(Duration::from_secs(2));
        AdsClient::connect(config, reconnect).unwrap()
    }

    /// Forgets all handles, as an online change would.
    fn invalidate_handles(&self) {
        self.state.lock().handles.clear();
    }

    /// Closes the connection when the next request arrives.
    fn drop_next_request(&self, then_stop: bool) {
        let mut state = self.state.lock();
        state.drop_next = true;
        state.stop = then_stop;
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            thread.join().unwrap();
        }
    }
}

fn string_var(text: &str, capacity: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; capacity + 1];
    bytes[..text.len()].copy_from_slice(text.as_bytes());
    bytes
}

fn serve(mut stream: TcpStream, state: &Mutex<PlcState>) {
    loop {
        let mut prefix = [0u8; TCP_HEADER_SIZE];
        if stream.read_exact(&mut prefix).is_err() {
            return;
        }
        let length = parse_tcp_header(prefix).unwrap();
        let mut body = vec![0u8; length];
        stream.read_exact(&mut body).unwrap();

        if std::mem::take(&mut state.lock().drop_next) {
            return;
        }

        let (request, payload) = split_body(&body).unwrap();
        let reply_payload = answer(&request, payload, &mut state.lock());
        let reply = AmsHeader {
            target_net_id: request.source_net_id,
            target_port: request.source_port,
            source_net_id: request.target_net_id,
            source_port: request.target_port,
            command: request.command,
            state_flags: request.state_flags | 0x0001,
            data_length: 0,
            error_code: 0,
            invoke_id: request.invoke_id,
        };
        let frame = encode_frame(&reply, &reply_payload).unwrap();
        if stream.write_all(&frame).is_err() {
            return;
        }
    }
}

fn u32_at(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(buf[at..at + 4].try_into().unwrap())
}

fn read_reply(result: u32, data: &[u8]) -> Vec<u8> {
    let mut out = result.to_le_bytes().to_vec();
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    out
}

fn answer(request: &AmsHeader, payload: &[u8], state: &mut PlcState) -> Vec<u8> {
    let group = u32_at(payload, 0);
    let offset = u32_at(payload, 4);
    let length = u32_at(payload, 8) as usize;

    match (Command::from_u16(request.command), group) {
        (Some(Command::ReadWrite), IG_SYM_HNDBYNAME) => {
            state.handle_requests += 1;
            let write_len = u32_at(payload, 12) as usize;
            let raw = &payload[16..16 + write_len];
            let name = String::from_utf8_lossy(raw.split(|&b| b == 0).next().unwrap_or(raw)).into_owned();
            if !state.memory.contains_key(&name) {
                return read_reply(0x0710, &[]);
            }
            state.next_handle += 1;
            let handle = state.next_handle;
            state.handles.insert(handle, name);
            read_reply(0, &handle.to_le_bytes())
        }
        (Some(Command::Read), IG_SYM_VALBYHND) => {
            let Some(name) = state.handles.get(&offset) else {
                return read_reply(0x0710, &[]);
            };
            let memory = &state.memory[name];
            if memory.len() != length {
                return read_reply(0x0705, &[]);
            }
            read_reply(0, memory)
        }
        (Some(Command::Write), IG_SYM_VALBYHND) => {
            let Some(name) = state.handles.get(&offset).cloned() else {
                return 0x0710u32.to_le_bytes().to_vec();
            };
            let data = &payload[12..12 + length];
            if state.memory[&name].len() != data.len() {
                return 0x0705u32.to_le_bytes().to_vec();
            }
            state.memory.insert(name, data.to_vec());
            0u32.to_le_bytes().to_vec()
        }
        (Some(Command::Write), IG_SYM_RELEASEHND) => {
            let handle = u32_at(payload, 12);
            state.handles.remove(&handle);
            state.releases += 1;
            0u32.to_le_bytes().to_vec()
        }
        _ => 0x0701u32.to_le_bytes().to_vec(),
    }
}

#[test]
fn reads_each_value_type() {
    let plc = FakePlc::start();
    plc.define("MACONDatabase.sAppName", string_var("MACON", 80));
    plc.define("MACONDatabase.bShowTips", vec![1]);
    plc.define("MACONDatabase.nAutoSaveInterval", 15i16.to_le_bytes().to_vec());
    plc.define("MACONDatabase.rDefaultPressure", 6.5f32.to_le_bytes().to_vec());

    let client = plc.client(RetryConfig::immediate());
    assert_eq!(
        client.read("MACONDatabase.sAppName", ValueType::String).unwrap(),
        Value::from("MACON")
    );
    assert_eq!(
        client.read("MACONDatabase.bShowTips", ValueType::Bool).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        client.read("MACONDatabase.nAutoSaveInterval", ValueType::Integer).unwrap(),
        Value::Integer(15)
    );
    assert_eq!(
        client.read("MACONDatabase.rDefaultPressure", ValueType::Float).unwrap(),
        Value::Float(6.5)
    );
}

#[test]
fn writes_reach_controller_memory() {
    let plc = FakePlc::start();
    plc.define("MachineDatabase.machineId", string_var("", 80));
    plc.define("MachineDatabase.axes_1_min", vec![0, 0]);

    let client = plc.client(RetryConfig::immediate());
    client
        .write("MachineDatabase.machineId", &Value::from("MX-200"), ValueType::String)
        .unwrap();
    client
        .write("MachineDatabase.axes_1_min", &Value::Float(-40.0), ValueType::Integer)
        .unwrap();

    assert_eq!(plc.memory("MachineDatabase.machineId"), string_var("MX-200", 80));
    assert_eq!(plc.memory("MachineDatabase.axes_1_min"), (-40i16).to_le_bytes().to_vec());
    assert_eq!(
        client.read("MachineDatabase.machineId", ValueType::String).unwrap(),
        Value::from("MX-200")
    );
}

#[test]
fn real_reads_back_as_coerced() {
    let plc = FakePlc::start();
    plc.define("Material.MaterialHeight", 0f32.to_le_bytes().to_vec());

    let client = plc.client(RetryConfig::immediate());
    let written = Value::Float(0.1);
    client
        .write("Material.MaterialHeight", &written, ValueType::Float)
        .unwrap();

    assert_eq!(plc.memory("Material.MaterialHeight"), 0.1f32.to_le_bytes().to_vec());
    let read = client.read("Material.MaterialHeight", ValueType::Float).unwrap();
    assert_ne!(read, written);
    assert_eq!(Some(read), ValueType::Float.coerce(&written));
}

#[test]
fn handles_are_cached() {
    let plc = FakePlc::start();
    plc.define("Material.MaterialOnInfeed", vec![0]);

    let client = plc.client(RetryConfig::immediate());
    for _ in 0..3 {
        client.read("Material.MaterialOnInfeed", ValueType::Bool).unwrap();
    }
    assert_eq!(plc.state.lock().handle_requests, 1);
    assert_eq!(client.cached_handles(), 1);
}

#[test]
fn unknown_symbol_is_not_a_connectivity_failure() {
    let plc = FakePlc::start();
    let client = plc.client(RetryConfig::immediate());

    let err = client.read("MAIN.missing", ValueType::Bool).unwrap_err();
    assert!(matches!(err, DeviceError::SymbolNotFound(ref s) if s == "MAIN.missing"));
    assert!(!err.is_connectivity());
    assert!(client.is_connected());
    assert_eq!(client.cached_handles(), 0);
}

#[test]
fn size_mismatch_is_a_field_error() {
    let plc = FakePlc::start();
    plc.define("MAIN.sShort", string_var("abc", 40));
    let client = plc.client(RetryConfig::immediate());

    let err = client.read("MAIN.sShort", ValueType::String).unwrap_err();
    assert!(matches!(err, DeviceError::Status { code: 0x0705, .. }));
    assert!(!err.is_connectivity());
}

#[test]
fn type_mismatch_never_reaches_the_wire() {
    let plc = FakePlc::start();
    plc.define("MAIN.nValue", vec![0, 0]);
    let client = plc.client(RetryConfig::immediate());

    let err = client
        .write("MAIN.nValue", &Value::from("ten"), ValueType::Integer)
        .unwrap_err();
    assert!(matches!(err, DeviceError::TypeMismatch { .. }));
    assert_eq!(plc.state.lock().handle_requests, 0);
}

#[test]
fn stale_handle_is_reacquired() {
    let plc = FakePlc::start();
    plc.define("MAIN.bFlag", vec![1]);
    let client = plc.client(RetryConfig::immediate());

    client.read("MAIN.bFlag", ValueType::Bool).unwrap();
    plc.invalidate_handles();
    assert_eq!(
        client.read("MAIN.bFlag", ValueType::Bool).unwrap(),
        Value::Bool(true)
    );
    assert_eq!(plc.state.lock().handle_requests, 2);
}

#[test]
fn reconnects_after_connection_loss() {
    let plc = FakePlc::start();
    plc.define("MAIN.bFlag", vec![1]);
    let client = plc.client(RetryConfig::immediate());
    client.read("MAIN.bFlag", ValueType::Bool).unwrap();

    plc.drop_next_request(false);
    let err = client.read("MAIN.bFlag", ValueType::Bool).unwrap_err();
    assert!(err.is_connectivity());
    assert!(!client.is_connected());
    assert_eq!(client.cached_handles(), 0);

    assert_eq!(
        client.read("MAIN.bFlag", ValueType::Bool).unwrap(),
        Value::Bool(true)
    );
    assert!(client.is_connected());
}

#[test]
fn failed_reconnect_backs_off() {
    let mut plc = FakePlc::start();
    plc.define("MAIN.bFlag", vec![1]);
    let client = plc.client(RetryConfig::new(Duration::from_secs(60)).without_jitter());

    plc.drop_next_request(true);
    assert!(client.read("MAIN.bFlag", ValueType::Bool).unwrap_err().is_connectivity());
    plc.join();

    // The router is gone: the reconnect attempt fails...
    assert!(client.read("MAIN.bFlag", ValueType::Bool).unwrap_err().is_connectivity());
    // ...and the next call waits out the backoff without touching the network.
    assert!(matches!(
        client.read("MAIN.bFlag", ValueType::Bool),
        Err(DeviceError::NotConnected)
    ));
}

#[test]
fn close_releases_handles() {
    let plc = FakePlc::start();
    plc.define("MAIN.a", vec![0]);
    plc.define("MAIN.b", vec![0]);
    let client = plc.client(RetryConfig::immediate());
    client.read("MAIN.a", ValueType::Bool).unwrap();
    client.read("MAIN.b", ValueType::Bool).unwrap();

    client.close();
    assert!(!client.is_connected());
    assert_eq!(plc.state.lock().releases, 2);
}

#[test]
fn connect_fails_without_router() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = AdsConfig::new("127.0.0.1")
        .with_tcp_port(port)
        .with_timeout(Duration::from_millis(500));
    assert!(AdsClient::connect(config, RetryConfig::immediate()).is_err());
}
