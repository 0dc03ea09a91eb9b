//! Blocking ADS client.

use crate::codec;
use crate::config::AdsConfig;
use crate::error::{AdsError, AdsResult};
use crate::frame::{
    encode_frame, parse_read_response, parse_tcp_header, parse_write_response, read_request,
    read_write_request, split_body, write_request, AmsHeader, Command, IG_SYM_HNDBYNAME,
    IG_SYM_RELEASEHND, IG_SYM_VALBYHND, STATE_REQUEST, TCP_HEADER_SIZE,
};
use bytes::Bytes;
use macon_document::Value;
use macon_sync_engine::{DeviceInterface, DeviceResult, RetryConfig, ValueType};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// A device session over AMS/TCP.
///
/// Symbols are resolved to handles once and the handles are cached. When
/// the socket breaks it is dropped together with its handles; the next call
/// reconnects. Failed reconnects are spaced by the retry configuration, and
/// calls made while waiting fail immediately with [`AdsError::NotConnected`].
pub struct AdsClient {
    config: AdsConfig,
    reconnect: RetryConfig,
    session: Mutex<Session>,
}

#[derive(Default)]
struct Session {
    stream: Option<TcpStream>,
    handles: HashMap<String, u32>,
    invoke_id: u32,
    failed_attempts: u32,
    retry_at: Option<Instant>,
}

impl AdsClient {
    /// Opens a session. Fails if the router cannot be reached.
    pub fn connect(config: AdsConfig, reconnect: RetryConfig) -> AdsResult<Self> {
        let stream = open_stream(&config)?;
        info!(
            host = %config.host,
            tcp_port = config.tcp_port,
            net_id = %config.target_net_id,
            ams_port = config.target_port,
            "connected to device"
        );
        Ok(Self {
            config,
            reconnect,
            session: Mutex::new(Session {
                stream: Some(stream),
                ..Session::default()
            }),
        })
    }

    /// Gets the configuration.
    pub fn config(&self) -> &AdsConfig {
        &self.config
    }

    /// Returns true if a socket is open.
    pub fn is_connected(&self) -> bool {
        self.session.lock().stream.is_some()
    }

    /// Number of cached symbol handles.
    pub fn cached_handles(&self) -> usize {
        self.session.lock().handles.len()
    }

    /// Reads `length` bytes of a symbol.
    pub fn read_raw(&self, symbol: &str, length: usize) -> AdsResult<Bytes> {
        let length = u32::try_from(length).map_err(|_| AdsError::protocol("read too large"))?;
        self.with_session(|session, config| {
            session.with_handle(config, symbol, |session, config, handle| {
                let payload = read_request(IG_SYM_VALBYHND, handle, length);
                let reply = session.transact(config, Command::Read, &payload)?;
                parse_read_response(&reply)
            })
        })
    }

    /// Writes raw bytes to a symbol.
    pub fn write_raw(&self, symbol: &str, data: &[u8]) -> AdsResult<()> {
        self.with_session(|session, config| {
            session.with_handle(config, symbol, |session, config, handle| {
                let payload = write_request(IG_SYM_VALBYHND, handle, data);
                let reply = session.transact(config, Command::Write, &payload)?;
                parse_write_response(&reply)
            })
        })
    }

    /// Releases every cached handle and closes the socket.
    pub fn close(&self) {
        let mut session = self.session.lock();
        let handles: Vec<(String, u32)> = session.handles.drain().collect();
        for (symbol, handle) in handles {
            let payload = write_request(IG_SYM_RELEASEHND, 0, &handle.to_le_bytes());
            let released = session
                .transact(&self.config, Command::Write, &payload)
                .and_then(|reply| parse_write_response(&reply));
            if let Err(e) = released {
                debug!(symbol, error = %e, "handle release failed");
            }
        }
        session.stream = None;
    }

    fn with_session<T>(
        &self,
        op: impl FnOnce(&mut Session, &AdsConfig) -> AdsResult<T>,
    ) -> AdsResult<T> {
        let mut session = self.session.lock();
        self.ensure_connected(&mut *session)?;

        let result = op(&mut *session, &self.config);
        if let Err(e) = &result {
            if e.breaks_session() {
                warn!(error = %e, "device session lost");
                session.disconnect();
            }
        }
        result
    }

    fn ensure_connected(&self, session: &mut Session) -> AdsResult<()> {
        if session.stream.is_some() {
            return Ok(());
        }
        if let Some(retry_at) = session.retry_at {
            if Instant::now() < retry_at {
                return Err(AdsError::NotConnected);
            }
        }

        match open_stream(&self.config) {
            Ok(stream) => {
                info!(
                    host = %self.config.host,
                    attempts = session.failed_attempts + 1,
                    "reconnected to device"
                );
                session.stream = Some(stream);
                session.failed_attempts = 0;
                session.retry_at = None;
                Ok(())
            }
            Err(e) => {
                session.failed_attempts = session.failed_attempts.saturating_add(1);
                let delay = self.reconnect.delay_for_attempt(session.failed_attempts);
                session.retry_at = Some(Instant::now() + delay);
                warn!(
                    error = %e,
                    attempt = session.failed_attempts,
                    retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "reconnect failed"
                );
                Err(e)
            }
        }
    }
}

impl Drop for AdsClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl DeviceInterface for AdsClient {
    fn read(&self, symbol: &str, value_type: ValueType) -> DeviceResult<Value> {
        let length = codec::size_of(value_type, self.config.string_capacity);
        self.read_raw(symbol, length)
            .and_then(|data| codec::decode(symbol, &data, value_type))
            .map_err(|e| e.into_device_error(symbol))
    }

    fn write(&self, symbol: &str, value: &Value, value_type: ValueType) -> DeviceResult<()> {
        codec::encode(symbol, value, value_type, self.config.string_capacity)
            .and_then(|data| self.write_raw(symbol, &data))
            .map_err(|e| e.into_device_error(symbol))
    }
}

impl Session {
    fn disconnect(&mut self) {
        self.stream = None;
        self.handles.clear();
    }

    /// Runs `op` with the symbol's handle. A cached handle the device no
    /// longer accepts is replaced once.
    fn with_handle<T>(
        &mut self,
        config: &AdsConfig,
        symbol: &str,
        op: impl Fn(&mut Session, &AdsConfig, u32) -> AdsResult<T>,
    ) -> AdsResult<T> {
        let cached = self.handles.contains_key(symbol);
        let handle = self.handle(config, symbol)?;

        let mut result = op(self, config, handle);
        if cached && matches!(&result, Err(e) if e.is_stale_handle()) {
            debug!(symbol, "symbol handle rejected, acquiring a new one");
            self.handles.remove(symbol);
            let handle = self.handle(config, symbol)?;
            result = op(self, config, handle);
        }
        if matches!(&result, Err(e) if e.is_stale_handle()) {
            self.handles.remove(symbol);
        }
        result
    }

    fn handle(&mut self, config: &AdsConfig, symbol: &str) -> AdsResult<u32> {
        if let Some(&handle) = self.handles.get(symbol) {
            return Ok(handle);
        }

        let mut name = symbol.as_bytes().to_vec();
        name.push(0);
        let payload = read_write_request(IG_SYM_HNDBYNAME, 0, 4, &name);
        let reply = self.transact(config, Command::ReadWrite, &payload)?;
        let data = parse_read_response(&reply)?;
        let bytes: [u8; 4] = data
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| AdsError::protocol("handle response shorter than 4 bytes"))?;

        let handle = u32::from_le_bytes(bytes);
        debug!(symbol, handle, "acquired symbol handle");
        self.handles.insert(symbol.to_string(), handle);
        Ok(handle)
    }

    /// Sends one request and waits for its response.
    ///
    /// Responses to earlier requests that timed out are skipped by invoke id.
    fn transact(&mut self, config: &AdsConfig, command: Command, payload: &[u8]) -> AdsResult<Bytes> {
        self.invoke_id = self.invoke_id.wrapping_add(1);
        let invoke_id = self.invoke_id;
        let stream = self.stream.as_mut().ok_or(AdsError::NotConnected)?;

        let header = AmsHeader {
            target_net_id: config.target_net_id,
            target_port: config.target_port,
            source_net_id: config.source_net_id,
            source_port: config.source_port,
            command: command as u16,
            state_flags: STATE_REQUEST,
            data_length: 0,
            error_code: 0,
            invoke_id,
        };
        stream.write_all(&encode_frame(&header, payload)?)?;

        loop {
            let mut prefix = [0u8; TCP_HEADER_SIZE];
            stream.read_exact(&mut prefix)?;
            let length = parse_tcp_header(prefix)?;
            let mut body = vec![0u8; length];
            stream.read_exact(&mut body)?;

            let (reply, data) = split_body(&body)?;
            if !reply.is_response() || reply.invoke_id != invoke_id {
                debug!(invoke_id = reply.invoke_id, "skipping unrelated frame");
                continue;
            }
            if reply.command != command as u16 {
                return Err(AdsError::protocol(format!(
                    "response command {} does not match request {}",
                    reply.command, command as u16
                )));
            }
            if reply.error_code != 0 {
                return Err(AdsError::status(reply.error_code));
            }
            return Ok(Bytes::copy_from_slice(data));
        }
    }
}

fn open_stream(config: &AdsConfig) -> AdsResult<TcpStream> {
    let timeout = config.timeout().max(Duration::from_millis(1));
    let mut last_error = None;

    for addr in (config.host.as_str(), config.tcp_port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(match last_error {
        Some(e) => AdsError::Io(e),
        None => AdsError::protocol(format!("{} did not resolve", config.host)),
    })
}
