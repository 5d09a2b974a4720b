//! In-memory station used by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use station_client::{fletcher32, RemoteIndexEntry, StationClient, Transport, TransportError};
use station_protocol::{
    decode_command, Command, PersistenceScope, ProtocolVersion, ResultCode, Session, Setting,
    SettingValue, WirePacket,
};

#[derive(Default)]
struct StationState {
    behaviours: BTreeMap<u8, Vec<u8>>,
    settings: Vec<(Setting, SettingValue)>,
    fail_fetch: Option<u8>,
    forced_reply: Option<Vec<u8>>,
    requests: Vec<Command>,
}

/// Answers requests like an envelope-protocol station would.
pub struct MockStation {
    version: ProtocolVersion,
    state: Mutex<StationState>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockStation {
    pub fn new(version: ProtocolVersion) -> Self {
        assert!(version.is_envelope(), "mock only speaks envelope versions");
        MockStation {
            version,
            state: Mutex::new(StationState::default()),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every request takes `delay` before it is answered.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_behaviour(self, index: u8, payload: Vec<u8>) -> Self {
        self.state.lock().unwrap().behaviours.insert(index, payload);
        self
    }

    pub fn with_setting(self, setting: Setting, value: SettingValue) -> Self {
        self.state.lock().unwrap().settings.push((setting, value));
        self
    }

    /// Fetching `index` fails with a disconnect.
    pub fn failing_fetch(self, index: u8) -> Self {
        self.state.lock().unwrap().fail_fetch = Some(index);
        self
    }

    /// Answer every request with `bytes`.
    pub fn forced_reply(self, bytes: Vec<u8>) -> Self {
        self.state.lock().unwrap().forced_reply = Some(bytes);
        self
    }

    pub fn requests(&self) -> Vec<Command> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.requests()
            .iter()
            .filter(|c| matches!(c, Command::GetBehaviour { .. }))
            .count()
    }

    pub fn behaviours(&self) -> BTreeMap<u8, Vec<u8>> {
        self.state.lock().unwrap().behaviours.clone()
    }

    pub fn setting(&self, setting: Setting) -> Option<SettingValue> {
        self.state
            .lock()
            .unwrap()
            .settings
            .iter()
            .find(|(s, _)| *s == setting)
            .map(|(_, v)| v.clone())
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Encode a result packet the way this station frames it.
    pub fn reply(&self, command_type: u16, code: ResultCode, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(protocol) = self.version.protocol_byte() {
            out.push(protocol);
        }
        out.extend_from_slice(&command_type.to_le_bytes());
        out.extend_from_slice(&code.as_u16().to_le_bytes());
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn respond(&self, packet: &WirePacket) -> Result<Vec<u8>, TransportError> {
        let command =
            decode_command(packet, self.version).map_err(|e| TransportError::Io(e.to_string()))?;
        let command_type = command
            .expected_result_type(self.version)
            .map_err(|e| TransportError::Io(e.to_string()))?;

        let mut state = self.state.lock().unwrap();
        state.requests.push(command.clone());
        if let Some(bytes) = &state.forced_reply {
            return Ok(bytes.clone());
        }

        let (code, payload) = match command {
            Command::GetBehaviourIndices => {
                let mut payload = Vec::new();
                for (index, bytes) in &state.behaviours {
                    payload.extend_from_slice(
                        &RemoteIndexEntry::new(*index, fletcher32(bytes)).to_bytes(),
                    );
                }
                (ResultCode::Success, payload)
            }
            Command::GetBehaviour { index } => {
                if state.fail_fetch == Some(index) {
                    return Err(TransportError::Disconnected);
                }
                match state.behaviours.get(&index) {
                    Some(bytes) => {
                        let mut payload = vec![index];
                        payload.extend_from_slice(bytes);
                        (ResultCode::Success, payload)
                    }
                    None => (ResultCode::NotFound, Vec::new()),
                }
            }
            Command::AddBehaviour { payload } => {
                match (0..=u8::MAX).find(|i| !state.behaviours.contains_key(i)) {
                    Some(index) => {
                        let entry = RemoteIndexEntry::new(index, fletcher32(&payload));
                        state.behaviours.insert(index, payload);
                        (ResultCode::Success, entry.to_bytes().to_vec())
                    }
                    None => (ResultCode::NoSpace, Vec::new()),
                }
            }
            Command::ReplaceBehaviour { index, payload } => {
                let entry = RemoteIndexEntry::new(index, fletcher32(&payload));
                state.behaviours.insert(index, payload);
                (ResultCode::Success, entry.to_bytes().to_vec())
            }
            Command::RemoveBehaviour { index } => match state.behaviours.remove(&index) {
                Some(_) => (ResultCode::Success, vec![index]),
                None => (ResultCode::NotFound, Vec::new()),
            },
            Command::ReadSetting { setting, .. } => {
                match state.settings.iter().find(|(s, _)| *s == setting) {
                    Some((_, value)) => {
                        let mut payload = setting.state_type().to_le_bytes().to_vec();
                        payload.extend_from_slice(&[0, 0, PersistenceScope::Current.as_u8(), 0]);
                        payload.extend_from_slice(&value.to_bytes());
                        (ResultCode::Success, payload)
                    }
                    None => (ResultCode::NotFound, Vec::new()),
                }
            }
            Command::WriteSetting { setting, value, .. } => {
                state.settings.retain(|(s, _)| *s != setting);
                state.settings.push((setting, value));
                (ResultCode::Success, Vec::new())
            }
            _ => (ResultCode::Success, Vec::new()),
        };
        Ok(self.reply(command_type, code, &payload))
    }
}

#[async_trait]
impl Transport for MockStation {
    async fn write(&self, packet: &WirePacket) -> Result<(), TransportError> {
        let command =
            decode_command(packet, self.version).map_err(|e| TransportError::Io(e.to_string()))?;
        self.state.lock().unwrap().requests.push(command);
        Ok(())
    }

    async fn request(&self, packet: &WirePacket) -> Result<Vec<u8>, TransportError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self.respond(packet);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

/// Client for `station` with the session already on V5.
pub fn v5_client(station: MockStation) -> StationClient<MockStation> {
    StationClient::new(station, Arc::new(Session::with_version(ProtocolVersion::V5)))
}
