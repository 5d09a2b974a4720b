//! Single-channel station client.
//!
//! A station accepts one request at a time. [`StationClient`] holds an
//! async mutex across each write→result exchange so concurrent callers
//! queue instead of interleaving on the link.

use std::sync::Arc;
use std::time::Duration;

use station_metrics::{metric_defs, metrics};
use station_protocol::{
    decode_result, encode_command, Command, CommandResult, ProtocolError, ProtocolVersion,
    Session, Setting, SettingValue,
};
use tokio::sync::Mutex;
use tokio::time::{timeout, Instant};
use tracing::{debug, trace, warn};

use crate::behaviour::Behaviour;
use crate::error::{ClientError, TransportError};
use crate::index::{self, RemoteIndexEntry};
use crate::transport::Transport;

/// Per-step timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Serialised access to one connected station.
pub struct StationClient<T: Transport> {
    transport: T,
    session: Arc<Session>,
    channel: Mutex<()>,
    request_timeout: Duration,
}

impl<T: Transport> StationClient<T> {
    pub fn new(transport: T, session: Arc<Session>) -> Self {
        StationClient {
            transport,
            session,
            channel: Mutex::new(()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set how long each request may wait for its result.
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Negotiated protocol version.
    pub fn version(&self) -> Result<ProtocolVersion, ClientError> {
        Ok(self.session.version()?)
    }

    /// Send `command` and wait for a successful result.
    ///
    /// The result must answer the same command type and carry a success
    /// code; anything else is an error.
    pub async fn execute(&self, command: &Command) -> Result<CommandResult, ClientError> {
        let version = self.version()?;
        let packet = encode_command(command, version)?;
        let expected = command.expected_result_type(version)?;
        let name = command.name();

        let reply = {
            let _channel = self.channel.lock().await;
            metrics::counter!(metric_defs::CLIENT_REQUESTS.name, "command" => name).increment(1);
            trace!(command = name, bytes = %packet.to_hex(), "request");

            let started = Instant::now();
            let reply = self.with_timeout_step(self.transport.request(&packet)).await;
            metrics::histogram!(metric_defs::CLIENT_REQUEST_TIME.name, "command" => name)
                .record(started.elapsed().as_secs_f64() * 1000.0);
            reply
        };
        let bytes = match reply {
            Ok(bytes) => bytes,
            Err(e) => {
                metrics::counter!(metric_defs::CLIENT_TRANSPORT_ERRORS.name, "command" => name)
                    .increment(1);
                warn!(command = name, error = %e, "request failed");
                return Err(e.into());
            }
        };

        let result = decode_result(&bytes, version)?;
        if result.command != expected {
            return Err(ProtocolError::UnexpectedType {
                expected,
                actual: result.command,
            }
            .into());
        }
        if !result.is_success() {
            metrics::counter!(
                metric_defs::CLIENT_REJECTED.name,
                "command" => name,
                "code" => result.code.as_str()
            )
            .increment(1);
            debug!(command = name, code = %result.code, "command rejected");
            return Err(ClientError::Rejected {
                command: name,
                code: result.code,
            });
        }

        debug!(command = name, code = %result.code, "command completed");
        Ok(result)
    }

    /// Write `command` without waiting for a result.
    pub async fn send(&self, command: &Command) -> Result<(), ClientError> {
        let version = self.version()?;
        let packet = encode_command(command, version)?;
        let name = command.name();

        let _channel = self.channel.lock().await;
        metrics::counter!(metric_defs::CLIENT_REQUESTS.name, "command" => name).increment(1);
        if let Err(e) = self.with_timeout_step(self.transport.write(&packet)).await {
            metrics::counter!(metric_defs::CLIENT_TRANSPORT_ERRORS.name, "command" => name)
                .increment(1);
            warn!(command = name, error = %e, "write failed");
            return Err(e.into());
        }
        debug!(command = name, "command sent");
        Ok(())
    }

    pub async fn switch(&self, level: f32) -> Result<(), ClientError> {
        self.execute(&Command::Switch { level }).await.map(|_| ())
    }

    pub async fn read_setting(&self, setting: Setting) -> Result<SettingValue, ClientError> {
        let result = self.execute(&Command::read(setting)).await?;
        Ok(result.setting_value(setting, self.version()?)?)
    }

    pub async fn write_setting(
        &self,
        setting: Setting,
        value: SettingValue,
    ) -> Result<(), ClientError> {
        self.execute(&Command::write(setting, value)).await.map(|_| ())
    }

    /// Fetch the station's `(index, hash)` listing.
    pub async fn get_behaviour_indices(&self) -> Result<Vec<RemoteIndexEntry>, ClientError> {
        let result = self.execute(&Command::GetBehaviourIndices).await?;
        Ok(index::parse_indices(&result.payload)?)
    }

    /// Fetch the behaviour stored at `index`.
    pub async fn get_behaviour(&self, index: u8) -> Result<Behaviour, ClientError> {
        let result = self.execute(&Command::GetBehaviour { index }).await?;
        let behaviour = index::parse_behaviour(&result.payload)?;
        if behaviour.index != Some(index) {
            return Err(ProtocolError::InvalidData(format!(
                "requested behaviour {} but received {:?}",
                index, behaviour.index
            ))
            .into());
        }
        Ok(behaviour)
    }

    /// Upload a new behaviour; returns where the station stored it.
    pub async fn add_behaviour(&self, behaviour: &Behaviour) -> Result<RemoteIndexEntry, ClientError> {
        let result = self
            .execute(&Command::AddBehaviour {
                payload: behaviour.payload.clone(),
            })
            .await?;
        let entry = index::parse_stored(&result.payload)?;
        check_stored_hash(behaviour, &entry);
        Ok(entry)
    }

    pub async fn replace_behaviour(
        &self,
        index: u8,
        behaviour: &Behaviour,
    ) -> Result<RemoteIndexEntry, ClientError> {
        let result = self
            .execute(&Command::ReplaceBehaviour {
                index,
                payload: behaviour.payload.clone(),
            })
            .await?;
        let entry = index::parse_stored(&result.payload)?;
        check_stored_hash(behaviour, &entry);
        Ok(entry)
    }

    pub async fn remove_behaviour(&self, index: u8) -> Result<(), ClientError> {
        let result = self.execute(&Command::RemoveBehaviour { index }).await?;
        let removed = index::parse_removed(&result.payload)?;
        if removed != index {
            return Err(ProtocolError::InvalidData(format!(
                "removed behaviour {} but station reported {}",
                index, removed
            ))
            .into());
        }
        Ok(())
    }

    async fn with_timeout_step<F, R>(&self, step: F) -> Result<R, TransportError>
    where
        F: std::future::Future<Output = Result<R, TransportError>>,
    {
        match timeout(self.request_timeout, step).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

fn check_stored_hash(behaviour: &Behaviour, entry: &RemoteIndexEntry) {
    if behaviour.hash() != entry.hash {
        warn!(
            index = entry.index,
            local = behaviour.hash(),
            remote = entry.hash,
            "station reported a different behaviour hash"
        );
    }
}
