//! Subcommand execution. Every command returns the text to print.

use serde_json::json;
use station_client::{ClientError, StationConfig, SystemClock, WallClock};
use station_packet::{
    bytes_to_hex, decode_advertisement, hex_to_bytes, BlockCipher, DecodeContext, PacketError,
};
use station_protocol::{
    decode_result, encode_command, Command, ProtocolError, ProtocolVersion, SettingValue,
};
use thiserror::Error;
use tracing::debug;

use crate::{CipherDirection, CommandArgs, Commands, SettingTarget};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Packet(#[from] PacketError),

    #[error("failed to render output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}

pub fn run(command: &Commands, config: &StationConfig) -> Result<String, CliError> {
    match command {
        Commands::Encode { version, command } => {
            let version = resolve_version(*version, config)?;
            let command = build_command(command)?;
            let packet = encode_command(&command, version)?;
            debug!(command = command.name(), %version, "encoded");
            Ok(serde_json::to_string_pretty(&packet)?)
        }
        Commands::DecodeResult {
            version,
            setting,
            hex,
        } => {
            let version = resolve_version(*version, config)?;
            let result = decode_result(&hex_to_bytes(hex)?, version)?;
            let output = match setting {
                Some(setting) => json!({
                    "result": result,
                    "value": result.setting_value(*setting, version)?,
                }),
                None => serde_json::to_value(&result)?,
            };
            Ok(serde_json::to_string_pretty(&output)?)
        }
        Commands::DecodeAdv {
            opcode,
            subtype,
            now,
            key,
            hex,
        } => {
            let now = now.unwrap_or_else(|| SystemClock.now_secs());
            let key = match key {
                Some(key) => Some(BlockCipher::from_slice(&hex_to_bytes(key)?)?),
                None => config.advertisement_key()?,
            };
            let mut ctx =
                DecodeContext::new(now).with_validation_tolerance(config.validation_tolerance_secs);
            if let Some(key) = key {
                ctx = ctx.with_key(key);
            }
            let record = decode_advertisement(*opcode, *subtype, &hex_to_bytes(hex)?, &ctx)?;
            Ok(serde_json::to_string_pretty(&record)?)
        }
        Commands::Cipher {
            direction,
            key,
            block,
        } => {
            let cipher = BlockCipher::from_slice(&hex_to_bytes(key)?)?;
            let bytes = hex_to_bytes(block)?;
            let block: [u8; 4] = bytes.as_slice().try_into().map_err(|_| {
                CliError::Usage(format!("block must be 4 bytes, got {}", bytes.len()))
            })?;
            let out = match direction {
                CipherDirection::Encrypt => cipher.encrypt_bytes(block),
                CipherDirection::Decrypt => cipher.decrypt_bytes(block),
            };
            Ok(bytes_to_hex(&out))
        }
    }
}

fn resolve_version(
    requested: Option<ProtocolVersion>,
    config: &StationConfig,
) -> Result<ProtocolVersion, CliError> {
    requested.or(config.protocol_version).ok_or_else(|| {
        CliError::Usage("no protocol version given and none configured".to_string())
    })
}

fn build_command(args: &CommandArgs) -> Result<Command, CliError> {
    let command = match args {
        CommandArgs::Switch { level } => Command::Switch { level: *level },
        CommandArgs::TurnOn => Command::TurnOn,
        CommandArgs::FactoryReset => Command::FactoryReset,
        CommandArgs::Reset => Command::Reset,
        CommandArgs::Disconnect => Command::Disconnect,
        CommandArgs::NoOperation => Command::NoOperation,
        CommandArgs::SetTime { timestamp } => Command::SetTime {
            timestamp: *timestamp,
        },
        CommandArgs::ResetErrors { mask } => Command::ResetErrors { mask: *mask },
        CommandArgs::RemoveScheduleEntry { index } => {
            Command::RemoveScheduleEntry { index: *index }
        }
        CommandArgs::AddBehaviour { payload } => Command::AddBehaviour {
            payload: hex_to_bytes(payload)?,
        },
        CommandArgs::ReplaceBehaviour { index, payload } => Command::ReplaceBehaviour {
            index: *index,
            payload: hex_to_bytes(payload)?,
        },
        CommandArgs::RemoveBehaviour { index } => Command::RemoveBehaviour { index: *index },
        CommandArgs::GetBehaviour { index } => Command::GetBehaviour { index: *index },
        CommandArgs::GetBehaviourIndices => Command::GetBehaviourIndices,
        CommandArgs::Read { setting, target } => with_target(Command::read(*setting), target),
        CommandArgs::Write {
            setting,
            value,
            target,
        } => {
            let value = SettingValue::parse(setting.value_kind(), value)?;
            with_target(Command::write(*setting, value), target)
        }
    };
    Ok(command)
}

/// Apply an explicit scope and instance id over the command's defaults.
fn with_target(mut command: Command, target: &SettingTarget) -> Command {
    if let Command::ReadSetting { scope, id, .. } | Command::WriteSetting { scope, id, .. } =
        &mut command
    {
        if let Some(requested) = target.scope {
            *scope = requested.into();
        }
        *id = target.id;
    }
    command
}
