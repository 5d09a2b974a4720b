//! Result packets returned by the station.

use std::fmt;

use serde::Serialize;

use crate::constants::STATE_HEADER_SIZE;
use crate::error::ProtocolError;
use crate::setting::{Setting, SettingValue};
use crate::version::ProtocolVersion;

macro_rules! result_codes {
    ($($variant:ident = $value:literal => $name:literal,)*) => {
        /// Outcome code carried by every result packet.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum ResultCode {
            $($variant,)*
        }

        impl ResultCode {
            /// Map a raw code; anything outside the known set is rejected.
            pub fn from_u16(value: u16) -> Result<Self, ProtocolError> {
                match value {
                    $($value => Ok(ResultCode::$variant),)*
                    other => Err(ProtocolError::UnrecognizedResult(other)),
                }
            }

            pub fn as_u16(self) -> u16 {
                match self {
                    $(ResultCode::$variant => $value,)*
                }
            }

            pub fn as_str(self) -> &'static str {
                match self {
                    $(ResultCode::$variant => $name,)*
                }
            }
        }
    };
}

result_codes! {
    Success = 0 => "SUCCESS",
    WaitForSuccess = 1 => "WAIT_FOR_SUCCESS",
    SuccessNoChange = 2 => "SUCCESS_NO_CHANGE",
    BufferUnassigned = 16 => "BUFFER_UNASSIGNED",
    BufferLocked = 17 => "BUFFER_LOCKED",
    BufferTooSmall = 18 => "BUFFER_TOO_SMALL",
    WrongPayloadLength = 32 => "WRONG_PAYLOAD_LENGTH",
    WrongParameter = 33 => "WRONG_PARAMETER",
    InvalidMessage = 34 => "INVALID_MESSAGE",
    UnknownOpCode = 35 => "UNKNOWN_OP_CODE",
    UnknownType = 36 => "UNKNOWN_TYPE",
    NotFound = 37 => "NOT_FOUND",
    NoSpace = 38 => "NO_SPACE",
    Busy = 39 => "BUSY",
    WrongState = 40 => "WRONG_STATE",
    AlreadyExists = 41 => "ALREADY_EXISTS",
    Timeout = 42 => "TIMEOUT",
    Canceled = 43 => "CANCELED",
    ProtocolUnsupported = 44 => "PROTOCOL_UNSUPPORTED",
    Mismatch = 45 => "MISMATCH",
    NoAccess = 48 => "NO_ACCESS",
    Unsafe = 49 => "UNSAFE",
    NotAvailable = 64 => "NOT_AVAILABLE",
    NotImplemented = 65 => "NOT_IMPLEMENTED",
    NotInitialized = 67 => "NOT_INITIALIZED",
    WriteDisabled = 80 => "WRITE_DISABLED",
    WriteNotAllowed = 81 => "WRITE_NOT_ALLOWED",
    Unspecified = 65535 => "UNSPECIFIED",
}

impl ResultCode {
    /// The station carried out the command.
    pub fn is_success(self) -> bool {
        matches!(self, ResultCode::Success | ResultCode::SuccessNoChange)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded result packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    /// Control type (or flat id) the result answers.
    pub command: u16,
    pub code: ResultCode,
    #[serde(serialize_with = "serialize_hex")]
    pub payload: Vec<u8>,
}

impl CommandResult {
    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Decode the payload of a setting read.
    ///
    /// Envelope versions prefix the value with the state header, whose state
    /// type must match `setting`. Flat versions carry the bare value.
    pub fn setting_value(
        &self,
        setting: Setting,
        version: ProtocolVersion,
    ) -> Result<SettingValue, ProtocolError> {
        let value = if version.is_envelope() {
            if self.payload.len() < STATE_HEADER_SIZE {
                return Err(ProtocolError::FrameTooShort {
                    expected: STATE_HEADER_SIZE,
                    actual: self.payload.len(),
                });
            }
            let state_type = u16::from_le_bytes([self.payload[0], self.payload[1]]);
            if state_type != setting.state_type() {
                return Err(ProtocolError::UnexpectedType {
                    expected: setting.state_type(),
                    actual: state_type,
                });
            }
            &self.payload[STATE_HEADER_SIZE..]
        } else {
            &self.payload[..]
        };
        SettingValue::decode(setting.value_kind(), value)
    }
}

/// Decode a result packet as `version` frames it.
pub fn decode_result(bytes: &[u8], version: ProtocolVersion) -> Result<CommandResult, ProtocolError> {
    version.format().decode_result(bytes)
}

fn serialize_hex<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&station_packet::bytes_to_hex(bytes))
}
