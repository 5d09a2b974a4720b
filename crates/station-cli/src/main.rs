//! stationctl
//!
//! Offline tooling for station packets: encode commands, decode result and
//! advertisement payloads, and run the advertisement block cipher.
//!
//! ```text
//! stationctl encode --version v5 switch 0.5
//! stationctl encode --version v2 write tap-to-toggle-rssi-offset -4
//! stationctl decode-result --version v5 050200000007002b000000000001 --setting switchcraft-enabled
//! stationctl decode-adv --opcode 7 --subtype 0 <hex> --now 1700000000
//! stationctl cipher encrypt --key 00112233445566778899aabbccddeeff 01020304
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use station_client::StationConfig;
use station_protocol::{PersistenceScope, ProtocolVersion, Setting};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

mod commands;

/// Encode, decode and decipher station packets.
#[derive(Parser, Debug)]
#[command(name = "stationctl", about, long_about = None)]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (overrides RUST_LOG), e.g. `debug` or `station_protocol=trace`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode a command and print the channel and bytes.
    Encode {
        /// Protocol version; falls back to the configured one.
        #[arg(long)]
        version: Option<ProtocolVersion>,

        #[command(subcommand)]
        command: CommandArgs,
    },

    /// Decode a result packet.
    DecodeResult {
        #[arg(long)]
        version: Option<ProtocolVersion>,

        /// Also decode the payload as this setting's value.
        #[arg(long)]
        setting: Option<Setting>,

        /// Result bytes as hex.
        hex: String,
    },

    /// Decode an advertisement payload.
    DecodeAdv {
        #[arg(long)]
        opcode: u8,

        #[arg(long)]
        subtype: u8,

        /// Current time in seconds; defaults to the system clock.
        #[arg(long)]
        now: Option<u64>,

        /// Background broadcast key as hex; defaults to the configured key.
        #[arg(long)]
        key: Option<String>,

        /// Payload bytes as hex.
        hex: String,
    },

    /// Run the advertisement block cipher on one 4-byte block.
    Cipher {
        #[arg(value_enum)]
        direction: CipherDirection,

        /// 16-byte key as hex.
        #[arg(long)]
        key: String,

        /// 4-byte block as hex, in wire order.
        block: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
enum CommandArgs {
    /// Set the output level (0.0 to 1.0); out-of-range levels are clamped.
    Switch {
        #[arg(allow_hyphen_values = true)]
        level: f32,
    },
    TurnOn,
    FactoryReset,
    Reset,
    Disconnect,
    NoOperation,
    SetTime { timestamp: u32 },
    ResetErrors { mask: u32 },
    RemoveScheduleEntry { index: u8 },
    /// Upload a serialized behaviour given as hex.
    AddBehaviour { payload: String },
    ReplaceBehaviour { index: u8, payload: String },
    RemoveBehaviour { index: u8 },
    GetBehaviour { index: u8 },
    GetBehaviourIndices,
    /// Read a named setting.
    Read {
        setting: Setting,
        #[command(flatten)]
        target: SettingTarget,
    },
    /// Write a named setting.
    Write {
        setting: Setting,
        #[arg(allow_hyphen_values = true)]
        value: String,
        #[command(flatten)]
        target: SettingTarget,
    },
}

#[derive(Args, Debug, Clone)]
struct SettingTarget {
    #[arg(long, value_enum)]
    scope: Option<ScopeArg>,

    /// Instance id.
    #[arg(long, default_value_t = 0)]
    id: u16,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeArg {
    Current,
    Stored,
}

impl From<ScopeArg> for PersistenceScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Current => PersistenceScope::Current,
            ScopeArg::Stored => PersistenceScope::Stored,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum CipherDirection {
    Encrypt,
    Decrypt,
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config = match &cli.config {
        Some(path) => match StationConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => StationConfig::default(),
    };
    debug!(?config, "loaded configuration");

    match commands::run(&cli.command, &config) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
