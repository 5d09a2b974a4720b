//! Request/result exchanges through `StationClient`.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{v5_client, MockStation};
use station_client::{Behaviour, ClientError, StationClient, TransportError};
use station_protocol::{
    Command, ProtocolError, ProtocolVersion, ResultCode, Session, Setting, SettingValue,
    CTRL_SWITCH,
};

#[tokio::test]
async fn test_read_and_write_setting() {
    let station = MockStation::new(ProtocolVersion::V5)
        .with_setting(Setting::SwitchcraftEnabled, SettingValue::Bool(false));
    let client = v5_client(station);

    assert_eq!(
        client.read_setting(Setting::SwitchcraftEnabled).await.unwrap(),
        SettingValue::Bool(false)
    );
    client
        .write_setting(Setting::SwitchcraftEnabled, SettingValue::Bool(true))
        .await
        .unwrap();
    assert_eq!(
        client.transport().setting(Setting::SwitchcraftEnabled),
        Some(SettingValue::Bool(true))
    );
    assert_eq!(
        client.read_setting(Setting::SwitchcraftEnabled).await.unwrap(),
        SettingValue::Bool(true)
    );
}

#[tokio::test]
async fn test_v3_session() {
    let station = MockStation::new(ProtocolVersion::V3)
        .with_setting(Setting::DimmingAllowed, SettingValue::Bool(true));
    let client = StationClient::new(station, Arc::new(Session::with_version(ProtocolVersion::V3)));

    assert_eq!(
        client.read_setting(Setting::DimmingAllowed).await.unwrap(),
        SettingValue::Bool(true)
    );
    client.switch(0.25).await.unwrap();
    assert_eq!(
        client.transport().requests().last(),
        Some(&Command::Switch { level: 0.25 })
    );
}

#[tokio::test]
async fn test_behaviour_lifecycle() {
    let client = v5_client(MockStation::new(ProtocolVersion::V5).with_behaviour(0, vec![9]));
    let behaviour = Behaviour::new(vec![1, 2, 3, 4]);

    let stored = client.add_behaviour(&behaviour).await.unwrap();
    assert_eq!(stored.index, 1);
    assert_eq!(stored.hash, behaviour.hash());

    let fetched = client.get_behaviour(1).await.unwrap();
    assert_eq!(fetched, Behaviour::with_index(1, vec![1, 2, 3, 4]));

    let replacement = Behaviour::new(vec![5, 6]);
    let stored = client.replace_behaviour(1, &replacement).await.unwrap();
    assert_eq!(stored.hash, replacement.hash());

    let indices = client.get_behaviour_indices().await.unwrap();
    assert_eq!(indices.len(), 2);
    assert_eq!(indices[1].hash, replacement.hash());

    client.remove_behaviour(1).await.unwrap();
    assert_eq!(client.transport().behaviours().len(), 1);
}

#[tokio::test]
async fn test_error_code_is_rejection() {
    let client = v5_client(MockStation::new(ProtocolVersion::V5));

    assert_eq!(
        client.get_behaviour(4).await,
        Err(ClientError::Rejected {
            command: "get_behaviour",
            code: ResultCode::NotFound
        })
    );
    assert_eq!(
        client.remove_behaviour(4).await,
        Err(ClientError::Rejected {
            command: "remove_behaviour",
            code: ResultCode::NotFound
        })
    );
}

#[tokio::test]
async fn test_result_for_other_command_is_rejected() {
    let station = MockStation::new(ProtocolVersion::V5);
    let reply = station.reply(CTRL_SWITCH, ResultCode::Success, &[]);
    let client = v5_client(station.forced_reply(reply));

    assert!(matches!(
        client.get_behaviour_indices().await,
        Err(ClientError::Protocol(ProtocolError::UnexpectedType {
            expected: 64,
            actual: 20
        }))
    ));
}

#[tokio::test]
async fn test_unknown_result_code_surfaces() {
    let station = MockStation::new(ProtocolVersion::V5);
    let mut reply = station.reply(CTRL_SWITCH, ResultCode::Success, &[]);
    reply[3] = 0x99;
    let client = v5_client(station.forced_reply(reply));

    assert_eq!(
        client.switch(1.0).await,
        Err(ClientError::Protocol(ProtocolError::UnrecognizedResult(0x99)))
    );
}

#[tokio::test]
async fn test_truncated_index_is_length_mismatch() {
    let station = MockStation::new(ProtocolVersion::V5);
    let reply = station.reply(64, ResultCode::Success, &[1, 2, 3]);
    let client = v5_client(station.forced_reply(reply));

    assert!(matches!(
        client.get_behaviour_indices().await,
        Err(ClientError::Protocol(ProtocolError::LengthMismatch { .. }))
    ));
}

#[tokio::test]
async fn test_requires_negotiated_version() {
    let client = StationClient::new(MockStation::new(ProtocolVersion::V5), Arc::new(Session::new()));

    assert_eq!(
        client.switch(1.0).await,
        Err(ClientError::Protocol(ProtocolError::VersionNotNegotiated))
    );
    assert!(client.transport().requests().is_empty());
}

#[tokio::test]
async fn test_unsupported_command_never_reaches_transport() {
    let client = StationClient::new(
        MockStation::new(ProtocolVersion::V5),
        Arc::new(Session::with_version(ProtocolVersion::V2)),
    );

    assert!(matches!(
        client.get_behaviour_indices().await,
        Err(ClientError::Protocol(ProtocolError::UnsupportedOperation { .. }))
    ));
    assert!(client.transport().requests().is_empty());
}

#[tokio::test]
async fn test_send_does_not_wait_for_result() {
    let client = v5_client(MockStation::new(ProtocolVersion::V5));

    client.send(&Command::Disconnect).await.unwrap();
    assert_eq!(client.transport().requests(), vec![Command::Disconnect]);
}

#[tokio::test(start_paused = true)]
async fn test_one_request_in_flight() {
    let station = MockStation::new(ProtocolVersion::V5)
        .with_behaviour(0, vec![1])
        .with_behaviour(1, vec![2])
        .with_delay(Duration::from_millis(200));
    let client = v5_client(station);

    let (a, b, c) = tokio::join!(
        client.get_behaviour(0),
        client.get_behaviour(1),
        client.switch(0.5)
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(client.transport().max_in_flight(), 1);
    assert_eq!(client.transport().requests().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_transport_failure() {
    let station = MockStation::new(ProtocolVersion::V5).with_delay(Duration::from_secs(30));
    let client = v5_client(station).with_timeout(Duration::from_secs(1));

    let err = client.switch(1.0).await.unwrap_err();
    assert_eq!(err, ClientError::Transport(TransportError::Timeout));
    assert!(err.is_transport());
}
