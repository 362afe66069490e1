//! HTTP-level tests for the device client, against a mock speaker

use mockito::{Matcher, Server, ServerGuard};
use soundtouch_control::{
    AccessoryConfig, GlobalConfig, Key, PlayStatus, SoundTouchClient,
    SoundTouchDevice, SoundTouchError, SourceStatus, SpeakerControl,
};

const INFO: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>
<info deviceID="A0F6FD123456">
  <name>Kitchen</name>
  <type>SoundTouch 10</type>
  <components>
    <component>
      <componentCategory>SCM</componentCategory>
      <softwareVersion>27.0.6.46330.5043500</softwareVersion>
      <serialNumber>A0F6FD123456</serialNumber>
    </component>
  </components>
  <networkInfo type="SCM">
    <macAddress>A0F6FD123456</macAddress>
    <ipAddress>192.168.1.20</ipAddress>
  </networkInfo>
</info>"#;

const PRESETS: &str = r#"<presets>
  <preset id="1"><ContentItem source="TUNEIN" location="/v1/playback/station/s1" isPresetable="true"><itemName>Radio One</itemName></ContentItem></preset>
  <preset id="2"><ContentItem source="TUNEIN" location="/v1/playback/station/s2" isPresetable="true"><itemName>Jazz</itemName></ContentItem></preset>
</presets>"#;

const SOURCES: &str = r#"<sourceItems deviceID="A0F6FD123456">
  <sourceItem source="AUX" sourceAccount="AUX" status="READY" isLocal="true" multiroomallowed="true">AUX IN</sourceItem>
  <sourceItem source="BLUETOOTH" status="UNAVAILABLE" isLocal="true" multiroomallowed="true">Bluetooth</sourceItem>
  <sourceItem source="SPOTIFY" sourceAccount="user" status="READY" isLocal="false" multiroomallowed="true">user</sourceItem>
</sourceItems>"#;

fn client_for(server: &ServerGuard) -> SoundTouchClient {
    let host_with_port = server.host_with_port();
    let (host, port) = host_with_port
        .rsplit_once(':')
        .expect("mock server address has a port");
    SoundTouchClient::new(host, port.parse().expect("numeric port")).expect("client")
}

#[tokio::test]
async fn test_volume_is_decoded() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/volume")
        .with_status(200)
        .with_header("content-type", "text/xml")
        .with_body(
            r#"<volume deviceID="A0F6FD123456"><targetvolume>32</targetvolume><actualvolume>30</actualvolume><muteenabled>true</muteenabled></volume>"#,
        )
        .create_async()
        .await;

    let volume = client_for(&server).get_volume().await.expect("volume");

    assert_eq!(volume.target, 32);
    assert_eq!(volume.actual, 30);
    assert!(volume.muted);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_standby_source_from_now_playing() {
    let mut server = Server::new_async().await;
    let _now_playing = server
        .mock("GET", "/now_playing")
        .with_body(
            r#"<nowPlaying deviceID="A0F6FD123456" source="STANDBY"><ContentItem source="STANDBY" isPresetable="true" /></nowPlaying>"#,
        )
        .create_async()
        .await;

    let client = client_for(&server);
    assert_eq!(client.get_source().await, Some(SourceStatus::Standby));
}

#[tokio::test]
async fn test_now_playing_metadata() {
    let mut server = Server::new_async().await;
    let _now_playing = server
        .mock("GET", "/now_playing")
        .with_body(
            r#"<nowPlaying deviceID="A0F6FD123456" source="TUNEIN" sourceAccount="">
  <ContentItem source="TUNEIN" location="/v1/playback/station/s1" isPresetable="true"><itemName>Radio One</itemName></ContentItem>
  <track>Morning Show</track>
  <artist>Host</artist>
  <stationName>Radio One</stationName>
  <art artImageStatus="IMAGE_PRESENT">http://example.com/art.png</art>
  <playStatus>BUFFERING_STATE</playStatus>
</nowPlaying>"#,
        )
        .create_async()
        .await;

    let now_playing = client_for(&server).get_now_playing().await.expect("now playing");

    assert_eq!(now_playing.source, SourceStatus::TuneIn);
    assert_eq!(now_playing.play_status, Some(PlayStatus::Buffering));
    assert_eq!(now_playing.track.as_deref(), Some("Morning Show"));
    assert_eq!(now_playing.station_name.as_deref(), Some("Radio One"));
}

#[tokio::test]
async fn test_http_error_yields_no_data() {
    let mut server = Server::new_async().await;
    let _volume = server
        .mock("GET", "/volume")
        .with_status(500)
        .create_async()
        .await;

    assert_eq!(client_for(&server).get_volume().await, None);
}

#[tokio::test]
async fn test_unexpected_document_yields_no_data() {
    let mut server = Server::new_async().await;
    let _volume = server
        .mock("GET", "/volume")
        .with_body(r#"<errors deviceID="A0F6FD123456"><error value="401" name="HTTP_STATUS_UNAUTHORIZED" /></errors>"#)
        .create_async()
        .await;
    let _info = server
        .mock("GET", "/info")
        .with_body("<info deviceID=")
        .create_async()
        .await;

    let client = client_for(&server);
    assert_eq!(client.get_volume().await, None);
    assert_eq!(client.get_info().await, None);
}

#[tokio::test]
async fn test_key_press_sends_press_then_release() {
    let mut server = Server::new_async().await;
    let press = server
        .mock("POST", "/key")
        .match_body(r#"<key state="press" sender="Gabbo">POWER</key>"#)
        .with_body("<status>/key</status>")
        .expect(1)
        .create_async()
        .await;
    let release = server
        .mock("POST", "/key")
        .match_body(r#"<key state="release" sender="Gabbo">POWER</key>"#)
        .with_body("<status>/key</status>")
        .expect(1)
        .create_async()
        .await;

    client_for(&server).press_key(Key::Power).await.expect("press");

    press.assert_async().await;
    release.assert_async().await;
}

#[tokio::test]
async fn test_rejected_key_press_is_an_error() {
    let mut server = Server::new_async().await;
    let _key = server
        .mock("POST", "/key")
        .with_status(400)
        .create_async()
        .await;

    let err = client_for(&server)
        .press_key(Key::Mute)
        .await
        .expect_err("400 should fail");

    assert!(matches!(err, SoundTouchError::Status { status: 400, .. }));
    assert!(err.is_communication_failure());
}

#[tokio::test]
async fn test_set_volume_and_select_payloads() {
    let mut server = Server::new_async().await;
    let volume = server
        .mock("POST", "/volume")
        .match_body("<volume>25</volume>")
        .create_async()
        .await;
    let select = server
        .mock("POST", "/select")
        .match_body(Matcher::Regex(r#"<ContentItem source="AUX" sourceAccount="AUX""#.to_string()))
        .create_async()
        .await;

    let client = client_for(&server);
    client.set_volume(25).await.expect("volume");
    client
        .select(&soundtouch_control::ContentItem {
            source: "AUX".to_string(),
            source_account: "AUX".to_string(),
            ..Default::default()
        })
        .await
        .expect("select");

    volume.assert_async().await;
    select.assert_async().await;
}

#[tokio::test]
async fn test_device_from_config_by_ip() {
    let mut server = Server::new_async().await;
    let _info = server.mock("GET", "/info").with_body(INFO).create_async().await;
    let _presets = server.mock("GET", "/presets").with_body(PRESETS).create_async().await;
    let _sources = server.mock("GET", "/sources").with_body(SOURCES).create_async().await;

    let host_with_port = server.host_with_port();
    let (host, port) = host_with_port.rsplit_once(':').unwrap();
    let global: GlobalConfig = serde_json::from_value(serde_json::json!({
        "pollingInterval": 5000,
        "presets": [ { "index": 2, "enabled": false } ]
    }))
    .unwrap();
    let accessory = AccessoryConfig {
        ip: Some(host.to_string()),
        port: Some(port.parse().unwrap()),
        ..Default::default()
    };

    let device = SoundTouchDevice::from_config(&global, &accessory, None)
        .await
        .expect("device");

    assert_eq!(device.name, "Kitchen");
    assert_eq!(device.endpoint.device_id, "A0F6FD123456");
    assert_eq!(device.endpoint.model, "SoundTouch 10");
    assert_eq!(
        device.endpoint.firmware_version.as_deref(),
        Some("27.0.6.46330.5043500")
    );
    assert_eq!(device.settings.presets.len(), 1);
    assert_eq!(device.settings.presets[0].name, "Radio One");

    let names: Vec<_> = device.settings.sources.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Kitchen AUX IN", "Kitchen Bluetooth"]);
}

#[tokio::test]
async fn test_device_without_address_is_a_configuration_error() {
    let err = SoundTouchDevice::from_config(
        &GlobalConfig::default(),
        &AccessoryConfig::default(),
        None,
    )
    .await
    .expect_err("no ip or room");

    assert!(matches!(err, SoundTouchError::Configuration(_)));
}

#[tokio::test]
async fn test_device_without_source_list_is_a_configuration_error() {
    let mut server = Server::new_async().await;
    let _info = server.mock("GET", "/info").with_body(INFO).create_async().await;
    let _presets = server.mock("GET", "/presets").with_body(PRESETS).create_async().await;
    let _sources = server.mock("GET", "/sources").with_status(500).create_async().await;

    let host_with_port = server.host_with_port();
    let (host, port) = host_with_port.rsplit_once(':').unwrap();
    let accessory = AccessoryConfig {
        ip: Some(host.to_string()),
        port: Some(port.parse().unwrap()),
        ..Default::default()
    };

    let err = SoundTouchDevice::from_config(&GlobalConfig::default(), &accessory, None)
        .await
        .expect_err("sources unavailable");

    assert!(matches!(err, SoundTouchError::Configuration(_)));
}
