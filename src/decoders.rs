//! Typed decoders for device status documents.
//!
//! Every decoder is total: a structurally incomplete element decodes to
//! `None` instead of an error, and list decoders drop entries that fail to
//! decode rather than rejecting the whole list.

use crate::types::{
    Art, ArtStatus, Component, ConnectionStatusInfo, ContentItem, Info, NetworkInfo, NowPlaying,
    PlayStatus, Preset, SourceAvailability, SourceItem, SourceStatus, Sources, Volume, Zone,
    ZoneMember,
};
use crate::xml::XmlElement;

/// Build a typed record from an XML element
pub trait FromElement: Sized {
    fn from_element(element: &XmlElement) -> Option<Self>;
}

/// Render a typed record as an XML element (command payloads)
pub trait ToElement {
    fn to_element(&self) -> XmlElement;
}

/// Decode every `child_name` child of `parent`, silently dropping the
/// entries that decode to `None`
pub fn decode_list<T: FromElement>(parent: &XmlElement, child_name: &str) -> Vec<T> {
    parent
        .children(child_name)
        .filter_map(T::from_element)
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn parse_level(value: Option<&str>) -> Option<u8> {
    value?.trim().parse::<u8>().ok().map(|level| level.min(100))
}

impl FromElement for ContentItem {
    fn from_element(element: &XmlElement) -> Option<Self> {
        let source = non_empty(element.attribute("source"))?;

        Some(ContentItem {
            source,
            source_account: element
                .attribute("sourceAccount")
                .unwrap_or_default()
                .to_string(),
            location: element.attribute("location").map(str::to_string),
            item_name: element.child_text("itemName").map(str::to_string),
            is_presetable: element.attribute("isPresetable").map(|v| v == "true"),
            container_art: element
                .attribute("containerArt")
                .or_else(|| element.child_text("containerArt"))
                .map(str::to_string),
        })
    }
}

impl ToElement for ContentItem {
    fn to_element(&self) -> XmlElement {
        let mut element = XmlElement::new("ContentItem")
            .with_attribute("source", self.source.as_str())
            .with_attribute("sourceAccount", self.source_account.as_str());

        if let Some(presetable) = self.is_presetable {
            element = element.with_attribute("isPresetable", presetable.to_string());
        }
        if let Some(location) = &self.location {
            element = element.with_attribute("location", location.as_str());
        }
        if let Some(art) = &self.container_art {
            element = element.with_attribute("containerArt", art.as_str());
        }
        if let Some(name) = &self.item_name {
            element = element.with_child(XmlElement::new("itemName").with_text(name.as_str()));
        }
        element
    }
}

impl FromElement for Art {
    fn from_element(element: &XmlElement) -> Option<Self> {
        let status = element.attribute("artImageStatus")?;
        let url = element.text()?;

        Some(Art {
            status: ArtStatus::from_wire(status),
            url: url.to_string(),
        })
    }
}

impl FromElement for ConnectionStatusInfo {
    fn from_element(element: &XmlElement) -> Option<Self> {
        Some(ConnectionStatusInfo {
            status: element.attribute("status").map(str::to_string),
            device_name: element.attribute("deviceName").map(str::to_string),
        })
    }
}

impl FromElement for NowPlaying {
    fn from_element(element: &XmlElement) -> Option<Self> {
        let source = element.attribute("source")?;

        Some(NowPlaying {
            device_id: element.attribute("deviceID").map(str::to_string),
            source: SourceStatus::from_wire(source),
            content_item: element.child("ContentItem").and_then(ContentItem::from_element),
            track: element.child_text("track").map(str::to_string),
            artist: element.child_text("artist").map(str::to_string),
            album: element.child_text("album").map(str::to_string),
            station_name: element.child_text("stationName").map(str::to_string),
            art: element.child("art").and_then(Art::from_element),
            play_status: element.child_text("playStatus").map(PlayStatus::from_wire),
            connection_status: element
                .child("connectionStatusInfo")
                .and_then(ConnectionStatusInfo::from_element),
        })
    }
}

impl FromElement for Volume {
    fn from_element(element: &XmlElement) -> Option<Self> {
        Some(Volume {
            target: parse_level(element.child_text("targetvolume"))?,
            actual: parse_level(element.child_text("actualvolume"))?,
            muted: element.child_text("muteenabled") == Some("true"),
        })
    }
}

impl FromElement for Preset {
    fn from_element(element: &XmlElement) -> Option<Self> {
        let id = element.attribute("id")?.trim().parse::<u8>().ok()?;
        let content_item = element.child("ContentItem").and_then(ContentItem::from_element)?;

        Some(Preset { id, content_item })
    }
}

impl FromElement for SourceItem {
    fn from_element(element: &XmlElement) -> Option<Self> {
        if !element.has_attributes(&["source", "status"]) {
            return None;
        }
        let source = non_empty(element.attribute("source"))?;
        let status = non_empty(element.attribute("status"))?;
        let name = element.text()?;

        Some(SourceItem {
            name: name.to_string(),
            source,
            source_account: element
                .attribute("sourceAccount")
                .unwrap_or_default()
                .to_string(),
            status: SourceAvailability::from_wire(&status),
            is_local: element.attribute("isLocal") == Some("true"),
            multiroom_allowed: element.attribute("multiroomallowed") == Some("true"),
        })
    }
}

impl FromElement for Sources {
    fn from_element(element: &XmlElement) -> Option<Self> {
        let device_id = non_empty(element.attribute("deviceID"))?;

        Some(Sources {
            device_id,
            items: decode_list(element, "sourceItem"),
        })
    }
}

impl FromElement for ZoneMember {
    fn from_element(element: &XmlElement) -> Option<Self> {
        Some(ZoneMember {
            device_id: element.text()?.to_string(),
            ip_address: element.attribute("ipaddress").map(str::to_string),
        })
    }
}

impl FromElement for Zone {
    fn from_element(element: &XmlElement) -> Option<Self> {
        let master = non_empty(element.attribute("master"))?;

        Some(Zone {
            master,
            members: decode_list(element, "member"),
        })
    }
}

impl ToElement for Zone {
    fn to_element(&self) -> XmlElement {
        self.members.iter().fold(
            XmlElement::new("zone").with_attribute("master", self.master.as_str()),
            |zone, member| {
                let mut element = XmlElement::new("member").with_text(member.device_id.as_str());
                if let Some(ip) = &member.ip_address {
                    element = element.with_attribute("ipaddress", ip.as_str());
                }
                zone.with_child(element)
            },
        )
    }
}

impl FromElement for Component {
    fn from_element(element: &XmlElement) -> Option<Self> {
        Some(Component {
            category: element.child_text("componentCategory").map(str::to_string),
            software_version: element.child_text("softwareVersion").map(str::to_string),
            serial_number: element.child_text("serialNumber").map(str::to_string),
        })
    }
}

impl FromElement for NetworkInfo {
    fn from_element(element: &XmlElement) -> Option<Self> {
        Some(NetworkInfo {
            kind: element.attribute("type").map(str::to_string),
            mac_address: element.child_text("macAddress").map(str::to_string),
            ip_address: element.child_text("ipAddress").map(str::to_string),
        })
    }
}

impl FromElement for Info {
    fn from_element(element: &XmlElement) -> Option<Self> {
        let device_id = non_empty(element.attribute("deviceID"))?;
        let name = element.child_text("name")?.to_string();

        Some(Info {
            device_id,
            name,
            model: element.child_text("type").unwrap_or_default().to_string(),
            components: element
                .child("components")
                .map(|c| decode_list(c, "component"))
                .unwrap_or_default(),
            network: decode_list(element, "networkInfo"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(xml: &str) -> XmlElement {
        XmlElement::parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn content_item_without_source_is_absent() {
        let element = parse(r#"<ContentItem sourceAccount="x"><itemName>Radio</itemName></ContentItem>"#);
        assert_eq!(ContentItem::from_element(&element), None);

        let element = parse(r#"<ContentItem source=""/>"#);
        assert_eq!(ContentItem::from_element(&element), None);
    }

    #[test]
    fn content_item_round_trip() {
        let item = ContentItem {
            source: "TUNEIN".to_string(),
            source_account: "".to_string(),
            location: Some("/v1/playback/station/s33828".to_string()),
            item_name: Some("K-LOVE & Friends".to_string()),
            is_presetable: Some(true),
            container_art: None,
        };

        let xml = item.to_element().to_xml().unwrap();
        let decoded = ContentItem::from_element(&parse(&xml)).unwrap();

        assert_eq!(decoded, item);
    }

    #[test]
    fn malformed_preset_entries_are_dropped() {
        let element = parse(
            r#"<presets>
                <preset id="1"><ContentItem source="TUNEIN" location="/a"><itemName>One</itemName></ContentItem></preset>
                <preset id="2"><ContentItem location="/b"><itemName>Broken</itemName></ContentItem></preset>
                <preset id="3"><ContentItem source="SPOTIFY" sourceAccount="me"><itemName>Three</itemName></ContentItem></preset>
            </presets>"#,
        );

        let presets: Vec<Preset> = decode_list(&element, "preset");
        let ids: Vec<u8> = presets.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(presets[1].content_item.source_account, "me");
    }

    #[rstest]
    #[case("PLAY_STATE", PlayStatus::Play)]
    #[case("PAUSE_STATE", PlayStatus::Pause)]
    #[case("STOP_STATE", PlayStatus::Stop)]
    #[case("BUFFERING_STATE", PlayStatus::Buffering)]
    #[case("INVALID_PLAY_STATUS", PlayStatus::Unknown)]
    #[case("", PlayStatus::Unknown)]
    fn play_status_from_wire(#[case] wire: &str, #[case] expected: PlayStatus) {
        assert_eq!(PlayStatus::from_wire(wire), expected);
    }

    #[rstest]
    #[case("STANDBY", SourceStatus::Standby)]
    #[case("BLUETOOTH", SourceStatus::Bluetooth)]
    #[case("INVALID_SOURCE", SourceStatus::Invalid)]
    #[case("ALEXA", SourceStatus::Other("ALEXA".to_string()))]
    fn source_status_from_wire(#[case] wire: &str, #[case] expected: SourceStatus) {
        assert_eq!(SourceStatus::from_wire(wire), expected);
    }

    #[test]
    fn now_playing_in_standby() {
        let element = parse(
            r#"<nowPlaying deviceID="689E19B8BB8A" source="STANDBY">
                <ContentItem source="STANDBY" isPresetable="false" />
            </nowPlaying>"#,
        );
        let now_playing = NowPlaying::from_element(&element).unwrap();

        assert!(now_playing.source.is_standby());
        assert_eq!(now_playing.play_status, None);
        assert_eq!(
            now_playing.content_item.and_then(|c| c.is_presetable),
            Some(false)
        );
    }

    #[test]
    fn now_playing_with_track_metadata() {
        let element = parse(
            r#"<nowPlaying deviceID="689E19B8BB8A" source="BLUETOOTH" sourceAccount="">
                <ContentItem source="BLUETOOTH" location="" sourceAccount="" isPresetable="false">
                    <itemName>Phone</itemName>
                </ContentItem>
                <track>Track</track>
                <artist>Artist</artist>
                <album>Album</album>
                <art artImageStatus="IMAGE_PRESENT">http://art/1.jpg</art>
                <playStatus>BUFFERING_STATE</playStatus>
                <connectionStatusInfo status="CONNECTED" deviceName="Phone" />
            </nowPlaying>"#,
        );
        let now_playing = NowPlaying::from_element(&element).unwrap();

        assert_eq!(now_playing.source, SourceStatus::Bluetooth);
        assert_eq!(now_playing.play_status, Some(PlayStatus::Buffering));
        assert_eq!(now_playing.artist.as_deref(), Some("Artist"));
        assert_eq!(
            now_playing.art,
            Some(Art {
                status: ArtStatus::ImagePresent,
                url: "http://art/1.jpg".to_string()
            })
        );
        assert_eq!(
            now_playing.connection_status.and_then(|c| c.device_name),
            Some("Phone".to_string())
        );
    }

    #[test]
    fn art_without_status_or_url_is_absent() {
        assert_eq!(Art::from_element(&parse("<art>http://x</art>")), None);
        assert_eq!(
            Art::from_element(&parse(r#"<art artImageStatus="SHOW_DEFAULT_IMAGE"/>"#)),
            None
        );
    }

    #[test]
    fn volume_requires_numeric_levels() {
        let volume = Volume::from_element(&parse(
            "<volume deviceID=\"X\"><targetvolume>40</targetvolume><actualvolume>32</actualvolume><muteenabled>true</muteenabled></volume>",
        ))
        .unwrap();
        assert_eq!(
            volume,
            Volume {
                target: 40,
                actual: 32,
                muted: true
            }
        );

        assert_eq!(
            Volume::from_element(&parse(
                "<volume><targetvolume>loud</targetvolume><actualvolume>3</actualvolume></volume>"
            )),
            None
        );
    }

    #[test]
    fn sources_keep_well_formed_items_only() {
        let sources = Sources::from_element(&parse(
            r#"<sourceItems deviceID="689E19B8BB8A">
                <sourceItem source="AUX" sourceAccount="AUX" status="READY" isLocal="true" multiroomallowed="true">AUX IN</sourceItem>
                <sourceItem source="BLUETOOTH" status="UNAVAILABLE" isLocal="true" />
                <sourceItem source="SPOTIFY" sourceAccount="me" status="READY" isLocal="false">me</sourceItem>
            </sourceItems>"#,
        ))
        .unwrap();

        assert_eq!(sources.items.len(), 2);
        let local: Vec<_> = sources.local().map(|s| s.source.as_str()).collect();
        assert_eq!(local, vec!["AUX"]);
        assert_eq!(sources.items[0].status, SourceAvailability::Ready);
        assert!(sources.items[0].multiroom_allowed);
    }

    #[test]
    fn sources_without_device_id_are_absent() {
        assert_eq!(Sources::from_element(&parse("<sourceItems/>")), None);
    }

    #[test]
    fn zone_decodes_members_and_encodes_back() {
        let element = parse(
            r#"<zone master="AAA"><member ipaddress="10.0.0.2">BBB</member><member ipaddress="10.0.0.3"/></zone>"#,
        );
        let zone = Zone::from_element(&element).unwrap();

        assert_eq!(zone.master, "AAA");
        assert_eq!(
            zone.members,
            vec![ZoneMember {
                device_id: "BBB".to_string(),
                ip_address: Some("10.0.0.2".to_string())
            }]
        );
        assert_eq!(
            zone.to_element().to_xml().unwrap(),
            r#"<zone master="AAA"><member ipaddress="10.0.0.2">BBB</member></zone>"#
        );
        assert_eq!(Zone::from_element(&parse("<zone/>")), None);
    }

    #[test]
    fn info_exposes_firmware_of_main_component() {
        let info = Info::from_element(&parse(
            r#"<info deviceID="689E19B8BB8A">
                <name>Kitchen</name>
                <type>SoundTouch 10</type>
                <components>
                    <component><componentCategory>SCM</componentCategory><softwareVersion>27.0.6</softwareVersion><serialNumber>I6332527703739342000020</serialNumber></component>
                    <component><componentCategory>PackagedProduct</componentCategory><serialNumber>689e19b8bb8a</serialNumber><softwareVersion>27.0.7</softwareVersion></component>
                </components>
                <networkInfo type="SCM"><macAddress>689E19B8BB8A</macAddress><ipAddress>192.168.1.20</ipAddress></networkInfo>
            </info>"#,
        ))
        .unwrap();

        assert_eq!(info.name, "Kitchen");
        assert_eq!(info.model, "SoundTouch 10");
        assert_eq!(info.firmware_version(), Some("27.0.7"));
        assert!(info.has_ip("192.168.1.20"));
        assert!(!info.has_ip("192.168.1.21"));
    }
}
