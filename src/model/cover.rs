// Copyright 2024 The hass-mqtt-discovery Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Mqtt cover entity.
//!
//! Controls blinds, roller shutters, garage doors and the like. A cover is
//! `open`, `opening`, `closed` or `closing`. When `state_topic` is set, the
//! state only changes after a matching state payload is received there.
//! Covers reporting `stopped` become `closed` if they were closing and `open`
//! otherwise, unless a `position_topic` decides it.

use serde::Serialize;

use super::common::{Availability, Device, EntityCategory, Origin, Qos};
use super::topic;
use crate::{errors::Result, Error};

const DEFAULT_PAYLOAD_OPEN: &str = "OPEN";
const DEFAULT_PAYLOAD_CLOSE: &str = "CLOSE";
const DEFAULT_PAYLOAD_STOP: &str = "STOP";
const DEFAULT_POSITION_OPEN: i32 = 100;
const DEFAULT_POSITION_CLOSED: i32 = 0;
const DEFAULT_TILT_MIN: i32 = 0;
const DEFAULT_TILT_MAX: i32 = 100;

#[derive(Clone, Debug, PartialEq, Serialize, Default)]
pub struct Cover {
    /// Replaces `~` with this value in any topic attribute.
    #[serde(rename = "~", skip_serializing_if = "Option::is_none")]
    pub topic_prefix: Option<String>,

    #[serde(rename = "o")]
    pub origin: Origin,

    #[serde(rename = "dev")]
    pub device: Device,

    #[serde(flatten)]
    pub availability: Availability,

    #[serde(rename = "ent_cat", skip_serializing_if = "Option::is_none")]
    pub entity_category: Option<EntityCategory>,

    /// Topic to publish open/close/stop commands to.
    #[serde(rename = "cmd_t", skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<String>,

    #[serde(rename = "dev_cla", skip_serializing_if = "Option::is_none")]
    pub device_class: Option<CoverDeviceClass>,

    #[serde(rename = "en", skip_serializing_if = "Option::is_none")]
    pub enabled_by_default: Option<bool>,

    #[serde(rename = "e", skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    #[serde(rename = "ic", skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(rename = "json_attr_tpl", skip_serializing_if = "Option::is_none")]
    pub json_attributes_template: Option<String>,

    #[serde(rename = "json_attr_t", skip_serializing_if = "Option::is_none")]
    pub json_attributes_topic: Option<String>,

    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "obj_id", skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,

    #[serde(rename = "opt", skip_serializing_if = "Option::is_none")]
    pub optimistic: Option<bool>,

    /// `Some(None)` is sent as `null` and disables the command.
    #[serde(rename = "pl_cls", skip_serializing_if = "Option::is_none")]
    pub payload_close: Option<Option<String>>,

    #[serde(rename = "pl_open", skip_serializing_if = "Option::is_none")]
    pub payload_open: Option<Option<String>>,

    #[serde(rename = "pl_stop", skip_serializing_if = "Option::is_none")]
    pub payload_stop: Option<Option<String>>,

    #[serde(rename = "pos_clsd", skip_serializing_if = "Option::is_none")]
    pub position_closed: Option<i32>,

    #[serde(rename = "pos_open", skip_serializing_if = "Option::is_none")]
    pub position_open: Option<i32>,

    #[serde(rename = "pos_tpl", skip_serializing_if = "Option::is_none")]
    pub position_template: Option<String>,

    #[serde(rename = "pos_t", skip_serializing_if = "Option::is_none")]
    pub position_topic: Option<String>,

    #[serde(rename = "qos", skip_serializing_if = "Option::is_none")]
    pub qos: Option<Qos>,

    #[serde(rename = "ret", skip_serializing_if = "Option::is_none")]
    pub retain: Option<bool>,

    #[serde(rename = "set_pos_tpl", skip_serializing_if = "Option::is_none")]
    pub set_position_template: Option<String>,

    /// Requires `position_topic` as well.
    #[serde(rename = "set_pos_t", skip_serializing_if = "Option::is_none")]
    pub set_position_topic: Option<String>,

    #[serde(rename = "stat_clsd", skip_serializing_if = "Option::is_none")]
    pub state_closed: Option<String>,

    #[serde(rename = "stat_closing", skip_serializing_if = "Option::is_none")]
    pub state_closing: Option<String>,

    #[serde(rename = "stat_open", skip_serializing_if = "Option::is_none")]
    pub state_open: Option<String>,

    #[serde(rename = "stat_opening", skip_serializing_if = "Option::is_none")]
    pub state_opening: Option<String>,

    #[serde(rename = "stat_stopped", skip_serializing_if = "Option::is_none")]
    pub state_stopped: Option<String>,

    #[serde(rename = "stat_t", skip_serializing_if = "Option::is_none")]
    pub state_topic: Option<String>,

    #[serde(rename = "tilt_clsd_val", skip_serializing_if = "Option::is_none")]
    pub tilt_closed_value: Option<i32>,

    #[serde(rename = "tilt_cmd_tpl", skip_serializing_if = "Option::is_none")]
    pub tilt_command_template: Option<String>,

    #[serde(rename = "tilt_cmd_t", skip_serializing_if = "Option::is_none")]
    pub tilt_command_topic: Option<String>,

    #[serde(rename = "tilt_max", skip_serializing_if = "Option::is_none")]
    pub tilt_max: Option<i32>,

    #[serde(rename = "tilt_min", skip_serializing_if = "Option::is_none")]
    pub tilt_min: Option<i32>,

    #[serde(rename = "tilt_opnd_val", skip_serializing_if = "Option::is_none")]
    pub tilt_opened_value: Option<i32>,

    #[serde(rename = "tilt_opt", skip_serializing_if = "Option::is_none")]
    pub tilt_optimistic: Option<bool>,

    #[serde(rename = "tilt_status_tpl", skip_serializing_if = "Option::is_none")]
    pub tilt_status_template: Option<String>,

    #[serde(rename = "tilt_status_t", skip_serializing_if = "Option::is_none")]
    pub tilt_status_topic: Option<String>,

    #[serde(rename = "uniq_id", skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    #[serde(rename = "val_tpl", skip_serializing_if = "Option::is_none")]
    pub value_template: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverDeviceClass {
    Awning,
    Blind,
    Curtain,
    Damper,
    Door,
    Garage,
    Gate,
    Shade,
    Shutter,
    Window,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoverState {
    Open,
    Opening,
    Closed,
    Closing,
    Stopped,
}

/// Command received on one of the command topics of a cover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoverCommand {
    Open,
    Close,
    Stop,
    SetPosition(i32),
    SetTilt(i32),
}

impl Cover {
    pub fn topic_prefix<S: Into<String>>(mut self, topic_prefix: S) -> Self {
        self.topic_prefix = Some(topic_prefix.into());
        self
    }

    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn entity_category(mut self, entity_category: EntityCategory) -> Self {
        self.entity_category = Some(entity_category);
        self
    }

    pub fn availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn command_topic<T: Into<String>>(mut self, command_topic: T) -> Self {
        self.command_topic = Some(command_topic.into());
        self
    }

    pub fn device_class(mut self, device_class: CoverDeviceClass) -> Self {
        self.device_class = Some(device_class);
        self
    }

    pub fn enabled_by_default(mut self, enabled_by_default: bool) -> Self {
        self.enabled_by_default = Some(enabled_by_default);
        self
    }

    pub fn encoding<T: Into<String>>(mut self, encoding: T) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn icon<T: Into<String>>(mut self, icon: T) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn json_attributes_template<T: Into<String>>(
        mut self,
        json_attributes_template: T,
    ) -> Self {
        self.json_attributes_template = Some(json_attributes_template.into());
        self
    }

    pub fn json_attributes_topic<T: Into<String>>(mut self, json_attributes_topic: T) -> Self {
        self.json_attributes_topic = Some(json_attributes_topic.into());
        self
    }

    pub fn name<T: Into<String>>(mut self, name: T) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn object_id<T: Into<String>>(mut self, object_id: T) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    pub fn optimistic(mut self, optimistic: bool) -> Self {
        self.optimistic = Some(optimistic);
        self
    }

    pub fn payload_close<T: Into<String>>(mut self, payload_close: T) -> Self {
        self.payload_close = Some(Some(payload_close.into()));
        self
    }

    pub fn payload_open<T: Into<String>>(mut self, payload_open: T) -> Self {
        self.payload_open = Some(Some(payload_open.into()));
        self
    }

    pub fn payload_stop<T: Into<String>>(mut self, payload_stop: T) -> Self {
        self.payload_stop = Some(Some(payload_stop.into()));
        self
    }

    /// Publish `null` for the close payload, home assistant then hides the
    /// close action.
    pub fn disable_close(mut self) -> Self {
        self.payload_close = Some(None);
        self
    }

    pub fn disable_open(mut self) -> Self {
        self.payload_open = Some(None);
        self
    }

    pub fn disable_stop(mut self) -> Self {
        self.payload_stop = Some(None);
        self
    }

    pub fn position_closed(mut self, position_closed: i32) -> Self {
        self.position_closed = Some(position_closed);
        self
    }

    pub fn position_open(mut self, position_open: i32) -> Self {
        self.position_open = Some(position_open);
        self
    }

    pub fn position_template<T: Into<String>>(mut self, position_template: T) -> Self {
        self.position_template = Some(position_template.into());
        self
    }

    pub fn position_topic<T: Into<String>>(mut self, position_topic: T) -> Self {
        self.position_topic = Some(position_topic.into());
        self
    }

    pub fn qos(mut self, qos: Qos) -> Self {
        self.qos = Some(qos);
        self
    }

    pub fn retain(mut self, retain: bool) -> Self {
        self.retain = Some(retain);
        self
    }

    pub fn set_position_template<T: Into<String>>(mut self, set_position_template: T) -> Self {
        self.set_position_template = Some(set_position_template.into());
        self
    }

    pub fn set_position_topic<T: Into<String>>(mut self, set_position_topic: T) -> Self {
        self.set_position_topic = Some(set_position_topic.into());
        self
    }

    pub fn state_closed<T: Into<String>>(mut self, state_closed: T) -> Self {
        self.state_closed = Some(state_closed.into());
        self
    }

    pub fn state_closing<T: Into<String>>(mut self, state_closing: T) -> Self {
        self.state_closing = Some(state_closing.into());
        self
    }

    pub fn state_open<T: Into<String>>(mut self, state_open: T) -> Self {
        self.state_open = Some(state_open.into());
        self
    }

    pub fn state_opening<T: Into<String>>(mut self, state_opening: T) -> Self {
        self.state_opening = Some(state_opening.into());
        self
    }

    pub fn state_stopped<T: Into<String>>(mut self, state_stopped: T) -> Self {
        self.state_stopped = Some(state_stopped.into());
        self
    }

    pub fn state_topic<T: Into<String>>(mut self, state_topic: T) -> Self {
        self.state_topic = Some(state_topic.into());
        self
    }

    pub fn tilt_closed_value(mut self, tilt_closed_value: i32) -> Self {
        self.tilt_closed_value = Some(tilt_closed_value);
        self
    }

    pub fn tilt_command_template<T: Into<String>>(mut self, tilt_command_template: T) -> Self {
        self.tilt_command_template = Some(tilt_command_template.into());
        self
    }

    pub fn tilt_command_topic<T: Into<String>>(mut self, tilt_command_topic: T) -> Self {
        self.tilt_command_topic = Some(tilt_command_topic.into());
        self
    }

    pub fn tilt_max(mut self, tilt_max: i32) -> Self {
        self.tilt_max = Some(tilt_max);
        self
    }

    pub fn tilt_min(mut self, tilt_min: i32) -> Self {
        self.tilt_min = Some(tilt_min);
        self
    }

    pub fn tilt_opened_value(mut self, tilt_opened_value: i32) -> Self {
        self.tilt_opened_value = Some(tilt_opened_value);
        self
    }

    pub fn tilt_optimistic(mut self, tilt_optimistic: bool) -> Self {
        self.tilt_optimistic = Some(tilt_optimistic);
        self
    }

    pub fn tilt_status_template<T: Into<String>>(mut self, tilt_status_template: T) -> Self {
        self.tilt_status_template = Some(tilt_status_template.into());
        self
    }

    pub fn tilt_status_topic<T: Into<String>>(mut self, tilt_status_topic: T) -> Self {
        self.tilt_status_topic = Some(tilt_status_topic.into());
        self
    }

    pub fn unique_id<T: Into<String>>(mut self, unique_id: T) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    pub fn value_template<T: Into<String>>(mut self, value_template: T) -> Self {
        self.value_template = Some(value_template.into());
        self
    }

    fn full_topic(&self, raw: Option<&str>) -> Option<String> {
        raw.map(|t| topic::expand(t, self.topic_prefix.as_deref()))
    }

    pub fn full_command_topic(&self) -> Option<String> {
        self.full_topic(self.command_topic.as_deref())
    }

    pub fn full_set_position_topic(&self) -> Option<String> {
        self.full_topic(self.set_position_topic.as_deref())
    }

    pub fn full_tilt_command_topic(&self) -> Option<String> {
        self.full_topic(self.tilt_command_topic.as_deref())
    }

    pub fn full_state_topic(&self) -> Option<String> {
        self.full_topic(self.state_topic.as_deref())
    }

    pub fn full_position_topic(&self) -> Option<String> {
        self.full_topic(self.position_topic.as_deref())
    }

    pub fn full_tilt_status_topic(&self) -> Option<String> {
        self.full_topic(self.tilt_status_topic.as_deref())
    }

    pub fn validate(&self) -> Result<()> {
        let command_topics = [
            self.full_command_topic(),
            self.full_set_position_topic(),
            self.full_tilt_command_topic(),
        ];
        for topic in command_topics.iter().flatten() {
            topic::validate_publish_topic(topic)?;
        }

        let status_topics = [
            self.full_state_topic(),
            self.full_position_topic(),
            self.full_tilt_status_topic(),
        ];
        for topic in status_topics.iter().flatten() {
            topic::validate_filter(topic)?;
        }

        if self.set_position_topic.is_some() && self.position_topic.is_none() {
            return Err(Error::InvalidEntity(
                "set position topic requires position topic".to_string(),
            ));
        }

        let (tilt_min, tilt_max) = self.tilt_range();
        if tilt_min > tilt_max {
            return Err(Error::InvalidEntity(format!(
                "tilt min should not be greater than tilt max, min:{tilt_min}, max:{tilt_max}"
            )));
        }

        Ok(())
    }

    /// `(tilt_min, tilt_max)` after applying home assistant defaults.
    pub fn tilt_range(&self) -> (i32, i32) {
        (
            self.tilt_min.unwrap_or(DEFAULT_TILT_MIN),
            self.tilt_max.unwrap_or(DEFAULT_TILT_MAX),
        )
    }

    /// `(lower, upper)` position bound, `position_open` may be the lower one.
    pub fn position_range(&self) -> (i32, i32) {
        let open = self.position_open.unwrap_or(DEFAULT_POSITION_OPEN);
        let closed = self.position_closed.unwrap_or(DEFAULT_POSITION_CLOSED);
        (open.min(closed), open.max(closed))
    }

    /// Parse a payload received on `command_topic`.
    pub fn parse_command(&self, payload: &[u8]) -> Result<CoverCommand> {
        let payload = payload_str(payload)?;

        let candidates = [
            (&self.payload_open, DEFAULT_PAYLOAD_OPEN, CoverCommand::Open),
            (&self.payload_close, DEFAULT_PAYLOAD_CLOSE, CoverCommand::Close),
            (&self.payload_stop, DEFAULT_PAYLOAD_STOP, CoverCommand::Stop),
        ];
        for (configured, default, command) in candidates {
            let expected = match configured {
                None => Some(default),
                Some(value) => value.as_deref(),
            };
            if expected == Some(payload) {
                return Ok(command);
            }
        }

        Err(Error::InvalidPayload(format!(
            "unknown cover command:{payload}"
        )))
    }

    /// Parse a payload received on `set_position_topic`.
    pub fn parse_position(&self, payload: &[u8]) -> Result<CoverCommand> {
        let (lower, upper) = self.position_range();
        parse_bounded(payload, lower, upper).map(CoverCommand::SetPosition)
    }

    /// Parse a payload received on `tilt_command_topic`.
    pub fn parse_tilt(&self, payload: &[u8]) -> Result<CoverCommand> {
        let (lower, upper) = self.tilt_range();
        parse_bounded(payload, lower, upper).map(CoverCommand::SetTilt)
    }

    /// Payload reporting `state` on the state topic.
    pub fn state_payload(&self, state: CoverState) -> String {
        let (configured, default) = match state {
            CoverState::Open => (&self.state_open, "open"),
            CoverState::Opening => (&self.state_opening, "opening"),
            CoverState::Closed => (&self.state_closed, "closed"),
            CoverState::Closing => (&self.state_closing, "closing"),
            CoverState::Stopped => (&self.state_stopped, "stopped"),
        };
        configured.clone().unwrap_or_else(|| default.to_string())
    }
}

fn payload_str(payload: &[u8]) -> Result<&str> {
    std::str::from_utf8(payload)
        .map_err(|e| Error::InvalidPayload(format!("payload is not utf8, err:{e}")))
}

fn parse_bounded(payload: &[u8], lower: i32, upper: i32) -> Result<i32> {
    let payload = payload_str(payload)?;
    let value: i32 = payload.trim().parse().map_err(|e| {
        Error::InvalidPayload(format!("payload is not an integer:{payload}, err:{e}"))
    })?;

    if value < lower || value > upper {
        return Err(Error::InvalidPayload(format!(
            "value out of range [{lower}, {upper}], value:{value}"
        )));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn garage_door() -> Cover {
        Cover::default()
            .topic_prefix("home/garage")
            .origin(Origin::new("bridge").sw_version("1.2.0"))
            .device(Device::default().name("Garage").identifier("garage-01"))
            .availability(Availability::single_topic("~/online"))
            .unique_id("garage_door")
            .name("Door")
            .device_class(CoverDeviceClass::Garage)
            .command_topic("~/set")
            .state_topic("~/state")
            .position_topic("~/position")
            .set_position_topic("~/position/set")
            .qos(Qos::AtLeastOnce)
            .retain(false)
    }

    #[test]
    fn test_serialize_cover() {
        let cover = garage_door()
            .payload_open("UP")
            .disable_stop()
            .state_stopped("idle")
            .tilt_min(-90)
            .tilt_max(90);

        assert_eq!(
            json!({
                "~": "home/garage",
                "o": {"name": "bridge", "sw": "1.2.0"},
                "dev": {"ids": ["garage-01"], "name": "Garage"},
                "avty_mode": "all",
                "avty": [{"t": "~/online"}],
                "uniq_id": "garage_door",
                "name": "Door",
                "dev_cla": "garage",
                "cmd_t": "~/set",
                "stat_t": "~/state",
                "pos_t": "~/position",
                "set_pos_t": "~/position/set",
                "qos": 1,
                "ret": false,
                "pl_open": "UP",
                "pl_stop": null,
                "stat_stopped": "idle",
                "tilt_min": -90,
                "tilt_max": 90
            }),
            serde_json::to_value(&cover).unwrap()
        );
    }

    #[test]
    fn test_validate() {
        assert!(garage_door().validate().is_ok());
        assert!(Cover::default().validate().is_ok());

        let mut missing_position = garage_door();
        missing_position.position_topic = None;
        assert!(missing_position.validate().is_err());

        assert!(garage_door().tilt_min(50).tilt_max(10).validate().is_err());
        assert!(garage_door().command_topic("~/#").validate().is_err());
        assert!(garage_door().state_topic("~/+/state").validate().is_ok());
    }

    #[test]
    fn test_parse_command() {
        let cover = garage_door().payload_open("UP").disable_stop();

        assert_eq!(CoverCommand::Open, cover.parse_command(b"UP").unwrap());
        assert_eq!(CoverCommand::Close, cover.parse_command(b"CLOSE").unwrap());
        assert!(cover.parse_command(b"OPEN").is_err());
        assert!(cover.parse_command(b"STOP").is_err());
        assert!(cover.parse_command(b"close").is_err());
        assert!(cover.parse_command(b"CLOSE ").is_err());
    }

    #[test]
    fn test_parse_position_and_tilt() {
        let cover = garage_door();
        assert_eq!(
            CoverCommand::SetPosition(42),
            cover.parse_position(b"42").unwrap()
        );
        assert!(cover.parse_position(b"101").is_err());
        assert!(cover.parse_position(b"half").is_err());

        let inverted = garage_door().position_open(0).position_closed(255);
        assert_eq!((0, 255), inverted.position_range());
        assert_eq!(
            CoverCommand::SetPosition(200),
            inverted.parse_position(b"200").unwrap()
        );

        let tilted = garage_door().tilt_min(-90).tilt_max(90);
        assert_eq!(CoverCommand::SetTilt(-45), tilted.parse_tilt(b"-45").unwrap());
        assert!(tilted.parse_tilt(b"91").is_err());
    }

    #[test]
    fn test_state_payload() {
        let cover = garage_door().state_closed("shut");
        assert_eq!("open", cover.state_payload(CoverState::Open));
        assert_eq!("shut", cover.state_payload(CoverState::Closed));
        assert_eq!("stopped", cover.state_payload(CoverState::Stopped));
    }

    #[test]
    fn test_full_topics() {
        let cover = garage_door();
        assert_eq!(
            Some("home/garage/set".to_string()),
            cover.full_command_topic()
        );
        assert_eq!(
            Some("home/garage/position/set".to_string()),
            cover.full_set_position_topic()
        );
        assert_eq!(None, cover.full_tilt_command_topic());
    }
}
