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

//! Mqtt number entity.
//!
//! A number lets home assistant set a value within a range. Home assistant
//! publishes the new value to `command_topic`, the device reports the value it
//! actually applied on `state_topic`.

use serde::Serialize;

use super::{
    common::{Availability, Device, EntityCategory, Origin, Qos},
    topic,
    units::Unit,
};
use crate::{errors::Result, util::format_number, Error};

const DEFAULT_MIN: f64 = 1.0;
const DEFAULT_MAX: f64 = 100.0;
const DEFAULT_STEP: f64 = 1.0;
const SMALLEST_STEP: f64 = 0.001;

#[derive(Clone, Debug, PartialEq, Serialize, Default)]
pub struct Number {
    /// Replaces `~` with this value in any topic attribute.
    #[serde(rename = "~", skip_serializing_if = "Option::is_none")]
    pub topic_prefix: Option<String>,
    #[serde(rename = "o")]
    pub origin: Origin,
    #[serde(rename = "dev")]
    pub device: Device,
    #[serde(rename = "ent_cat", skip_serializing_if = "Option::is_none")]
    pub entity_category: Option<EntityCategory>,
    /// Icon like `mdi:volume-high`.
    #[serde(rename = "ic", skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(rename = "json_attr_t", skip_serializing_if = "Option::is_none")]
    pub json_attributes_topic: Option<String>,
    #[serde(rename = "json_attr_tpl", skip_serializing_if = "Option::is_none")]
    pub json_attributes_template: Option<String>,
    /// Used instead of `name` to generate the `entity_id`, and as the object id
    /// of the discovery topic.
    #[serde(rename = "obj_id", skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Home assistant raises an exception when two entities share it.
    #[serde(rename = "uniq_id", skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    #[serde(flatten)]
    pub availability: Availability,
    #[serde(rename = "en", skip_serializing_if = "Option::is_none")]
    pub enabled_by_default: Option<bool>,
    /// Set to `""` to disable decoding of incoming payloads.
    #[serde(rename = "e", skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// An empty payload on this topic is ignored, `null` sets the state to
    /// unknown.
    #[serde(rename = "stat_t", skip_serializing_if = "Option::is_none")]
    pub state_topic: Option<String>,
    #[serde(rename = "val_tpl", skip_serializing_if = "Option::is_none")]
    pub value_template: Option<String>,
    /// The topic home assistant publishes new values to.
    ///
    /// Subscribers must use the exact same string, a trailing `/` makes it a
    /// different topic.
    #[serde(rename = "cmd_t")]
    pub command_topic: String,
    #[serde(rename = "cmd_tpl", skip_serializing_if = "Option::is_none")]
    pub command_template: Option<String>,
    /// Defaults to `true` when no `state_topic` is set.
    #[serde(rename = "opt", skip_serializing_if = "Option::is_none")]
    pub optimistic: Option<bool>,
    #[serde(rename = "ret", skip_serializing_if = "Option::is_none")]
    pub retain: Option<bool>,
    #[serde(rename = "qos", skip_serializing_if = "Option::is_none")]
    pub qos: Option<Qos>,
    #[serde(rename = "dev_cla", skip_serializing_if = "Option::is_none")]
    pub device_class: Option<NumberDeviceClass>,
    /// Can be `None` if only the device name is relevant.
    #[serde(rename = "name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Default: 1
    #[serde(rename = "min", skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Default: 100
    #[serde(rename = "max", skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(rename = "mode", skip_serializing_if = "Option::is_none")]
    pub mode: Option<DisplayMode>,
    /// Payload on `state_topic` resetting the state to unknown.
    #[serde(rename = "pl_rst", skip_serializing_if = "Option::is_none")]
    pub payload_reset: Option<String>,
    /// Default: 1, smallest: 0.001
    #[serde(rename = "step", skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(rename = "unit_of_meas", skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<Unit>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Auto,
    Box,
    Slider,
}

/// Command received on the `command_topic` of a number.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NumberCommand {
    Set(f64),
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberDeviceClass {
    /// Apparent power in VA.
    ApparentPower,
    /// Air Quality Index (unitless).
    Aqi,
    /// Atmospheric pressure in cbar, bar, hPa, inHg, kPa, mbar, Pa or psi.
    AtmosphericPressure,
    /// Percentage of battery that is left.
    Battery,
    /// Carbon Dioxide in CO2 (Smoke).
    CarbonDioxide,
    /// Carbon Monoxide in CO (Gas CNG/LPG).
    CarbonMonoxide,
    /// Current in A or mA.
    Current,
    DataRate,
    DataSize,
    Distance,
    Duration,
    Energy,
    EnergyStorage,
    Frequency,
    Gas,
    Humidity,
    Illuminance,
    Irradiance,
    Moisture,
    Monetary,
    NitrogenDioxide,
    NitrogenMonoxide,
    NitrousOxide,
    Ozone,
    Ph,
    Pm1,
    Pm10,
    Pm25,
    PowerFactor,
    Power,
    Precipitation,
    PrecipitationIntensity,
    Pressure,
    ReactivePower,
    SignalStrength,
    SoundPressure,
    Speed,
    SulphurDioxide,
    Temperature,
    VolatileOrganicCompounds,
    Voltage,
    Volume,
    VolumeStorage,
    Water,
    Weight,
    WindSpeed,
}

impl Number {
    pub fn new(command_topic: impl Into<String>) -> Self {
        Self {
            command_topic: command_topic.into(),
            ..Default::default()
        }
    }

    pub fn topic_prefix(mut self, topic_prefix: impl Into<String>) -> Self {
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

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn json_attributes_topic(mut self, json_attributes_topic: impl Into<String>) -> Self {
        self.json_attributes_topic = Some(json_attributes_topic.into());
        self
    }

    pub fn json_attributes_template(mut self, json_attributes_template: impl Into<String>) -> Self {
        self.json_attributes_template = Some(json_attributes_template.into());
        self
    }

    pub fn object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    pub fn unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    pub fn availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn enabled_by_default(mut self, enabled_by_default: bool) -> Self {
        self.enabled_by_default = Some(enabled_by_default);
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn state_topic(mut self, state_topic: impl Into<String>) -> Self {
        self.state_topic = Some(state_topic.into());
        self
    }

    pub fn value_template(mut self, value_template: impl Into<String>) -> Self {
        self.value_template = Some(value_template.into());
        self
    }

    pub fn command_topic(mut self, command_topic: impl Into<String>) -> Self {
        self.command_topic = command_topic.into();
        self
    }

    pub fn command_template(mut self, command_template: impl Into<String>) -> Self {
        self.command_template = Some(command_template.into());
        self
    }

    pub fn optimistic(mut self, optimistic: bool) -> Self {
        self.optimistic = Some(optimistic);
        self
    }

    pub fn retain(mut self, retain: bool) -> Self {
        self.retain = Some(retain);
        self
    }

    pub fn qos(mut self, qos: Qos) -> Self {
        self.qos = Some(qos);
        self
    }

    pub fn device_class(mut self, device_class: NumberDeviceClass) -> Self {
        self.device_class = Some(device_class);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn mode(mut self, mode: DisplayMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn payload_reset(mut self, payload_reset: impl Into<String>) -> Self {
        self.payload_reset = Some(payload_reset.into());
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn unit_of_measurement(mut self, unit: impl Into<Unit>) -> Self {
        self.unit_of_measurement = Some(unit.into());
        self
    }

    /// Effective `(min, max, step)` after applying home assistant defaults.
    pub fn range(&self) -> (f64, f64, f64) {
        (
            self.min.unwrap_or(DEFAULT_MIN),
            self.max.unwrap_or(DEFAULT_MAX),
            self.step.unwrap_or(DEFAULT_STEP),
        )
    }

    /// `command_topic` with `~` expanded.
    pub fn full_command_topic(&self) -> String {
        topic::expand(&self.command_topic, self.topic_prefix.as_deref())
    }

    /// `state_topic` with `~` expanded.
    pub fn full_state_topic(&self) -> Option<String> {
        self.state_topic
            .as_deref()
            .map(|t| topic::expand(t, self.topic_prefix.as_deref()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.command_topic.is_empty() {
            return Err(Error::InvalidEntity(
                "command topic of number must be set".to_string(),
            ));
        }
        topic::validate_publish_topic(&self.full_command_topic())?;
        if let Some(state_topic) = self.full_state_topic() {
            topic::validate_filter(&state_topic)?;
        }

        let (min, max, step) = self.range();
        for (name, value) in [("min", min), ("max", max), ("step", step)] {
            if !value.is_finite() {
                return Err(Error::InvalidEntity(format!(
                    "{name} should be a finite number, {name}:{value}"
                )));
            }
        }
        if min > max {
            return Err(Error::InvalidEntity(format!(
                "min should not be greater than max, min:{min}, max:{max}"
            )));
        }
        if step < SMALLEST_STEP {
            return Err(Error::InvalidEntity(format!(
                "step should be at least {SMALLEST_STEP}, step:{step}"
            )));
        }

        Ok(())
    }

    /// Parse a payload received on the command topic.
    pub fn parse_command(&self, payload: &[u8]) -> Result<NumberCommand> {
        let payload = std::str::from_utf8(payload)
            .map_err(|e| Error::InvalidPayload(format!("payload is not utf8, err:{e}")))?;

        if self.payload_reset.as_deref() == Some(payload) {
            return Ok(NumberCommand::Reset);
        }

        let value: f64 = payload.trim().parse().map_err(|e| {
            Error::InvalidPayload(format!("payload is not a number:{payload}, err:{e}"))
        })?;
        if !value.is_finite() {
            return Err(Error::InvalidPayload(format!(
                "payload is not a finite number:{payload}"
            )));
        }

        let (min, max, _) = self.range();
        if value < min || value > max {
            return Err(Error::InvalidPayload(format!(
                "value out of range [{min}, {max}], value:{value}"
            )));
        }

        Ok(NumberCommand::Set(value))
    }

    /// Payload reporting `value` on the state topic.
    pub fn state_payload(&self, value: f64) -> String {
        format_number(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::units::{PercentageUnit, Unit};

    #[test]
    fn test_serialize_number() {
        let number = Number {
            topic_prefix: Some("topic/prefix".to_string()),
            origin: Origin::new("application name"),
            device: Device::default().name("device name"),
            entity_category: None,
            icon: None,
            json_attributes_topic: None,
            json_attributes_template: None,
            object_id: Some("object-id".to_string()),
            unique_id: Some("unique-id".to_string()),
            availability: Availability::single_topic("~/availability").expire_after(60),
            enabled_by_default: Some(true),
            encoding: None,
            state_topic: Some("~/state".to_string()),
            value_template: Some("{{ value }}".to_string()),
            command_topic: "~/command".to_string(),
            command_template: Some("{{ command_value }}".to_string()),
            optimistic: Some(false),
            retain: Some(true),
            qos: None,
            device_class: Some(NumberDeviceClass::Battery),
            name: Some("number name".to_string()),
            min: Some(1.0),
            max: Some(100.0),
            mode: Some(DisplayMode::Slider),
            payload_reset: Some("NaN".to_string()),
            step: Some(0.02),
            unit_of_measurement: Some(Unit::Percentage(PercentageUnit::Percentage)),
        };

        assert_eq!(
            json!({
                "~": "topic/prefix",
                "o": {"name": "application name"},
                "dev": {"name": "device name"},
                "obj_id": "object-id",
                "uniq_id": "unique-id",
                "avty_mode": "all",
                "avty": [{"t": "~/availability"}],
                "exp_aft": 60,
                "en": true,
                "stat_t": "~/state",
                "val_tpl": "{{ value }}",
                "cmd_t": "~/command",
                "cmd_tpl": "{{ command_value }}",
                "opt": false,
                "ret": true,
                "dev_cla": "battery",
                "name": "number name",
                "mode": "slider",
                "min": 1.0,
                "max": 100.0,
                "step": 0.02,
                "pl_rst": "NaN",
                "unit_of_meas": "%"
            }),
            serde_json::to_value(&number).unwrap()
        );
    }

    #[test]
    fn test_minimal_number_only_has_required_keys() {
        let number = Number::new("volume/set").origin(Origin::new("app"));
        assert_eq!(
            json!({"o": {"name": "app"}, "dev": {}, "cmd_t": "volume/set"}),
            serde_json::to_value(&number).unwrap()
        );
    }

    #[test]
    fn test_validate() {
        assert!(Number::new("volume/set").validate().is_ok());
        assert!(Number::new("").validate().is_err());
        assert!(Number::new("volume/+").validate().is_err());
        assert!(Number::new("volume/set").min(10.0).max(5.0).validate().is_err());
        assert!(Number::new("volume/set").step(0.0001).validate().is_err());
        assert!(Number::new("volume/set").step(0.001).validate().is_ok());
    }

    #[test]
    fn test_validate_non_finite_range() {
        let cases = vec![
            Number::new("a/set").min(f64::NAN),
            Number::new("a/set").max(f64::NAN),
            Number::new("a/set").step(f64::NAN),
            Number::new("a/set").min(f64::NEG_INFINITY),
            Number::new("a/set").max(f64::INFINITY),
            Number::new("a/set").step(f64::INFINITY),
        ];

        for number in cases {
            assert!(
                matches!(number.validate(), Err(Error::InvalidEntity(_))),
                "{number:?}"
            );
        }
    }

    #[test]
    fn test_parse_command() {
        let number = Number::new("~/set")
            .topic_prefix("amp")
            .min(0.0)
            .max(10.0)
            .step(0.5)
            .payload_reset("None");

        assert_eq!(NumberCommand::Set(2.5), number.parse_command(b"2.5").unwrap());
        assert_eq!(NumberCommand::Set(10.0), number.parse_command(b" 10\n").unwrap());
        assert_eq!(NumberCommand::Reset, number.parse_command(b"None").unwrap());
        assert!(number.parse_command(b"10.5").is_err());
        assert!(number.parse_command(b"-1").is_err());
        assert!(number.parse_command(b"loud").is_err());
        assert!(number.parse_command(b"NaN").is_err());
        assert!(number.parse_command(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_default_range() {
        let number = Number::new("volume/set");
        assert_eq!((1.0, 100.0, 1.0), number.range());
        assert!(number.parse_command(b"0").is_err());
        assert_eq!(NumberCommand::Set(100.0), number.parse_command(b"100").unwrap());
    }

    #[test]
    fn test_topics_and_state() {
        let number = Number::new("~/set").topic_prefix("amp").state_topic("~/state");
        assert_eq!("amp/set", number.full_command_topic());
        assert_eq!(Some("amp/state".to_string()), number.full_state_topic());
        assert_eq!("42", number.state_payload(42.0));
        assert_eq!("0.25", number.state_payload(0.25));
    }
}
