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

//! Building blocks shared by every entity config.

use serde::{Serialize, Serializer};

/// Information about the software publishing the discovery messages.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Origin {
    pub name: String,
    #[serde(rename = "sw", skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
    #[serde(rename = "url", skip_serializing_if = "Option::is_none")]
    pub support_url: Option<String>,
}

impl Origin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn sw_version(mut self, sw_version: impl Into<String>) -> Self {
        self.sw_version = Some(sw_version.into());
        self
    }

    pub fn support_url(mut self, support_url: impl Into<String>) -> Self {
        self.support_url = Some(support_url.into());
        self
    }
}

/// Ties the entity into the home assistant device registry.
///
/// Only takes effect when the entity has a `unique_id`. At least one of
/// `identifiers` or `connections` should be set for the device to be created.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Device {
    #[serde(rename = "ids", skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<String>,
    /// Pairs like `("mac", "02:5b:26:a8:dc:12")`.
    #[serde(rename = "cns", skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<(String, String)>,
    #[serde(rename = "cu", skip_serializing_if = "Option::is_none")]
    pub configuration_url: Option<String>,
    #[serde(rename = "mf", skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(rename = "mdl", skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "sa", skip_serializing_if = "Option::is_none")]
    pub suggested_area: Option<String>,
    #[serde(rename = "sn", skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(rename = "sw", skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
    #[serde(rename = "hw", skip_serializing_if = "Option::is_none")]
    pub hw_version: Option<String>,
    /// Identifier of a device that routes messages between this device and
    /// home assistant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_device: Option<String>,
}

impl Device {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifiers.push(identifier.into());
        self
    }

    pub fn connection(mut self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        self.connections.push((kind.into(), value.into()));
        self
    }

    pub fn configuration_url(mut self, configuration_url: impl Into<String>) -> Self {
        self.configuration_url = Some(configuration_url.into());
        self
    }

    pub fn manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn suggested_area(mut self, suggested_area: impl Into<String>) -> Self {
        self.suggested_area = Some(suggested_area.into());
        self
    }

    pub fn serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    pub fn sw_version(mut self, sw_version: impl Into<String>) -> Self {
        self.sw_version = Some(sw_version.into());
        self
    }

    pub fn hw_version(mut self, hw_version: impl Into<String>) -> Self {
        self.hw_version = Some(hw_version.into());
        self
    }

    pub fn via_device(mut self, via_device: impl Into<String>) -> Self {
        self.via_device = Some(via_device.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityCategory {
    Config,
    Diagnostic,
}

/// Mqtt quality of service, encoded as its level number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Qos {
    AtMostOnce = 0,
    #[default]
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl Qos {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

impl Serialize for Qos {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl From<Qos> for rumqttc::QoS {
    fn from(qos: Qos) -> Self {
        match qos {
            Qos::AtMostOnce => rumqttc::QoS::AtMostOnce,
            Qos::AtLeastOnce => rumqttc::QoS::AtLeastOnce,
            Qos::ExactlyOnce => rumqttc::QoS::ExactlyOnce,
        }
    }
}

impl From<rumqttc::QoS> for Qos {
    fn from(qos: rumqttc::QoS) -> Self {
        match qos {
            rumqttc::QoS::AtMostOnce => Qos::AtMostOnce,
            rumqttc::QoS::AtLeastOnce => Qos::AtLeastOnce,
            rumqttc::QoS::ExactlyOnce => Qos::ExactlyOnce,
        }
    }
}

/// How the availability checks are combined into the entity availability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityMode {
    /// Available only when every topic reports available.
    All,
    /// Available when at least one topic reports available.
    Any,
    /// The last message received on any topic wins.
    Latest,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AvailabilityCheck {
    #[serde(rename = "t")]
    pub topic: String,
    #[serde(rename = "pl_avail", skip_serializing_if = "Option::is_none")]
    pub payload_available: Option<String>,
    #[serde(rename = "pl_not_avail", skip_serializing_if = "Option::is_none")]
    pub payload_not_available: Option<String>,
    #[serde(rename = "val_tpl", skip_serializing_if = "Option::is_none")]
    pub value_template: Option<String>,
}

impl AvailabilityCheck {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Default::default()
        }
    }

    pub fn payload_available(mut self, payload: impl Into<String>) -> Self {
        self.payload_available = Some(payload.into());
        self
    }

    pub fn payload_not_available(mut self, payload: impl Into<String>) -> Self {
        self.payload_not_available = Some(payload.into());
        self
    }

    pub fn value_template(mut self, value_template: impl Into<String>) -> Self {
        self.value_template = Some(value_template.into());
        self
    }
}

/// Defines how home assistant checks the entity availability.
///
/// It is flattened into the entity config, so every key lands at the top level.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Availability {
    #[serde(rename = "avty_mode", skip_serializing_if = "Option::is_none")]
    pub availability_mode: Option<AvailabilityMode>,
    #[serde(rename = "avty", skip_serializing_if = "Vec::is_empty")]
    pub availability: Vec<AvailabilityCheck>,
    /// Seconds after which the state expires if it hasn't been updated.
    #[serde(rename = "exp_aft", skip_serializing_if = "Option::is_none")]
    pub expire_after: Option<u32>,
}

impl Availability {
    pub fn single_topic(topic: impl Into<String>) -> Self {
        Self::all(vec![AvailabilityCheck::new(topic)])
    }

    pub fn all(checks: Vec<AvailabilityCheck>) -> Self {
        Self::with_mode(AvailabilityMode::All, checks)
    }

    pub fn any(checks: Vec<AvailabilityCheck>) -> Self {
        Self::with_mode(AvailabilityMode::Any, checks)
    }

    pub fn latest(checks: Vec<AvailabilityCheck>) -> Self {
        Self::with_mode(AvailabilityMode::Latest, checks)
    }

    fn with_mode(mode: AvailabilityMode, checks: Vec<AvailabilityCheck>) -> Self {
        Self {
            availability_mode: Some(mode),
            availability: checks,
            expire_after: None,
        }
    }

    pub fn expire_after(mut self, seconds: u32) -> Self {
        self.expire_after = Some(seconds);
        self
    }

    /// Set the available payload of every check.
    pub fn payload_available(mut self, payload: impl Into<String>) -> Self {
        let payload = payload.into();
        for check in &mut self.availability {
            check.payload_available = Some(payload.clone());
        }
        self
    }

    /// Set the not available payload of every check.
    pub fn payload_not_available(mut self, payload: impl Into<String>) -> Self {
        let payload = payload.into();
        for check in &mut self.availability {
            check.payload_not_available = Some(payload.clone());
        }
        self
    }

    /// Set the value template of every check.
    pub fn value_template(mut self, value_template: impl Into<String>) -> Self {
        let value_template = value_template.into();
        for check in &mut self.availability {
            check.value_template = Some(value_template.clone());
        }
        self
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.availability.iter().map(|check| check.topic.as_str())
    }
}
