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

use std::time::Duration;

use crate::model::Qos;

/// Config for the underlying mqtt client
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Host of the mqtt broker.
    pub host: String,
    /// Port of the mqtt broker.
    ///
    /// Default value is 1883.
    pub port: u16,
    /// Client id presented to the broker.
    ///
    /// It must be unique among the clients connected to the same broker.
    pub client_id: String,
    /// Interval of the mqtt keep alive pings.
    ///
    /// Default value is 30s.
    pub keep_alive: Duration,
    /// Start with a clean session or not.
    ///
    /// It is enabled by default.
    pub clean_session: bool,
    /// Capacity of the request queue between the client and its event loop.
    ///
    /// Default value is 10.
    pub request_channel_capacity: usize,
    /// Capacity of the queue holding incoming messages not yet consumed.
    ///
    /// Default value is 64.
    pub incoming_channel_capacity: usize,
    /// Timeout for publish operation.
    ///
    /// Default value is 5s.
    pub publish_timeout: Duration,
    /// Timeout for the first connection to the broker.
    ///
    /// Default value is 3s.
    pub connect_timeout: Duration,
    /// QoS used when the publish context doesn't set one.
    ///
    /// Default value is `AtLeastOnce`.
    pub default_qos: Qos,
    /// Topic prefix home assistant listens on for discovery messages.
    ///
    /// Default value is `homeassistant`.
    pub discovery_prefix: String,
    /// Optional node id inserted between the component and the object id of
    /// the discovery topic.
    pub node_id: Option<String>,

    /// Authorization for the broker.
    pub authorization: Option<Authorization>,
}

#[derive(Debug, Clone)]
pub struct Authorization {
    pub username: String,
    pub password: String,
}

impl MqttConfig {
    pub fn new(host: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            client_id: client_id.into(),
            ..Default::default()
        }
    }
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "hass-mqtt-discovery".to_string(),
            keep_alive: Duration::from_secs(30),
            clean_session: true,
            request_channel_capacity: 10,
            incoming_channel_capacity: 64,
            publish_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(3),
            default_qos: Qos::AtLeastOnce,
            discovery_prefix: "homeassistant".to_string(),
            node_id: None,
            authorization: None,
        }
    }
}
