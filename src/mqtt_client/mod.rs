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

mod mock_mqtt_client;
mod mqtt_client_impl;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
pub use mock_mqtt_client::{MockMqttClient, MockMqttClientFactory};
pub use mqtt_client_impl::{RumqttcClient, RumqttcClientFactory};

use crate::{config::MqttConfig, errors::Result, model::Qos};

/// Context for publish request.
///
/// Anything left unset falls back to the client config or to what the
/// operation usually does (discovery configs are retained, states are not).
#[derive(Clone, Debug, Default)]
pub struct PublishContext {
    pub qos: Option<Qos>,
    pub retain: Option<bool>,
    pub timeout: Option<Duration>,
}

impl PublishContext {
    pub fn qos(mut self, qos: Qos) -> Self {
        self.qos = Some(qos);
        self
    }

    pub fn retain(mut self, retain: bool) -> Self {
        self.retain = Some(retain);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// One mqtt application message, outgoing or incoming.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: Qos,
    pub retain: bool,
}

#[async_trait]
pub trait MqttClient: Send + Sync {
    async fn publish(&self, ctx: &PublishContext, msg: Message) -> Result<()>;
    async fn subscribe(&self, filter: &str, qos: Qos) -> Result<()>;
    async fn unsubscribe(&self, filter: &str) -> Result<()>;
    /// Next message received on a subscribed topic.
    ///
    /// Returns `None` once the connection is shut down for good.
    async fn recv(&self) -> Option<Message>;
}

#[async_trait]
pub trait MqttClientFactory: Send + Sync {
    /// Build `MqttClient`.
    ///
    /// It may fail because the broker is unreachable. Any caller calls this
    /// method should handle the potential error.
    async fn build(&self, config: &MqttConfig) -> Result<Arc<dyn MqttClient>>;
}
