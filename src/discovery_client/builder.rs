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

use std::sync::Arc;

use super::{DiscoveryClient, DiscoveryClientImpl};
use crate::{
    config::MqttConfig,
    mqtt_client::{MqttClientFactory, RumqttcClientFactory},
};

/// Discovery client builder.
///
/// The broker connection is made by the first operation needing it, not by
/// [`build`].
///
/// [`build`]: Builder::build
pub struct Builder<F: MqttClientFactory = RumqttcClientFactory> {
    config: MqttConfig,
    factory: Arc<F>,
}

impl Builder<RumqttcClientFactory> {
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            factory: Arc::new(RumqttcClientFactory),
        }
    }
}

impl<F: MqttClientFactory + 'static> Builder<F> {
    #[inline]
    pub fn config(mut self, config: MqttConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the transport, mostly for testing.
    #[inline]
    pub fn factory<G: MqttClientFactory>(self, factory: Arc<G>) -> Builder<G> {
        Builder {
            config: self.config,
            factory,
        }
    }

    pub fn build(self) -> Arc<dyn DiscoveryClient> {
        Arc::new(DiscoveryClientImpl::new(self.factory, self.config))
    }
}
