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

//! Inner client

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::{
    config::MqttConfig,
    errors::Result,
    model::{topic, Qos},
    mqtt_client::{Message, MqttClient, MqttClientFactory, PublishContext},
};

/// Lazily connected transport shared by every operation of the client.
pub(crate) struct InnerClient<F: MqttClientFactory> {
    factory: Arc<F>,
    config: MqttConfig,
    inner_client: OnceCell<Arc<dyn MqttClient>>,
}

impl<F: MqttClientFactory> InnerClient<F> {
    pub fn new(factory: Arc<F>, config: MqttConfig) -> Self {
        InnerClient {
            factory,
            config,
            inner_client: OnceCell::new(),
        }
    }

    #[inline]
    async fn init(&self) -> Result<Arc<dyn MqttClient>> {
        debug!(host = %self.config.host, "building mqtt client");
        self.factory.build(&self.config).await
    }

    #[inline]
    async fn client(&self) -> Result<&Arc<dyn MqttClient>> {
        self.inner_client.get_or_try_init(|| self.init()).await
    }

    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    pub fn qos(&self, ctx: &PublishContext) -> Qos {
        ctx.qos.unwrap_or(self.config.default_qos)
    }

    pub async fn publish(
        &self,
        ctx: &PublishContext,
        topic: String,
        payload: Vec<u8>,
        default_retain: bool,
    ) -> Result<()> {
        topic::validate_publish_topic(&topic)?;

        let msg = Message {
            topic,
            payload,
            qos: self.qos(ctx),
            retain: ctx.retain.unwrap_or(default_retain),
        };
        self.client().await?.publish(ctx, msg).await
    }

    pub async fn subscribe(&self, filter: &str, qos: Qos) -> Result<()> {
        topic::validate_filter(filter)?;
        self.client().await?.subscribe(filter, qos).await
    }

    pub async fn unsubscribe(&self, filter: &str) -> Result<()> {
        self.client().await?.unsubscribe(filter).await
    }

    pub async fn recv(&self) -> Option<Message> {
        match self.client().await {
            Ok(client) => client.recv().await,
            Err(e) => {
                warn!(err = %e, "no mqtt client to receive from");
                None
            }
        }
    }
}
