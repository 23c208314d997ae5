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

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tokio::sync::{mpsc, Mutex};

use crate::{
    config::MqttConfig,
    errors::Result,
    model::Qos,
    mqtt_client::{Message, MqttClient, MqttClientFactory, PublishContext},
    Error,
};

/// Mqtt client used for testing.
///
/// It behaves like a broker holding retained messages: a retained publish
/// replaces the retained message of its topic, and an empty retained payload
/// clears it. Publishing or subscribing to a topic in `failing_topics` fails.
pub struct MockMqttClient {
    pub retained: Arc<DashMap<String, Message>>,
    pub subscriptions: Arc<DashMap<String, Qos>>,
    pub failing_topics: Arc<DashSet<String>>,
    published: Mutex<Vec<Message>>,
    incoming_tx: mpsc::UnboundedSender<Message>,
    incoming_rx: Mutex<mpsc::UnboundedReceiver<Message>>,
}

impl Default for MockMqttClient {
    fn default() -> Self {
        let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
        Self {
            retained: Arc::new(DashMap::new()),
            subscriptions: Arc::new(DashMap::new()),
            failing_topics: Arc::new(DashSet::new()),
            published: Mutex::new(Vec::new()),
            incoming_tx,
            incoming_rx: Mutex::new(incoming_rx),
        }
    }
}

impl MockMqttClient {
    /// Every message published so far, in order.
    pub async fn published(&self) -> Vec<Message> {
        self.published.lock().await.clone()
    }

    /// Deliver a message as if the broker forwarded it.
    ///
    /// Only topics with a matching subscription are delivered, returns whether
    /// the message got through.
    pub fn inject(&self, topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> bool {
        let topic = topic.into();
        let subscribed = self
            .subscriptions
            .iter()
            .any(|sub| crate::model::topic::matches_filter(sub.key(), &topic));
        if !subscribed {
            return false;
        }

        self.incoming_tx
            .send(Message {
                topic,
                payload: payload.into(),
                qos: Qos::AtMostOnce,
                retain: false,
            })
            .is_ok()
    }
}

#[async_trait]
impl MqttClient for MockMqttClient {
    async fn publish(&self, _ctx: &PublishContext, msg: Message) -> Result<()> {
        if self.failing_topics.contains(&msg.topic) {
            return Err(Error::Mqtt(format!("publish to {} rejected", msg.topic)));
        }

        if msg.retain {
            if msg.payload.is_empty() {
                self.retained.remove(&msg.topic);
            } else {
                self.retained.insert(msg.topic.clone(), msg.clone());
            }
        }
        self.published.lock().await.push(msg);
        Ok(())
    }

    async fn subscribe(&self, filter: &str, qos: Qos) -> Result<()> {
        if self.failing_topics.contains(filter) {
            return Err(Error::Mqtt(format!("subscribe to {filter} rejected")));
        }

        self.subscriptions.insert(filter.to_string(), qos);
        Ok(())
    }

    async fn unsubscribe(&self, filter: &str) -> Result<()> {
        self.subscriptions.remove(filter);
        Ok(())
    }

    async fn recv(&self) -> Option<Message> {
        self.incoming_rx.lock().await.recv().await
    }
}

/// Factory handing out the same [`MockMqttClient`] on every build.
#[derive(Default)]
pub struct MockMqttClientFactory {
    pub client: Arc<MockMqttClient>,
    builds: AtomicUsize,
}

impl MockMqttClientFactory {
    pub fn new(client: Arc<MockMqttClient>) -> Self {
        Self {
            client,
            builds: AtomicUsize::new(0),
        }
    }

    /// How many times a client has been built.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MqttClientFactory for MockMqttClientFactory {
    async fn build(&self, _config: &MqttConfig) -> Result<Arc<dyn MqttClient>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let client: Arc<dyn MqttClient> = self.client.clone();
        Ok(client)
    }
}
