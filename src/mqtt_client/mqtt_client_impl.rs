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

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use dashmap::DashMap;
use rumqttc::{AsyncClient, ConnAck, Event, EventLoop, MqttOptions, Packet};
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        Mutex,
    },
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    config::MqttConfig,
    errors::{Error, Result},
    model::Qos,
    mqtt_client::{Message, MqttClient, MqttClientFactory, PublishContext},
};

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// The implementation for [`MqttClient`] based on rumqttc.
///
/// A background task drives the rumqttc event loop, which also takes care of
/// reconnecting. Subscriptions are restored after a reconnect unless the broker
/// kept the session. Incoming publishes are queued until [`MqttClient::recv`]
/// picks them up, and dropped while the queue is full.
pub struct RumqttcClient {
    raw_client: AsyncClient,
    publish_timeout: Duration,
    // filter -> qos, restored on reconnect
    subscriptions: Arc<DashMap<String, Qos>>,
    incoming: Mutex<mpsc::Receiver<Message>>,
    event_loop_handle: JoinHandle<()>,
}

#[async_trait]
impl MqttClient for RumqttcClient {
    async fn publish(&self, ctx: &PublishContext, msg: Message) -> Result<()> {
        let timeout = ctx.timeout.unwrap_or(self.publish_timeout);
        let topic = msg.topic.clone();
        let publish = self
            .raw_client
            .publish(msg.topic, msg.qos.into(), msg.retain, msg.payload);

        match tokio::time::timeout(timeout, publish).await {
            Ok(res) => {
                res?;
                debug!(topic = %topic, "message published");
                Ok(())
            }
            Err(_) => Err(Error::Mqtt(format!(
                "publish to {topic} timed out after {timeout:?}"
            ))),
        }
    }

    async fn subscribe(&self, filter: &str, qos: Qos) -> Result<()> {
        self.raw_client.subscribe(filter, qos.into()).await?;
        self.subscriptions.insert(filter.to_string(), qos);
        debug!(filter, "subscribed");
        Ok(())
    }

    async fn unsubscribe(&self, filter: &str) -> Result<()> {
        self.raw_client.unsubscribe(filter).await?;
        self.subscriptions.remove(filter);
        debug!(filter, "unsubscribed");
        Ok(())
    }

    async fn recv(&self) -> Option<Message> {
        self.incoming.lock().await.recv().await
    }
}

impl Drop for RumqttcClient {
    fn drop(&mut self) {
        self.event_loop_handle.abort();
    }
}

impl RumqttcClient {
    /// Connect to the broker and wait for its acknowledgement.
    pub async fn connect(config: &MqttConfig) -> Result<Self> {
        let mut options =
            MqttOptions::new(config.client_id.clone(), config.host.clone(), config.port);
        options
            .set_keep_alive(config.keep_alive)
            .set_clean_session(config.clean_session);
        if let Some(auth) = &config.authorization {
            options.set_credentials(auth.username.clone(), auth.password.clone());
        }

        let (raw_client, mut event_loop) =
            AsyncClient::new(options, config.request_channel_capacity);
        wait_for_connack(&mut event_loop, config.connect_timeout).await?;
        info!(host = %config.host, port = config.port, "connected to mqtt broker");

        let (incoming_tx, incoming_rx) = mpsc::channel(config.incoming_channel_capacity);
        let subscriptions = Arc::new(DashMap::new());
        let event_loop_handle = tokio::spawn(drive_event_loop(
            event_loop,
            raw_client.clone(),
            subscriptions.clone(),
            incoming_tx,
        ));

        Ok(Self {
            raw_client,
            publish_timeout: config.publish_timeout,
            subscriptions,
            incoming: Mutex::new(incoming_rx),
            event_loop_handle,
        })
    }
}

async fn wait_for_connack(event_loop: &mut EventLoop, connect_timeout: Duration) -> Result<()> {
    let connected = tokio::time::timeout(connect_timeout, async {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                Ok(_) => continue,
                Err(e) => {
                    return Err(Error::Connect(format!(
                        "failed to connect to broker, err:{e}"
                    )))
                }
            }
        }
    })
    .await;

    match connected {
        Ok(res) => res,
        Err(_) => Err(Error::Connect(format!(
            "no connection acknowledgement after {connect_timeout:?}"
        ))),
    }
}

async fn drive_event_loop(
    mut event_loop: EventLoop,
    raw_client: AsyncClient,
    subscriptions: Arc<DashMap<String, Qos>>,
    incoming: mpsc::Sender<Message>,
) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let msg = Message {
                    topic: String::from_utf8_lossy(publish.topic.as_ref()).into_owned(),
                    payload: publish.payload.to_vec(),
                    qos: publish.qos.into(),
                    retain: publish.retain,
                };
                forward_incoming(&incoming, msg);
            }
            // The first acknowledgement is consumed by `wait_for_connack`.
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                let filters = filters_to_restore(&ack, &subscriptions);
                info!(restoring = filters.len(), "reconnected to mqtt broker");
                if !filters.is_empty() {
                    tokio::spawn(restore_subscriptions(raw_client.clone(), filters));
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(err = %e, "mqtt connection error, retry later");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Queue an incoming message without ever waiting on the consumer.
///
/// Returns whether the message is queued.
fn forward_incoming(incoming: &mpsc::Sender<Message>, msg: Message) -> bool {
    match incoming.try_send(msg) {
        Ok(()) => true,
        Err(TrySendError::Full(msg)) => {
            warn!(topic = %msg.topic, "incoming queue is full, message dropped");
            false
        }
        Err(TrySendError::Closed(msg)) => {
            debug!(topic = %msg.topic, "incoming receiver is gone, message dropped");
            false
        }
    }
}

/// Filters to subscribe again after the broker acknowledged a reconnect.
fn filters_to_restore(ack: &ConnAck, subscriptions: &DashMap<String, Qos>) -> Vec<(String, Qos)> {
    if ack.session_present {
        return Vec::new();
    }

    subscriptions
        .iter()
        .map(|sub| (sub.key().clone(), *sub.value()))
        .collect()
}

// Runs apart from the event loop, which has to keep polling for the
// subscribe requests to go out.
async fn restore_subscriptions(raw_client: AsyncClient, filters: Vec<(String, Qos)>) {
    for (filter, qos) in filters {
        match raw_client.subscribe(filter.clone(), qos.into()).await {
            Ok(()) => debug!(filter = %filter, "subscription restored"),
            Err(e) => warn!(filter = %filter, err = %e, "failed to restore subscription"),
        }
    }
}

/// Factory connecting a new [`RumqttcClient`] on every build.
#[derive(Clone, Debug, Default)]
pub struct RumqttcClientFactory;

#[async_trait]
impl MqttClientFactory for RumqttcClientFactory {
    async fn build(&self, config: &MqttConfig) -> Result<Arc<dyn MqttClient>> {
        let client: Arc<dyn MqttClient> = Arc::new(RumqttcClient::connect(config).await?);
        Ok(client)
    }
}
