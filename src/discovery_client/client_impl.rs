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

//! Client announcing entities through a single broker connection

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::{
    config::MqttConfig,
    discovery_client::{inner::InnerClient, DiscoveryClient},
    errors::{AnnounceError, Result},
    model::{topic, AnnounceResponse, Entity},
    mqtt_client::{MqttClientFactory, PublishContext},
    router::{CommandEvent, CommandRouter, Route, Router},
    Error,
};

/// Implementation for [`DiscoveryClient`].
///
/// It keeps the payload of every announced config. Announcing the same config
/// again is a no-op until [`evict`] or [`remove`] is called for the entity.
///
/// [`evict`]: DiscoveryClient::evict
/// [`remove`]: DiscoveryClient::remove
pub struct DiscoveryClientImpl<F: MqttClientFactory> {
    inner_client: InnerClient<F>,
    // discovery topic -> announced payload
    announced: DashMap<String, Vec<u8>>,
    // (component, object id) -> entity, for parsing its commands
    listened: DashMap<(&'static str, String), Entity>,
    router: CommandRouter,
}

impl<F: MqttClientFactory> DiscoveryClientImpl<F> {
    pub fn new(factory: Arc<F>, config: MqttConfig) -> Self {
        Self {
            inner_client: InnerClient::new(factory, config),
            announced: DashMap::new(),
            listened: DashMap::new(),
            router: CommandRouter::new(),
        }
    }

    /// Discovery topic the config of the entity is published to.
    pub fn config_topic(&self, entity: &Entity) -> Result<String> {
        let object_id = entity.object_id().ok_or_else(|| {
            Error::InvalidEntity(format!(
                "{} needs an object id or a unique id",
                entity.component()
            ))
        })?;
        let config = self.inner_client.config();

        topic::discovery_topic(
            &config.discovery_prefix,
            entity.component(),
            config.node_id.as_deref(),
            object_id,
        )
    }

    /// Subscribe to the command topics of one entity, then route them.
    ///
    /// Routes and subscriptions from an earlier `listen` of the same entity
    /// stay untouched if any subscribe fails.
    async fn listen_entity(&self, entity: &Entity) -> Result<()> {
        entity.validate()?;
        self.router.check_conflicts(entity)?;
        let key = listen_key(entity)?;
        let qos = self.inner_client.qos(&PublishContext::default());

        let old_topics = self
            .listened
            .get(&key)
            .map(|listened| topics_of(listened.value()))
            .unwrap_or_default();
        let new_topics = topics_of(entity);

        let mut subscribed = Vec::with_capacity(new_topics.len());
        for topic in &new_topics {
            if let Err(e) = self.inner_client.subscribe(topic, qos).await {
                for topic in subscribed.iter().filter(|t| !old_topics.contains(t)) {
                    if let Err(e) = self.inner_client.unsubscribe(topic).await {
                        warn!(topic = %topic, err = %e, "failed to roll back subscription");
                    }
                }
                return Err(e);
            }
            debug!(topic = %topic, "listening for commands");
            subscribed.push(topic.clone());
        }

        self.router.register(entity)?;
        self.listened.insert(key, entity.clone());

        for topic in old_topics.iter().filter(|t| !new_topics.contains(t)) {
            self.inner_client.unsubscribe(topic).await?;
            debug!(topic = %topic, "stale command topic unsubscribed");
        }

        Ok(())
    }

    fn is_announced(&self, topic: &str, payload: &[u8]) -> bool {
        self.announced
            .get(topic)
            .map_or(false, |announced| announced.value().as_slice() == payload)
    }
}

fn listen_key(entity: &Entity) -> Result<(&'static str, String)> {
    let object_id = entity.object_id().ok_or_else(|| {
        Error::InvalidEntity(format!(
            "{} needs an object id or a unique id to be listened",
            entity.component()
        ))
    })?;
    Ok((entity.component(), object_id.to_string()))
}

fn topics_of(entity: &Entity) -> Vec<String> {
    entity
        .command_topics()
        .into_iter()
        .map(|(topic, _)| topic)
        .collect()
}

#[async_trait]
impl<F: MqttClientFactory> DiscoveryClient for DiscoveryClientImpl<F> {
    async fn announce(&self, ctx: &PublishContext, entity: &Entity) -> Result<AnnounceResponse> {
        entity.validate()?;
        let topic = self.config_topic(entity)?;
        let payload = entity.config_payload()?;

        if self.is_announced(&topic, &payload) {
            debug!(topic = %topic, "config unchanged, skip announcing");
            return Ok(AnnounceResponse::new(0, 1));
        }

        self.inner_client
            .publish(ctx, topic.clone(), payload.clone(), true)
            .await?;
        info!(topic = %topic, "entity announced");
        self.announced.insert(topic, payload);

        Ok(AnnounceResponse::new(1, 0))
    }

    async fn announce_all(
        &self,
        ctx: &PublishContext,
        entities: &[Entity],
    ) -> Result<AnnounceResponse> {
        let futures = entities.iter().map(|entity| async move {
            let object_id = entity.object_id().unwrap_or_default().to_string();
            (object_id, self.announce(ctx, entity).await)
        });
        let results = join_all(futures).await;

        let announce_error: AnnounceError = results.into();
        if announce_error.all_ok() {
            Ok(announce_error.ok.1)
        } else {
            Err(Error::AnnounceError(announce_error))
        }
    }

    async fn remove(&self, ctx: &PublishContext, entity: &Entity) -> Result<()> {
        let topic = self.config_topic(entity)?;

        // An empty retained payload deletes the entity.
        self.inner_client
            .publish(ctx, topic.clone(), Vec::new(), true)
            .await?;
        info!(topic = %topic, "entity removed");

        self.announced.remove(&topic);
        if let Ok(key) = listen_key(entity) {
            self.router.evict(key.0, &key.1);
            if let Some((_, listened)) = self.listened.remove(&key) {
                for topic in topics_of(&listened) {
                    self.inner_client.unsubscribe(&topic).await?;
                }
            }
        }

        Ok(())
    }

    async fn publish_state(
        &self,
        ctx: &PublishContext,
        topic: &str,
        payload: &[u8],
    ) -> Result<()> {
        self.inner_client
            .publish(ctx, topic.to_string(), payload.to_vec(), false)
            .await
    }

    async fn listen(&self, entities: &[Entity]) -> Result<()> {
        for entity in entities {
            self.listen_entity(entity).await?;
        }

        Ok(())
    }

    async fn next_command(&self) -> Option<CommandEvent> {
        loop {
            let msg = self.inner_client.recv().await?;
            let lookup = |route: &Route| {
                self.listened
                    .get(&(route.component, route.object_id.clone()))
                    .map(|entity| entity.value().clone())
            };

            match self.router.dispatch(lookup, &msg.topic, &msg.payload) {
                Some(event) => return Some(event),
                None => debug!(topic = %msg.topic, "no entity listens on topic, message dropped"),
            }
        }
    }

    fn evict(&self, entity: &Entity) {
        if let Ok(topic) = self.config_topic(entity) {
            self.announced.remove(&topic);
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::{
        model::{Command, Cover, CoverCommand, Number, NumberCommand, Origin, Qos},
        mqtt_client::{MockMqttClient, MockMqttClientFactory},
    };

    fn new_client(
        config: MqttConfig,
    ) -> (
        Arc<MockMqttClientFactory>,
        DiscoveryClientImpl<MockMqttClientFactory>,
    ) {
        let mock_client = Arc::new(MockMqttClient::default());
        let factory = Arc::new(MockMqttClientFactory::new(mock_client));
        let client = DiscoveryClientImpl::new(factory.clone(), config);
        (factory, client)
    }

    fn volume() -> Entity {
        Number::new("~/set")
            .topic_prefix("amp/volume")
            .origin(Origin::new("amp-bridge"))
            .unique_id("volume")
            .min(0.0)
            .max(10.0)
            .into()
    }

    fn blind() -> Entity {
        Cover::default()
            .origin(Origin::new("amp-bridge"))
            .unique_id("blind")
            .command_topic("home/blind/set")
            .into()
    }

    #[tokio::test]
    async fn test_announce_and_skip_unchanged() {
        let (factory, client) = new_client(MqttConfig::default());
        let ctx = PublishContext::default();

        let resp = client.announce(&ctx, &volume()).await.unwrap();
        assert_eq!(AnnounceResponse::new(1, 0), resp);

        let retained = factory
            .client
            .retained
            .get("homeassistant/number/volume/config")
            .map(|m| m.value().clone())
            .unwrap();
        assert!(retained.retain);
        assert_eq!(Qos::AtLeastOnce, retained.qos);
        assert_eq!(volume().config_payload().unwrap(), retained.payload);

        let resp = client.announce(&ctx, &volume()).await.unwrap();
        assert_eq!(AnnounceResponse::new(0, 1), resp);
        assert_eq!(1, factory.client.published().await.len());

        client.evict(&volume());
        let resp = client.announce(&ctx, &volume()).await.unwrap();
        assert_eq!(AnnounceResponse::new(1, 0), resp);
        assert_eq!(1, factory.builds());
    }

    #[tokio::test]
    async fn test_announce_with_node_id_and_context() {
        let config = MqttConfig {
            discovery_prefix: "ha".to_string(),
            node_id: Some("bridge-1".to_string()),
            ..Default::default()
        };
        let (factory, client) = new_client(config);
        let ctx = PublishContext::default().qos(Qos::ExactlyOnce).retain(false);

        client.announce(&ctx, &blind()).await.unwrap();

        let published = factory.client.published().await;
        assert_eq!("ha/cover/bridge-1/blind/config", published[0].topic);
        assert_eq!(Qos::ExactlyOnce, published[0].qos);
        assert!(!published[0].retain);
        assert!(factory.client.retained.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_entity_is_not_published() {
        let (factory, client) = new_client(MqttConfig::default());
        let ctx = PublishContext::default();

        let no_id: Entity = Number::new("amp/set").into();
        assert!(matches!(
            client.announce(&ctx, &no_id).await,
            Err(Error::InvalidEntity(_))
        ));

        let bad_range: Entity = Number::new("amp/set")
            .unique_id("amp")
            .min(5.0)
            .max(1.0)
            .into();
        assert!(client.announce(&ctx, &bad_range).await.is_err());

        let nan_range: Entity = Number::new("amp/set")
            .unique_id("amp")
            .min(f64::NAN)
            .step(f64::NAN)
            .into();
        assert!(matches!(
            client.announce(&ctx, &nan_range).await,
            Err(Error::InvalidEntity(_))
        ));
        assert!(factory.client.published().await.is_empty());
        assert_eq!(0, factory.builds());
    }

    #[tokio::test]
    async fn test_announce_all_partial_failure() {
        let (factory, client) = new_client(MqttConfig::default());
        let ctx = PublishContext::default();
        factory
            .client
            .failing_topics
            .insert("homeassistant/cover/blind/config".to_string());

        let err = client
            .announce_all(&ctx, &[volume(), blind()])
            .await
            .unwrap_err();
        match err {
            Error::AnnounceError(announce_error) => {
                assert_eq!(vec!["volume".to_string()], announce_error.ok.0);
                assert_eq!(AnnounceResponse::new(1, 0), announce_error.ok.1);
                assert_eq!(1, announce_error.errors.len());
                assert_eq!("blind", announce_error.errors[0].0);
            }
            e => panic!("unexpected error:{e}"),
        }

        // The failed one is not cached and goes out on retry.
        factory
            .client
            .failing_topics
            .remove("homeassistant/cover/blind/config");
        let resp = client
            .announce_all(&ctx, &[volume(), blind()])
            .await
            .unwrap();
        assert_eq!(AnnounceResponse::new(1, 1), resp);
    }

    #[tokio::test]
    async fn test_remove() {
        let (factory, client) = new_client(MqttConfig::default());
        let ctx = PublishContext::default();

        client.announce(&ctx, &volume()).await.unwrap();
        client.remove(&ctx, &volume()).await.unwrap();
        assert!(factory.client.retained.is_empty());

        let published = factory.client.published().await;
        assert_eq!(2, published.len());
        assert!(published[1].payload.is_empty());
        assert!(published[1].retain);

        let resp = client.announce(&ctx, &volume()).await.unwrap();
        assert_eq!(AnnounceResponse::new(1, 0), resp);
    }

    #[tokio::test]
    async fn test_publish_state() {
        let (factory, client) = new_client(MqttConfig::default());
        let ctx = PublishContext::default();

        client
            .publish_state(&ctx, "amp/volume/state", b"4")
            .await
            .unwrap();
        assert!(client
            .publish_state(&ctx, "amp/+/state", b"4")
            .await
            .is_err());

        let published = factory.client.published().await;
        assert_eq!(1, published.len());
        assert!(!published[0].retain);
        assert_eq!(b"4".to_vec(), published[0].payload);
    }

    #[tokio::test]
    async fn test_listen_and_receive_commands() {
        let (factory, client) = new_client(MqttConfig::default());
        client.listen(&[volume(), blind()]).await.unwrap();

        assert!(factory.client.subscriptions.contains_key("amp/volume/set"));
        assert!(factory.client.subscriptions.contains_key("home/blind/set"));

        // Not subscribed, so never delivered.
        assert!(!factory.client.inject("amp/volume/set/", "3"));
        assert!(factory.client.inject("amp/volume/set", "3"));
        assert!(factory.client.inject("home/blind/set", "OPEN"));

        let event = client.next_command().await.unwrap();
        assert_eq!("volume", event.object_id);
        assert_eq!(
            Command::Number(NumberCommand::Set(3.0)),
            event.command.unwrap()
        );

        let event = client.next_command().await.unwrap();
        assert_eq!("home/blind/set", event.topic);
        assert_eq!(Command::Cover(CoverCommand::Open), event.command.unwrap());
    }

    #[tokio::test]
    async fn test_removed_entity_stops_receiving() {
        let (factory, client) = new_client(MqttConfig::default());
        let ctx = PublishContext::default();
        client.listen(&[volume(), blind()]).await.unwrap();
        client.remove(&ctx, &volume()).await.unwrap();

        assert!(!factory.client.subscriptions.contains_key("amp/volume/set"));
        assert!(!factory.client.inject("amp/volume/set", "3"));
        assert!(factory.client.inject("home/blind/set", "CLOSE"));

        let event = client.next_command().await.unwrap();
        assert_eq!("blind", event.object_id);
    }

    #[tokio::test]
    async fn test_same_object_id_in_two_components() {
        let (factory, client) = new_client(MqttConfig::default());
        let ctx = PublishContext::default();
        let level: Entity = Number::new("dev/level/set").unique_id("x").into();
        let cover: Entity = Cover::default()
            .unique_id("x")
            .command_topic("dev/cover/set")
            .into();
        client.listen(&[level.clone(), cover.clone()]).await.unwrap();

        assert!(factory.client.inject("dev/level/set", "5"));
        let event = client.next_command().await.unwrap();
        assert_eq!(("number", "x"), (event.component, event.object_id.as_str()));
        assert_eq!(
            Command::Number(NumberCommand::Set(5.0)),
            event.command.unwrap()
        );

        // Removing the cover leaves the number listening.
        client.remove(&ctx, &cover).await.unwrap();
        assert!(!factory.client.subscriptions.contains_key("dev/cover/set"));
        assert!(factory.client.inject("dev/level/set", "6"));
        let event = client.next_command().await.unwrap();
        assert_eq!("number", event.component);
        assert_eq!(
            Command::Number(NumberCommand::Set(6.0)),
            event.command.unwrap()
        );
    }

    #[tokio::test]
    async fn test_listen_again_drops_stale_topics() {
        let (factory, client) = new_client(MqttConfig::default());
        let ctx = PublishContext::default();
        let home = blind();
        let attic: Entity = Cover::default()
            .unique_id("blind")
            .command_topic("attic/blind/set")
            .into();

        client.listen(&[home]).await.unwrap();
        client.listen(&[attic.clone()]).await.unwrap();
        assert!(!factory.client.subscriptions.contains_key("home/blind/set"));
        assert!(factory.client.subscriptions.contains_key("attic/blind/set"));
        assert!(!factory.client.inject("home/blind/set", "OPEN"));

        client.remove(&ctx, &attic).await.unwrap();
        assert!(factory.client.subscriptions.is_empty());
    }

    #[tokio::test]
    async fn test_failed_subscribe_keeps_previous_listen() {
        let (factory, client) = new_client(MqttConfig::default());
        let moved: Entity = Cover::default()
            .unique_id("blind")
            .command_topic("attic/blind/set")
            .tilt_command_topic("attic/blind/tilt")
            .into();
        factory
            .client
            .failing_topics
            .insert("attic/blind/tilt".to_string());

        client.listen(&[blind()]).await.unwrap();
        assert!(client.listen(&[moved]).await.is_err());

        assert_eq!(1, factory.client.subscriptions.len());
        assert!(factory.client.subscriptions.contains_key("home/blind/set"));
        assert!(factory.client.inject("home/blind/set", "STOP"));
        let event = client.next_command().await.unwrap();
        assert_eq!("blind", event.object_id);
        assert_eq!(Command::Cover(CoverCommand::Stop), event.command.unwrap());
    }
}
