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

mod builder;
mod client_impl;
mod inner;

use async_trait::async_trait;
pub use builder::Builder;
pub use client_impl::DiscoveryClientImpl;

use crate::{
    errors::Result,
    model::{AnnounceResponse, Entity},
    mqtt_client::PublishContext,
    router::CommandEvent,
};

/// The abstraction for publishing entities to home assistant.
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// Publish the discovery config of the entity.
    ///
    /// Nothing is sent if the same config has been announced already.
    async fn announce(&self, ctx: &PublishContext, entity: &Entity) -> Result<AnnounceResponse>;

    /// Announce all entities concurrently.
    ///
    /// It succeeds only if every entity is announced, otherwise
    /// [`Error::AnnounceError`](crate::Error::AnnounceError) tells which
    /// entities failed.
    async fn announce_all(
        &self,
        ctx: &PublishContext,
        entities: &[Entity],
    ) -> Result<AnnounceResponse>;

    /// Remove the entity from home assistant.
    async fn remove(&self, ctx: &PublishContext, entity: &Entity) -> Result<()>;

    async fn publish_state(&self, ctx: &PublishContext, topic: &str, payload: &[u8])
        -> Result<()>;

    /// Subscribe to the command topics of the entities.
    async fn listen(&self, entities: &[Entity]) -> Result<()>;

    /// Wait for the next command targeting a listened entity.
    async fn next_command(&self) -> Option<CommandEvent>;

    /// Forget the announced config so the next announce publishes it again.
    fn evict(&self, entity: &Entity);
}
