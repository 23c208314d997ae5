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

use serde::Serialize;

use super::{
    cover::{Cover, CoverCommand},
    number::{Number, NumberCommand},
};
use crate::{errors::Result, Error};

/// Every entity config this crate can announce.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entity {
    Number(Number),
    Cover(Cover),
}

/// Parsed command for an entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    Number(NumberCommand),
    Cover(CoverCommand),
}

/// Which topic of the entity a command arrived on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    NumberCommand,
    CoverCommand,
    CoverPosition,
    CoverTilt,
}

impl Entity {
    /// Component segment of the discovery topic.
    pub fn component(&self) -> &'static str {
        match self {
            Entity::Number(_) => "number",
            Entity::Cover(_) => "cover",
        }
    }

    /// `object_id`, falling back to `unique_id`.
    pub fn object_id(&self) -> Option<&str> {
        let (object_id, unique_id) = match self {
            Entity::Number(n) => (&n.object_id, &n.unique_id),
            Entity::Cover(c) => (&c.object_id, &c.unique_id),
        };
        object_id.as_deref().or(unique_id.as_deref())
    }

    pub fn topic_prefix(&self) -> Option<&str> {
        match self {
            Entity::Number(n) => n.topic_prefix.as_deref(),
            Entity::Cover(c) => c.topic_prefix.as_deref(),
        }
    }

    /// Expanded topics home assistant publishes commands to.
    pub fn command_topics(&self) -> Vec<(String, CommandKind)> {
        match self {
            Entity::Number(n) => vec![(n.full_command_topic(), CommandKind::NumberCommand)],
            Entity::Cover(c) => [
                (c.full_command_topic(), CommandKind::CoverCommand),
                (c.full_set_position_topic(), CommandKind::CoverPosition),
                (c.full_tilt_command_topic(), CommandKind::CoverTilt),
            ]
            .into_iter()
            .filter_map(|(topic, kind)| topic.map(|t| (t, kind)))
            .collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.object_id().is_none() {
            return Err(Error::InvalidEntity(format!(
                "{} needs an object id or a unique id",
                self.component()
            )));
        }

        match self {
            Entity::Number(n) => n.validate(),
            Entity::Cover(c) => c.validate(),
        }
    }

    /// Json discovery config.
    pub fn config_payload(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(Error::from)
    }

    /// Parse a payload arriving on the topic identified by `kind`.
    pub fn parse_command(&self, kind: CommandKind, payload: &[u8]) -> Result<Command> {
        match (self, kind) {
            (Entity::Number(n), CommandKind::NumberCommand) => {
                n.parse_command(payload).map(Command::Number)
            }
            (Entity::Cover(c), CommandKind::CoverCommand) => {
                c.parse_command(payload).map(Command::Cover)
            }
            (Entity::Cover(c), CommandKind::CoverPosition) => {
                c.parse_position(payload).map(Command::Cover)
            }
            (Entity::Cover(c), CommandKind::CoverTilt) => c.parse_tilt(payload).map(Command::Cover),
            (entity, kind) => Err(Error::Client(format!(
                "{kind:?} doesn't belong to {}",
                entity.component()
            ))),
        }
    }
}

impl From<Number> for Entity {
    fn from(value: Number) -> Self {
        Entity::Number(value)
    }
}

impl From<Cover> for Entity {
    fn from(value: Cover) -> Self {
        Entity::Cover(value)
    }
}
