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

//! Typed home assistant mqtt discovery configs, and a client announcing them.

pub mod config;
pub mod discovery_client;
pub mod errors;
pub mod model;
pub mod mqtt_client;
pub mod router;
mod util;

pub use crate::{
    config::{Authorization, MqttConfig},
    discovery_client::{Builder, DiscoveryClient, DiscoveryClientImpl},
    errors::{AnnounceError, Error, Result},
    model::{topic::topics_match, Cover, Entity, Number},
    mqtt_client::{Message, MqttClient, MqttClientFactory, PublishContext},
    router::{CommandEvent, CommandRouter, Route, Router},
};
