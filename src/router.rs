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

//! [Router] for incoming commands

use dashmap::DashMap;

use crate::{
    errors::Result,
    model::{Command, CommandKind, Entity},
    Error,
};

/// Where a command topic leads.
///
/// Entities are told apart by component and object id, a number and a cover
/// may share the same object id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub component: &'static str,
    pub object_id: String,
    pub kind: CommandKind,
}

impl Route {
    fn belongs_to(&self, component: &str, object_id: &str) -> bool {
        self.component == component && self.object_id == object_id
    }
}

/// A command received for a known entity.
#[derive(Debug)]
pub struct CommandEvent {
    pub component: &'static str,
    pub object_id: String,
    pub topic: String,
    pub command: Result<Command>,
}

/// Used to route command topics to entities.
pub trait Router: Send + Sync {
    /// Register every command topic of the entity, replacing its old routes.
    fn register(&self, entity: &Entity) -> Result<Vec<String>>;

    fn route(&self, topic: &str) -> Option<Route>;

    fn evict(&self, component: &str, object_id: &str);
}

/// Implementation for [`Router`].
///
/// Topics are looked up by exact string equality, so a message on `blind/set/`
/// never reaches an entity listening on `blind/set`.
#[derive(Default)]
pub struct CommandRouter {
    routes: DashMap<String, Route>,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail if a command topic of the entity is routed to another entity.
    pub fn check_conflicts(&self, entity: &Entity) -> Result<()> {
        let object_id = routable_id(entity)?;
        for (topic, _) in entity.command_topics() {
            let owner = self
                .routes
                .get(&topic)
                .map(|r| (r.component, r.object_id.clone()));
            if let Some((component, owner)) = owner {
                if component != entity.component() || owner != object_id {
                    return Err(Error::InvalidTopic(format!(
                        "command topic:{topic} is already used by:{component}/{owner}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Route the message and parse it with the entity returned by `lookup`.
    ///
    /// Returns `None` if the topic or the entity is unknown.
    pub fn dispatch<L>(&self, lookup: L, topic: &str, payload: &[u8]) -> Option<CommandEvent>
    where
        L: Fn(&Route) -> Option<Entity>,
    {
        let route = self.route(topic)?;
        let entity = lookup(&route)?;
        let command = entity.parse_command(route.kind, payload);

        Some(CommandEvent {
            component: route.component,
            object_id: route.object_id,
            topic: topic.to_string(),
            command,
        })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn routable_id(entity: &Entity) -> Result<&str> {
    entity.object_id().ok_or_else(|| {
        Error::InvalidEntity(format!(
            "{} needs an object id or a unique id to be routed",
            entity.component()
        ))
    })
}

impl Router for CommandRouter {
    fn register(&self, entity: &Entity) -> Result<Vec<String>> {
        // All conflicts are checked first, no route is touched on failure.
        self.check_conflicts(entity)?;
        let object_id = routable_id(entity)?;

        self.evict(entity.component(), object_id);
        let command_topics = entity.command_topics();
        let mut registered = Vec::with_capacity(command_topics.len());
        for (topic, kind) in command_topics {
            self.routes.insert(
                topic.clone(),
                Route {
                    component: entity.component(),
                    object_id: object_id.to_string(),
                    kind,
                },
            );
            registered.push(topic);
        }

        Ok(registered)
    }

    fn route(&self, topic: &str) -> Option<Route> {
        self.routes.get(topic).map(|r| r.value().clone())
    }

    fn evict(&self, component: &str, object_id: &str) {
        self.routes
            .retain(|_, route| !route.belongs_to(component, object_id));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{Cover, CoverCommand, Number, NumberCommand};

    fn blind() -> Entity {
        Cover::default()
            .unique_id("blind")
            .topic_prefix("home/blind")
            .command_topic("~/set")
            .position_topic("~/position")
            .set_position_topic("~/position/set")
            .into()
    }

    fn volume() -> Entity {
        Number::new("amp/volume/set")
            .unique_id("volume")
            .min(0.0)
            .max(10.0)
            .into()
    }

    #[test]
    fn test_basic_flow() {
        let router = CommandRouter::new();
        let registered = router.register(&blind()).unwrap();
        assert_eq!(
            vec!["home/blind/set".to_string(), "home/blind/position/set".to_string()],
            registered
        );
        router.register(&volume()).unwrap();
        assert_eq!(3, router.len());

        assert_eq!(
            Some(Route {
                component: "cover",
                object_id: "blind".to_string(),
                kind: CommandKind::CoverPosition,
            }),
            router.route("home/blind/position/set")
        );
        assert_eq!(None, router.route("home/blind/set/"));
        assert_eq!(None, router.route("~/set"));

        router.evict("cover", "blind");
        assert_eq!(None, router.route("home/blind/set"));
        assert!(router.route("amp/volume/set").is_some());
    }

    #[test]
    fn test_register_replaces_old_routes() {
        let router = CommandRouter::new();
        router.register(&blind()).unwrap();

        let moved: Entity = Cover::default()
            .unique_id("blind")
            .command_topic("attic/blind/set")
            .into();
        router.register(&moved).unwrap();

        assert_eq!(1, router.len());
        assert!(router.route("home/blind/set").is_none());
        assert!(router.route("attic/blind/set").is_some());
    }

    #[test]
    fn test_conflicting_topic() {
        let router = CommandRouter::new();
        router.register(&volume()).unwrap();

        let other: Entity = Number::new("amp/volume/set").unique_id("bass").into();
        assert!(router.register(&other).is_err());
        assert_eq!(
            "volume",
            router.route("amp/volume/set").unwrap().object_id
        );
    }

    #[test]
    fn test_dispatch() {
        let router = CommandRouter::new();
        let entities = vec![blind(), volume()];
        for entity in &entities {
            router.register(entity).unwrap();
        }
        let lookup = |route: &Route| {
            entities
                .iter()
                .find(|e| {
                    e.component() == route.component
                        && e.object_id() == Some(route.object_id.as_str())
                })
                .cloned()
        };

        let event = router.dispatch(lookup, "amp/volume/set", b"7.5").unwrap();
        assert_eq!("volume", event.object_id);
        assert_eq!(
            Command::Number(NumberCommand::Set(7.5)),
            event.command.unwrap()
        );

        let event = router.dispatch(lookup, "home/blind/set", b"STOP").unwrap();
        assert_eq!(Command::Cover(CoverCommand::Stop), event.command.unwrap());

        let event = router.dispatch(lookup, "amp/volume/set", b"11").unwrap();
        assert!(event.command.is_err());

        assert!(router.dispatch(lookup, "amp/volume/set/", b"1").is_none());
    }

    #[test]
    fn test_same_object_id_in_two_components() {
        let router = CommandRouter::new();
        let level: Entity = Number::new("dev/level/set").unique_id("x").into();
        let cover: Entity = Cover::default()
            .unique_id("x")
            .command_topic("dev/cover/set")
            .into();
        router.register(&level).unwrap();
        router.register(&cover).unwrap();

        assert_eq!(2, router.len());
        assert_eq!("number", router.route("dev/level/set").unwrap().component);
        assert_eq!("cover", router.route("dev/cover/set").unwrap().component);

        router.evict("cover", "x");
        assert!(router.route("dev/cover/set").is_none());
        assert!(router.route("dev/level/set").is_some());

        // A cover can't take over the topic of the number sharing its id.
        let clash: Entity = Cover::default()
            .unique_id("x")
            .command_topic("dev/level/set")
            .into();
        assert!(router.register(&clash).is_err());
    }
}
