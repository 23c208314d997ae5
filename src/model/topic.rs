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

//! Topic helpers.
//!
//! Home assistant compares topics as plain strings: `some-topic/` and
//! `some-topic` are two different topics, and nothing here normalizes
//! separators.

use crate::{errors::Result, util::is_valid_id, Error};

/// Placeholder replaced by the entity topic prefix.
pub const TOPIC_BASE: char = '~';

const MAX_TOPIC_LEN: usize = 65535;

/// Expand the `~` abbreviation of a topic attribute.
///
/// Only a leading or a trailing `~` is replaced. A topic both starting and
/// ending with `~` only gets its leading one replaced, which differs from home
/// assistant where the trailing one is replaced as well.
pub fn expand(topic: &str, prefix: Option<&str>) -> String {
    let Some(prefix) = prefix else {
        return topic.to_string();
    };

    if let Some(rest) = topic.strip_prefix(TOPIC_BASE) {
        format!("{prefix}{rest}")
    } else if let Some(rest) = topic.strip_suffix(TOPIC_BASE) {
        format!("{rest}{prefix}")
    } else {
        topic.to_string()
    }
}

/// Whether a publisher on `a` reaches a subscriber on `b`.
#[inline]
pub fn topics_match(a: &str, b: &str) -> bool {
    a == b
}

/// Match a topic against a subscription filter containing `+` or `#`.
///
/// Topics starting with `$` are never matched by a leading wildcard.
pub fn matches_filter(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }

    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(f), Some(t)) if f == t => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Check the topic can be published to.
pub fn validate_publish_topic(topic: &str) -> Result<()> {
    check_common(topic)?;

    if topic.contains(|c| c == '+' || c == '#') {
        return Err(Error::InvalidTopic(format!(
            "wildcards are not allowed in publish topic:{topic}"
        )));
    }

    Ok(())
}

/// Check the filter can be subscribed to.
pub fn validate_filter(filter: &str) -> Result<()> {
    check_common(filter)?;

    let levels: Vec<_> = filter.split('/').collect();
    for (idx, level) in levels.iter().enumerate() {
        let is_last = idx + 1 == levels.len();
        if level.contains('#') && (*level != "#" || !is_last) {
            return Err(Error::InvalidTopic(format!(
                "'#' must be the whole last level, filter:{filter}"
            )));
        }
        if level.contains('+') && *level != "+" {
            return Err(Error::InvalidTopic(format!(
                "'+' must be a whole level, filter:{filter}"
            )));
        }
    }

    Ok(())
}

fn check_common(topic: &str) -> Result<()> {
    if topic.is_empty() {
        return Err(Error::InvalidTopic("topic is empty".to_string()));
    }

    if topic.len() > MAX_TOPIC_LEN {
        return Err(Error::InvalidTopic(format!(
            "topic is too long, len:{}",
            topic.len()
        )));
    }

    if topic.contains('\0') {
        return Err(Error::InvalidTopic(format!(
            "topic contains NUL character:{topic:?}"
        )));
    }

    Ok(())
}

/// Build `<prefix>/<component>/[<node_id>/]<object_id>/config`.
pub fn discovery_topic(
    discovery_prefix: &str,
    component: &str,
    node_id: Option<&str>,
    object_id: &str,
) -> Result<String> {
    if !is_valid_id(object_id) {
        return Err(Error::InvalidTopic(format!(
            "object id should only contain [a-zA-Z0-9_-], object_id:{object_id}"
        )));
    }

    let topic = match node_id {
        Some(node_id) => {
            if !is_valid_id(node_id) {
                return Err(Error::InvalidTopic(format!(
                    "node id should only contain [a-zA-Z0-9_-], node_id:{node_id}"
                )));
            }
            format!("{discovery_prefix}/{component}/{node_id}/{object_id}/config")
        }
        None => format!("{discovery_prefix}/{component}/{object_id}/config"),
    };

    validate_publish_topic(&topic)?;
    Ok(topic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand() {
        let cases = vec![
            ("~/command", Some("home/blind"), "home/blind/command"),
            ("state/~", Some("home/blind"), "state/home/blind"),
            ("~", Some("home/blind"), "home/blind"),
            ("plain/topic", Some("home/blind"), "plain/topic"),
            ("~/command", None, "~/command"),
            ("a/~/b", Some("home"), "a/~/b"),
            ("~/a/~", Some("home"), "home/a/~"),
        ];

        for (topic, prefix, expected) in cases {
            assert_eq!(expected, expand(topic, prefix));
        }
    }

    #[test]
    fn test_trailing_separator_is_significant() {
        assert!(topics_match("some-topic", "some-topic"));
        assert!(!topics_match("some-topic/", "some-topic"));
        assert!(!topics_match("some-topic", "some-topic/"));
        assert!(!topics_match("Some-Topic", "some-topic"));
    }

    #[test]
    fn test_matches_filter() {
        let matched = vec![
            ("home/+/command", "home/blind/command"),
            ("home/#", "home/blind/command"),
            ("home/#", "home"),
            ("#", "home/blind"),
            ("home/blind", "home/blind"),
            ("+/+", "/finance"),
        ];
        for (filter, topic) in matched {
            assert!(matches_filter(filter, topic), "{filter} vs {topic}");
        }

        let unmatched = vec![
            ("home/+", "home/blind/command"),
            ("home/blind", "home/blind/"),
            ("home/blind/", "home/blind"),
            ("#", "$SYS/broker"),
            ("+/broker", "$SYS/broker"),
        ];
        for (filter, topic) in unmatched {
            assert!(!matches_filter(filter, topic), "{filter} vs {topic}");
        }
    }

    #[test]
    fn test_validate_topics() {
        assert!(validate_publish_topic("home/blind/set").is_ok());
        assert!(validate_publish_topic("").is_err());
        assert!(validate_publish_topic("home/+/set").is_err());
        assert!(validate_publish_topic("home/#").is_err());
        assert!(validate_publish_topic("home/\0").is_err());

        assert!(validate_filter("home/+/set").is_ok());
        assert!(validate_filter("home/#").is_ok());
        assert!(validate_filter("home/#/set").is_err());
        assert!(validate_filter("home/a+").is_err());
        assert!(validate_filter("home/a#").is_err());
    }

    #[test]
    fn test_discovery_topic() {
        assert_eq!(
            "homeassistant/number/volume/config",
            discovery_topic("homeassistant", "number", None, "volume").unwrap()
        );
        assert_eq!(
            "homeassistant/cover/bridge-1/garage_door/config",
            discovery_topic("homeassistant", "cover", Some("bridge-1"), "garage_door").unwrap()
        );

        assert!(discovery_topic("homeassistant", "cover", None, "garage door").is_err());
        assert!(discovery_topic("homeassistant", "cover", Some("a/b"), "door").is_err());
        assert!(discovery_topic("homeassistant", "cover", None, "").is_err());
    }
}
