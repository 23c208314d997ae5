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

/// Node ids and object ids may only contain `[a-zA-Z0-9_-]`.
#[inline]
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Format a float for a state payload, dropping a zero fraction.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("garage_door-1"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("garage door"));
        assert!(!is_valid_id("garage/door"));
        assert!(!is_valid_id("tür"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!("42", format_number(42.0));
        assert_eq!("-3", format_number(-3.0));
        assert_eq!("0.5", format_number(0.5));
        assert_eq!("21.25", format_number(21.25));
    }
}
