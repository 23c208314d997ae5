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

//! Announce response.

/// Outcome of announcing one or more entities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnnounceResponse {
    /// Configs actually sent to the broker.
    pub published: u32,
    /// Configs skipped because the broker already holds the same payload.
    pub unchanged: u32,
}

impl AnnounceResponse {
    pub fn new(published: u32, unchanged: u32) -> Self {
        Self {
            published,
            unchanged,
        }
    }
}
