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

pub mod common;
pub mod cover;
pub mod entity;
pub mod number;
mod response;
pub mod topic;
pub mod units;

pub use common::{
    Availability, AvailabilityCheck, AvailabilityMode, Device, EntityCategory, Origin, Qos,
};
pub use cover::{Cover, CoverCommand, CoverDeviceClass, CoverState};
pub use entity::{Command, CommandKind, Entity};
pub use number::{DisplayMode, Number, NumberCommand, NumberDeviceClass};
pub use response::AnnounceResponse;
pub use units::Unit;
