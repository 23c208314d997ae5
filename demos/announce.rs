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

use anyhow::Context;
use hass_mqtt_discovery::{
    model::{
        units::PercentageUnit, Availability, Command, CoverCommand, CoverDeviceClass,
        CoverState, Device, DisplayMode, NumberCommand, Origin,
    },
    Builder, Cover, DiscoveryClient, Entity, MqttConfig, Number, PublishContext,
};

fn entities() -> Vec<Entity> {
    let origin = Origin::new("announce-demo").sw_version(env!("CARGO_PKG_VERSION"));
    let device = Device::default()
        .name("Living room")
        .identifier("living-room-01")
        .manufacturer("Demo");

    let volume = Number::new("~/set")
        .topic_prefix("demo/volume")
        .state_topic("~/state")
        .origin(origin.clone())
        .device(device.clone())
        .availability(Availability::single_topic("demo/online"))
        .unique_id("demo_volume")
        .name("Volume")
        .min(0.0)
        .max(100.0)
        .step(5.0)
        .mode(DisplayMode::Slider)
        .unit_of_measurement(PercentageUnit::Percentage);

    let blind = Cover::default()
        .topic_prefix("demo/blind")
        .command_topic("~/set")
        .state_topic("~/state")
        .origin(origin)
        .device(device)
        .availability(Availability::single_topic("demo/online"))
        .unique_id("demo_blind")
        .name("Blind")
        .device_class(CoverDeviceClass::Blind);

    vec![volume.into(), blind.into()]
}

async fn announce(client: &Arc<dyn DiscoveryClient>, entities: &[Entity]) -> anyhow::Result<()> {
    let ctx = PublishContext::default();
    let resp = client
        .announce_all(&ctx, entities)
        .await
        .context("announce entities")?;
    println!("Announce result:{:?}", resp);

    client
        .publish_state(&ctx, "demo/online", b"online")
        .await
        .context("publish availability")?;
    if let Entity::Number(volume) = &entities[0] {
        client
            .publish_state(&ctx, "demo/volume/state", volume.state_payload(40.0).as_bytes())
            .await
            .context("publish volume state")?;
    }
    if let Entity::Cover(blind) = &entities[1] {
        client
            .publish_state(
                &ctx,
                "demo/blind/state",
                blind.state_payload(CoverState::Closed).as_bytes(),
            )
            .await
            .context("publish blind state")?;
    }

    Ok(())
}

async fn serve_commands(
    client: &Arc<dyn DiscoveryClient>,
    entities: &[Entity],
) -> anyhow::Result<()> {
    let Entity::Number(volume) = &entities[0] else {
        anyhow::bail!("the first entity should be the volume");
    };
    client.listen(entities).await.context("listen for commands")?;

    let ctx = PublishContext::default();
    let deadline = tokio::time::sleep(Duration::from_secs(30));
    tokio::pin!(deadline);
    loop {
        let event = tokio::select! {
            _ = &mut deadline => break,
            event = client.next_command() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event.command {
            Ok(Command::Number(NumberCommand::Set(value))) => {
                println!("Volume set to {value}");
                client
                    .publish_state(
                        &ctx,
                        "demo/volume/state",
                        volume.state_payload(value).as_bytes(),
                    )
                    .await?;
            }
            Ok(Command::Cover(CoverCommand::Open)) => {
                client.publish_state(&ctx, "demo/blind/state", b"open").await?;
            }
            Ok(Command::Cover(CoverCommand::Close)) => {
                client.publish_state(&ctx, "demo/blind/state", b"closed").await?;
            }
            Ok(command) => println!("Ignored command:{:?}", command),
            Err(e) => println!("Bad command on {}: {}", event.topic, e),
        }
    }

    Ok(())
}

async fn remove(client: &Arc<dyn DiscoveryClient>, entities: &[Entity]) -> anyhow::Result<()> {
    let ctx = PublishContext::default();
    for entity in entities {
        client.remove(&ctx, entity).await.context("remove entity")?;
    }
    println!("Remove entities success!");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("------------------------------------------------------------------");
    println!("### announce demo:");
    let config = MqttConfig::new("127.0.0.1", "announce-demo");
    let client = Builder::new(config).build();
    let entities = entities();

    announce(&client, &entities).await?;
    serve_commands(&client, &entities).await?;
    remove(&client, &entities).await?;
    println!("------------------------------------------------------------------");
    Ok(())
}
