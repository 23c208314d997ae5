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

//! Units of measurement understood by home assistant.

use paste::paste;
use serde::Serialize;

macro_rules! define_units {
    ($($kind:ident { $($variant:ident => $symbol:literal),+ $(,)? }),+ $(,)?) => {
        paste! {
            $(
                #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
                pub enum [<$kind Unit>] {
                    $(
                        #[serde(rename = $symbol)]
                        $variant,
                    )+
                }

                impl [<$kind Unit>] {
                    pub fn as_str(&self) -> &'static str {
                        match self {
                            $(Self::$variant => $symbol,)+
                        }
                    }
                }

                impl From<[<$kind Unit>]> for Unit {
                    fn from(unit: [<$kind Unit>]) -> Self {
                        Unit::$kind(unit)
                    }
                }
            )+

            /// Unit of measurement, serialized as the bare unit symbol.
            #[derive(Clone, Debug, PartialEq, Eq, Serialize)]
            #[serde(untagged)]
            pub enum Unit {
                $($kind([<$kind Unit>]),)+
                /// Any unit home assistant has no constant for.
                Custom(String),
            }

            impl Unit {
                pub fn as_str(&self) -> &str {
                    match self {
                        $(Unit::$kind(unit) => unit.as_str(),)+
                        Unit::Custom(unit) => unit.as_str(),
                    }
                }
            }
        }
    };
}

define_units! {
    Percentage {
        Percentage => "%",
    },
    Temperature {
        Celsius => "°C",
        Fahrenheit => "°F",
        Kelvin => "K",
    },
    Power {
        Milliwatt => "mW",
        Watt => "W",
        Kilowatt => "kW",
        Megawatt => "MW",
    },
    Energy {
        WattHour => "Wh",
        KilowattHour => "kWh",
        MegawattHour => "MWh",
        Megajoule => "MJ",
        Gigajoule => "GJ",
    },
    Voltage {
        Millivolt => "mV",
        Volt => "V",
    },
    Current {
        Milliampere => "mA",
        Ampere => "A",
    },
    Time {
        Microseconds => "μs",
        Milliseconds => "ms",
        Seconds => "s",
        Minutes => "min",
        Hours => "h",
        Days => "d",
    },
    Distance {
        Millimeters => "mm",
        Centimeters => "cm",
        Meters => "m",
        Kilometers => "km",
        Inches => "in",
        Feet => "ft",
        Yards => "yd",
        Miles => "mi",
    },
    Pressure {
        Pascal => "Pa",
        Hectopascal => "hPa",
        Kilopascal => "kPa",
        Bar => "bar",
        Centibar => "cbar",
        Millibar => "mbar",
        MillimeterOfMercury => "mmHg",
        InchOfMercury => "inHg",
        Psi => "psi",
    },
    Speed {
        MetersPerSecond => "m/s",
        KilometersPerHour => "km/h",
        MilesPerHour => "mph",
        Knots => "kn",
        FeetPerSecond => "ft/s",
    },
    DataSize {
        Bytes => "B",
        Kilobytes => "kB",
        Megabytes => "MB",
        Gigabytes => "GB",
        Kibibytes => "KiB",
        Mebibytes => "MiB",
        Gibibytes => "GiB",
    },
    SignalStrength {
        Decibels => "dB",
        DecibelsMilliwatt => "dBm",
    },
    Frequency {
        Hertz => "Hz",
        Kilohertz => "kHz",
        Megahertz => "MHz",
        Gigahertz => "GHz",
    },
    Illuminance {
        Lux => "lx",
    },
    Volume {
        Milliliters => "mL",
        Liters => "L",
        CubicMeters => "m³",
        Gallons => "gal",
    },
    Mass {
        Milligrams => "mg",
        Grams => "g",
        Kilograms => "kg",
        Ounces => "oz",
        Pounds => "lb",
    },
}

impl Unit {
    pub fn custom(unit: impl Into<String>) -> Self {
        Unit::Custom(unit.into())
    }
}
