//! Payload types and transforms of the demonstration scenarios.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Timelike, Utc};
use rand::Rng;
use sensor::source::Seeder;
use serde::Serialize;

/// Uniform noise in `[-half_width, half_width)`.
fn noise(half_width: f64) -> f64 {
    (rand::thread_rng().r#gen::<f64>() - 0.5) * 2.0 * half_width
}

/// Fractional hour of the day, e.g. `14.5` for 14:30.
fn hour_of_day(timestamp: DateTime<Utc>) -> f64 {
    f64::from(timestamp.hour()) + f64::from(timestamp.minute()) / 60.0
}

#[derive(Debug, Clone, Serialize)]
pub struct TemperatureReading {
    pub celsius: f64,
    pub fahrenheit: f64,
    pub humidity_percent: f64,
    pub location: &'static str,
}

/// Seeded base temperature plus a daily cycle peaking in the afternoon.
pub fn temperature_reading(input: f64, timestamp: DateTime<Utc>) -> TemperatureReading {
    let radian = hour_of_day(timestamp) / 24.0 * 2.0 * PI;
    let diurnal = 5.0 * (radian - PI / 2.0).sin();

    let celsius = input + diurnal + noise(0.5);

    TemperatureReading {
        celsius,
        fahrenheit: celsius * 9.0 / 5.0 + 32.0,
        humidity_percent: (70.0 - celsius).clamp(30.0, 90.0),
        location: "Server Room A",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IotReading {
    pub device_id: String,
    pub battery_percent: f64,
    pub signal_strength_dbm: i32,
    pub temperature_celsius: f64,
    pub status: &'static str,
    pub last_seen_unix: i64,
}

/// The seeded value is the device activity level in `[0, 1)`.
pub fn iot_reading(input: f64, timestamp: DateTime<Utc>) -> IotReading {
    let battery = 100.0 - input * 30.0;

    let status = match battery {
        b if b > 80.0 => "excellent",
        b if b > 50.0 => "good",
        b if b > 20.0 => "low",
        _ => "critical",
    };

    IotReading {
        device_id: format!("iot-{:04}", (input * 9999.0) as i64),
        battery_percent: battery,
        signal_strength_dbm: -30 - (input * 40.0) as i32,
        temperature_celsius: 25.0 + input * 15.0,
        status,
        last_seen_unix: timestamp.timestamp(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MachineMetrics {
    pub machine_id: String,
    pub vibration_mm_s: f64,
    pub pressure_bar: f64,
    pub rpm: i32,
    pub temperature_celsius: f64,
    pub efficiency_percent: f64,
    pub status: &'static str,
}

/// The seeded value is the wear factor of the machine.
pub fn machine_metrics(input: f64, _: DateTime<Utc>) -> MachineMetrics {
    let status = match input {
        w if w > 0.8 => "critical_maintenance",
        w if w > 0.6 => "warning",
        w if w > 0.3 => "monitor",
        _ => "normal",
    };

    MachineMetrics {
        machine_id: format!("CNC-{:03}", (input * 999.0) as i64),
        vibration_mm_s: input * 8.0,
        pressure_bar: 2.5 + input * 1.5 + noise(0.25),
        rpm: 1800 - (input * 400.0) as i32,
        temperature_celsius: 25.0 + input * 30.0,
        efficiency_percent: (100.0 - input * 40.0).max(0.0),
        status,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WeatherData {
    pub station_id: String,
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
    pub pressure_hpa: f64,
    pub wind_speed_kmh: f64,
    pub wind_direction_degrees: i32,
    pub conditions: &'static str,
    pub timestamp_unix: i64,
}

fn weather_conditions(
    temperature: f64,
    humidity: f64,
    pressure: f64,
    wind_speed: f64,
) -> &'static str {
    if temperature < 0.0 {
        "snow"
    } else if humidity > 80.0 && temperature < 15.0 {
        "fog"
    } else if humidity > 70.0 && pressure < 1000.0 {
        "rain"
    } else if wind_speed > 25.0 {
        "windy"
    } else {
        "clear"
    }
}

/// The seeded value is a variability factor centered on `0.5`.
pub fn weather_data(input: f64, timestamp: DateTime<Utc>) -> WeatherData {
    let hour = f64::from(timestamp.hour());
    let day_of_year = f64::from(timestamp.ordinal());

    let seasonal = 15.0 + 10.0 * ((day_of_year / 365.0) * 2.0 * PI - PI / 2.0).sin();
    let daily = 5.0 * ((hour / 24.0) * 2.0 * PI - PI / 2.0).sin();
    let temperature = seasonal + daily + (input - 0.5) * 10.0;

    let humidity = (70.0 - temperature + noise(10.0)).clamp(20.0, 95.0);
    let pressure = 1013.25 + (input - 0.5) * 50.0 + noise(5.0);
    let wind_speed = (10.0 + input * 20.0 + noise(2.5)).max(0.0);
    let wind_direction = (rand::thread_rng().r#gen::<f64>() * 360.0) as i32;

    WeatherData {
        station_id: format!("WX-{:04}", (input * 9999.0) as i64),
        temperature_celsius: temperature,
        humidity_percent: humidity,
        pressure_hpa: pressure,
        wind_speed_kmh: wind_speed,
        wind_direction_degrees: wind_direction,
        conditions: weather_conditions(temperature, humidity, pressure, wind_speed),
        timestamp_unix: timestamp.timestamp(),
    }
}

/// Market sentiment in `[0, 1]`: a slow cycle and a slower trend with some noise.
#[derive(Debug, Default)]
pub struct MarketSeeder {
    cycle: f64,
}

impl MarketSeeder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Seeder for MarketSeeder {
    fn generate(&mut self) -> f64 {
        self.cycle += 0.1;

        let cycle = (self.cycle * 0.1).sin() * 0.3;
        let trend = (self.cycle * 0.01).sin() * 0.2;

        (0.5 + cycle + noise(0.1) + trend).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FinancialMetrics {
    pub symbol: &'static str,
    pub price_usd: f64,
    pub volume_24h: i64,
    pub change_percent_24h: f64,
    pub volatility_index: f64,
    pub trend: &'static str,
    pub timestamp_unix: i64,
}

/// The seeded value is market sentiment, `0` bearish and `1` bullish.
pub fn financial_metrics(input: f64, timestamp: DateTime<Utc>) -> FinancialMetrics {
    let seconds_of_day = timestamp.timestamp().rem_euclid(86_400) as f64;
    let intraday = (seconds_of_day * 2.0 * PI / 86_400.0).sin() * 20.0;
    let price = 100.0 + input * 400.0 + intraday + noise(5.0);

    let mut rng = rand::thread_rng();
    let volume = ((1.0 - input) * 1_000_000.0 + rng.r#gen::<f64>() * 500_000.0) as i64;
    let volatility = (input - 0.5).abs() * 2.0 + rng.r#gen::<f64>() * 0.5;

    let trend = match input {
        s if s > 0.7 => "strong_bull",
        s if s > 0.6 => "bull",
        s if s > 0.4 => "sideways",
        s if s > 0.3 => "bear",
        _ => "strong_bear",
    };

    FinancialMetrics {
        symbol: "CRYPTO-USD",
        price_usd: price,
        volume_24h: volume,
        change_percent_24h: (input - 0.5) * 20.0,
        volatility_index: volatility,
        trend,
        timestamp_unix: timestamp.timestamp(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn iot_status_follows_battery_level() {
        let now = Utc::now();

        assert_eq!(iot_reading(0.1, now).status, "excellent");
        assert_eq!(iot_reading(0.9, now).status, "good");
        assert_eq!(iot_reading(0.1, now).device_id, "iot-0999");
        assert_eq!(iot_reading(0.5, now).signal_strength_dbm, -50);
    }

    #[test]
    fn machine_wear_degrades_metrics() {
        let now = Utc::now();
        let fresh = machine_metrics(0.1, now);
        let worn = machine_metrics(0.9, now);

        assert_eq!(fresh.status, "normal");
        assert_eq!(worn.status, "critical_maintenance");
        assert!(worn.rpm < fresh.rpm);
        assert!(worn.efficiency_percent < fresh.efficiency_percent);
        assert_eq!(machine_metrics(3.0, now).efficiency_percent, 0.0);
    }

    #[test]
    fn temperature_humidity_is_clamped() {
        let noon = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let hot = temperature_reading(80.0, noon);
        assert_eq!(hot.humidity_percent, 30.0);

        let cold = temperature_reading(-80.0, noon);
        assert_eq!(cold.humidity_percent, 90.0);
        assert!((cold.fahrenheit - (cold.celsius * 1.8 + 32.0)).abs() < 1e-9);
    }

    #[test]
    fn weather_conditions_priority() {
        assert_eq!(weather_conditions(-1.0, 90.0, 990.0, 30.0), "snow");
        assert_eq!(weather_conditions(10.0, 85.0, 990.0, 30.0), "fog");
        assert_eq!(weather_conditions(20.0, 75.0, 990.0, 30.0), "rain");
        assert_eq!(weather_conditions(20.0, 50.0, 1013.0, 30.0), "windy");
        assert_eq!(weather_conditions(20.0, 50.0, 1013.0, 10.0), "clear");
    }

    #[test]
    fn market_seeder_stays_in_unit_interval() {
        let mut seeder = MarketSeeder::new();

        for _ in 0..10_000 {
            let value = seeder.generate();
            assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn financial_trend_follows_sentiment() {
        let now = Utc::now();

        assert_eq!(financial_metrics(0.9, now).trend, "strong_bull");
        assert_eq!(financial_metrics(0.5, now).trend, "sideways");
        assert_eq!(financial_metrics(0.1, now).trend, "strong_bear");
        assert_eq!(financial_metrics(1.0, now).change_percent_24h, 10.0);
    }
}
