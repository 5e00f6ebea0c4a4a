use crate::models::request::VehicleType;

/// Per-vehicle pricing row. Rates are in PHP; the average speed is a fixed
/// planning constant, not a measurement.
#[derive(Debug, Clone, Copy)]
pub struct PricingRate {
    pub base_rate: f64,
    pub per_km: f64,
    pub per_minute: f64,
    pub avg_speed_kmh: f64,
}

const TRICYCLE: PricingRate = PricingRate {
    base_rate: 20.0,
    per_km: 10.0,
    per_minute: 2.0,
    avg_speed_kmh: 30.0,
};

const MOTORCYCLE: PricingRate = PricingRate {
    base_rate: 15.0,
    per_km: 8.0,
    per_minute: 1.0,
    avg_speed_kmh: 50.0,
};

const CAR: PricingRate = PricingRate {
    base_rate: 50.0,
    per_km: 12.0,
    per_minute: 2.0,
    avg_speed_kmh: 70.0,
};

const VAN: PricingRate = PricingRate {
    base_rate: 100.0,
    per_km: 15.0,
    per_minute: 3.0,
    avg_speed_kmh: 60.0,
};

pub fn rate_for(vehicle_type: VehicleType) -> &'static PricingRate {
    match vehicle_type {
        VehicleType::Tricycle => &TRICYCLE,
        VehicleType::Motorcycle => &MOTORCYCLE,
        VehicleType::Car => &CAR,
        VehicleType::Van => &VAN,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FareQuote {
    pub fare: u32,
    pub minutes: u32,
}

pub fn estimated_minutes(vehicle_type: VehicleType, distance_km: f64) -> u32 {
    let rate = rate_for(vehicle_type);
    (distance_km.max(0.0) / rate.avg_speed_kmh * 60.0).ceil() as u32
}

/// Pure fare quote for a trip of the given length. Never cheaper than the
/// base rate.
pub fn estimate(vehicle_type: VehicleType, distance_km: f64) -> FareQuote {
    let rate = rate_for(vehicle_type);
    let minutes = estimated_minutes(vehicle_type, distance_km);

    let raw = rate.base_rate
        + rate.per_km * distance_km.max(0.0)
        + rate.per_minute * f64::from(minutes);
    let fare = raw.round().max(rate.base_rate) as u32;

    FareQuote { fare, minutes }
}
