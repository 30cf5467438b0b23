//! Fundamental globe-geometry and calendar types.

use std::f64::consts::PI;
use std::fmt;

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::constants::*;

/// A point on the globe. Longitude and latitude in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    pub fn from_degrees(lon: f64, lat: f64) -> Self {
        Self {
            lon: lon.to_radians(),
            lat: lat.to_radians(),
        }
    }

    /// Unit vector on the sphere (x toward lon 0, z toward the north pole).
    pub fn to_unit(self) -> DVec3 {
        DVec3::new(
            self.lat.cos() * self.lon.cos(),
            self.lat.cos() * self.lon.sin(),
            self.lat.sin(),
        )
    }

    pub fn from_unit(v: DVec3) -> Self {
        let v = v.normalize();
        Self {
            lon: v.y.atan2(v.x),
            lat: v.z.clamp(-1.0, 1.0).asin(),
        }
    }

    /// Great-circle distance in radians.
    pub fn distance_to(self, other: GeoPoint) -> f64 {
        self.to_unit().angle_between(other.to_unit())
    }

    /// Move along the great circle toward `target` by at most `step` radians.
    /// Returns the new point and whether the target was reached.
    pub fn step_towards(self, target: GeoPoint, step: f64) -> (GeoPoint, bool) {
        let from = self.to_unit();
        let to = target.to_unit();
        let angle = from.angle_between(to);
        if angle <= step || angle < 1e-12 {
            return (target, true);
        }
        let mut axis = from.cross(to);
        if axis.length_squared() < 1e-24 {
            // Antipodal: any great circle through both points will do.
            axis = from.any_orthonormal_vector();
        }
        let rotated = DQuat::from_axis_angle(axis.normalize(), step) * from;
        (GeoPoint::from_unit(rotated), false)
    }
}

/// Convert a range in nautical miles to a great-circle angle in radians.
pub fn nautical_miles_to_radians(nm: f64) -> f64 {
    nm * (1.0 / 60.0) * (PI / 180.0)
}

/// Radians travelled per 5-second tick at `speed` knots.
pub fn radian_speed(speed: f64) -> f64 {
    nautical_miles_to_radians(speed) / TICKS_PER_HOUR
}

/// Highest time boundary crossed by one clock advance, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeTrigger {
    FiveSeconds,
    TenMinutes,
    ThirtyMinutes,
    Hour,
    Day,
    Month,
}

/// In-game calendar time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTime {
    pub year: i32,
    /// 1..=12
    pub month: u32,
    /// 1..=days_in_month
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl Default for GameTime {
    fn default() -> Self {
        Self::new(START_YEAR, START_MONTH, START_DAY, START_HOUR, 0, 0)
    }
}

impl GameTime {
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    pub fn is_leap_year(year: i32) -> bool {
        (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
    }

    pub fn days_in_month(&self) -> u32 {
        let days = MONTH_DAYS[(self.month - 1) as usize];
        if self.month == 2 && Self::is_leap_year(self.year) {
            days + 1
        } else {
            days
        }
    }

    /// Advance the clock by one tick and report the highest boundary crossed.
    pub fn advance(&mut self) -> TimeTrigger {
        let mut trigger = TimeTrigger::FiveSeconds;
        self.second += TICK_SECONDS;

        if self.second >= 60 {
            self.second -= 60;
            self.minute += 1;
            if self.minute % 10 == 0 {
                trigger = TimeTrigger::TenMinutes;
            }
            if self.minute % 30 == 0 {
                trigger = TimeTrigger::ThirtyMinutes;
            }
        }
        if self.minute >= 60 {
            self.minute -= 60;
            self.hour += 1;
            trigger = TimeTrigger::Hour;
        }
        if self.hour >= 24 {
            self.hour -= 24;
            self.day += 1;
            trigger = TimeTrigger::Day;
        }
        if self.day > self.days_in_month() {
            self.day = 1;
            self.month += 1;
            trigger = TimeTrigger::Month;
        }
        if self.month > 12 {
            self.month = 1;
            self.year += 1;
        }
        trigger
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

macro_rules! entity_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub u32);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

entity_id!(
    /// Stable identifier of a UFO.
    UfoId,
    /// Stable identifier of an XCOM craft.
    CraftId,
    /// Stable identifier of an XCOM base.
    BaseId,
    /// Stable identifier of an active alien mission.
    MissionId,
    /// Stable identifier of a mission site.
    SiteId,
    /// Stable identifier of an alien base.
    AlienBaseId,
    /// Stable identifier of a patrol waypoint.
    WaypointId,
    /// Stable identifier of a soldier.
    SoldierId,
);

/// Anything a craft can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum Target {
    Ufo(UfoId),
    Waypoint(WaypointId),
    Base(BaseId),
    MissionSite(SiteId),
    AlienBase(AlienBaseId),
}
