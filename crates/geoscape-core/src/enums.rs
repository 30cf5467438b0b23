//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// UFO lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UfoStatus {
    #[default]
    Flying,
    Landed,
    Crashed,
    /// Terminal. Reaped once nothing references the UFO.
    Destroyed,
}

impl UfoStatus {
    /// Whether a UFO in this status may move to `next`.
    pub fn can_become(self, next: UfoStatus) -> bool {
        use UfoStatus::*;
        match (self, next) {
            (Destroyed, _) => false,
            (_, Destroyed) => true,
            (Flying, Landed) | (Landed, Flying) | (Flying, Crashed) => true,
            (a, b) => a == b,
        }
    }
}

/// XCOM craft status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CraftStatus {
    #[default]
    Ready,
    /// Airborne, away from its base.
    Out,
    Refuelling,
    Repairs,
    Rearming,
}

/// Flight altitude band of a UFO.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Altitude {
    Ground,
    VeryLow,
    Low,
    #[default]
    High,
    VeryHigh,
}

impl Altitude {
    /// Visibility modifier contributed by the altitude band.
    pub fn visibility(self) -> i32 {
        match self {
            Altitude::Ground => -30,
            Altitude::VeryLow => -20,
            Altitude::Low => -10,
            Altitude::High => 0,
            Altitude::VeryHigh => -10,
        }
    }
}

/// UFO hull size class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UfoSize {
    VerySmall,
    Small,
    #[default]
    Medium,
    Large,
    VeryLarge,
}

impl UfoSize {
    /// Visibility modifier contributed by hull size.
    pub fn visibility(self) -> i32 {
        match self {
            UfoSize::VerySmall => -30,
            UfoSize::Small => -15,
            UfoSize::Medium => 0,
            UfoSize::Large => 15,
            UfoSize::VeryLarge => 30,
        }
    }
}

/// What an alien mission is trying to achieve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionObjective {
    /// Fly around scoring points.
    #[default]
    Score,
    /// Turn a country; never ends on its own.
    Infiltration,
    /// Hunt and assault XCOM bases.
    Retaliation,
    /// Create a mission site (terror, etc.).
    Site,
    /// Found an alien base.
    Base,
    /// Resupply an existing alien base.
    Supply,
}

/// Campaign difficulty.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Difficulty {
    #[default]
    Beginner,
    Experienced,
    Veteran,
    Genius,
    Superhuman,
}

impl Difficulty {
    pub fn level(self) -> i32 {
        self as i32
    }
}

/// Geoscape speed selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeSpeed {
    #[default]
    FiveSeconds,
    OneMinute,
    FiveMinutes,
    ThirtyMinutes,
    OneHour,
    OneDay,
}

impl TimeSpeed {
    /// Number of 5-second ticks processed per host frame.
    pub fn ticks(self) -> u32 {
        match self {
            TimeSpeed::FiveSeconds => 1,
            TimeSpeed::OneMinute => 12,
            TimeSpeed::FiveMinutes => 60,
            TimeSpeed::ThirtyMinutes => 360,
            TimeSpeed::OneHour => 720,
            TimeSpeed::OneDay => 17280,
        }
    }
}

/// Outcome of one hourly production step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductionProgress {
    #[default]
    NotComplete,
    Complete,
    NotEnoughMoney,
    NotEnoughMaterials,
}

/// How a UFO was picked up by radar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionKind {
    #[default]
    None,
    Conventional,
    Hyperwave,
}

/// Globe animation state shared by all dogfights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoomState {
    #[default]
    Idle,
    ZoomingIn { frames_left: u32 },
    ZoomingOut { frames_left: u32 },
}

/// How a craft fights a UFO; each stance sets the distance the craft holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DogfightStance {
    /// Hold outside UFO weapon range without firing.
    #[default]
    Standoff,
    /// Hold at the longest range of any armed weapon.
    Cautious,
    /// Close to the shortest range of any armed weapon.
    Standard,
    Aggressive,
    /// Open range and break off once clear.
    Disengage,
}

/// How a dogfight ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DogfightOutcome {
    UfoDestroyed,
    UfoCrashed,
    UfoEscaped,
    CraftDestroyed,
    Disengaged,
    /// The UFO or craft vanished from the campaign mid-fight.
    Aborted,
}
