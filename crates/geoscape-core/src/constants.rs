//! Simulation constants and tuning parameters.

/// Seconds of game time per simulation tick.
pub const TICK_SECONDS: u32 = 5;

/// Ticks per hour of game time.
pub const TICKS_PER_HOUR: f64 = 720.0;

// --- Calendar ---

/// Campaign start date.
pub const START_YEAR: i32 = 1999;
pub const START_MONTH: u32 = 1;
pub const START_DAY: u32 = 1;
pub const START_HOUR: u32 = 12;

/// Days per month in a non-leap year, January first.
pub const MONTH_DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Days of the month on which an autosave is requested.
pub const AUTOSAVE_DAYS: [u32; 2] = [10, 20];

// --- Dogfights ---

/// Maximum simultaneous dogfights, active plus queued.
pub const MAX_DOGFIGHTS: usize = 4;

/// Host frames spent on the globe zoom-in before a batch of dogfights opens.
pub const DOGFIGHT_ZOOM_IN_FRAMES: u32 = 10;

/// Host frames spent on the globe zoom-out after the last dogfight closes.
pub const DOGFIGHT_ZOOM_OUT_FRAMES: u32 = 10;

/// Host frames between two dogfight rounds.
pub const DOGFIGHT_ROUND_FRAMES: u32 = 3;

/// Starting distance between craft and UFO when a dogfight opens (abstract units).
pub const DOGFIGHT_START_DISTANCE: u32 = 640;

/// Distance the craft closes per round.
pub const DOGFIGHT_APPROACH_STEP: u32 = 40;

/// Distance the craft opens per round.
pub const DOGFIGHT_RETREAT_STEP: u32 = 80;

/// Distances held by the standoff, aggressive and disengage stances.
pub const DOGFIGHT_STANDOFF_DISTANCE: u32 = 560;
pub const DOGFIGHT_AGGRESSIVE_DISTANCE: u32 = 64;
pub const DOGFIGHT_DISENGAGE_DISTANCE: u32 = 800;

/// A disengaging craft is clear of the UFO beyond this distance.
pub const DOGFIGHT_ESCAPE_DISTANCE: u32 = 640;

/// Rounds between two UFO shots.
pub const UFO_FIRE_INTERVAL: u32 = 4;

/// Base chance the UFO hits the craft.
pub const UFO_HIT_CHANCE: i32 = 60;

/// Extra UFO hit chance per difficulty level.
pub const UFO_HIT_CHANCE_PER_LEVEL: i32 = 5;

/// Seconds of combat represented by one dogfight round.
pub const DOGFIGHT_ROUND_SECONDS: u32 = 5;

/// Minimum and random extra hours a crashed UFO stays on the ground.
pub const CRASH_SITE_MIN_HOURS: u32 = 24;
pub const CRASH_SITE_EXTRA_HOURS: u32 = 72;

// --- Detection ---

/// Trajectory zone used by retaliation assault runs.
pub const RETALIATION_APPROACH_ZONE: usize = 5;

/// Trajectory used by retaliation UFOs heading straight for a marked base.
pub const RETALIATION_ASSAULT_RUN: &str = "__RETALIATION_ASSAULT_RUN";

/// UFO type flown on retaliation assault runs.
pub const RETALIATION_ASSAULT_UFO: &str = "STR_BATTLESHIP";

/// Base chance (percent) for a craft to spot an alien base in sight range.
pub const ALIEN_BASE_SPOT_CHANCE: i32 = 50;

/// Chance reduction per difficulty level for spotting alien bases.
pub const ALIEN_BASE_SPOT_PENALTY: i32 = 10;

/// Monthly chance (percent) that one hidden alien base is revealed.
pub const ALIEN_BASE_REVEAL_CHANCE: i32 = 20;

// --- Alien bases ---

/// Alien activity points an alien base adds to its region each day.
pub const ALIEN_BASE_DAILY_POINTS: i32 = 5;

/// Supply missions fire when `generate(0, 100)` lands below this value.
pub const ALIEN_BASE_SUPPLY_ODDS: i32 = 6;

/// XCOM points for destroying an alien base.
pub const ALIEN_BASE_DESTROYED_POINTS: i32 = 500;

// --- Mission sites ---

/// Seconds removed from a mission site's timer every half hour.
pub const SITE_TICK_SECONDS: u32 = 30 * 60;

/// Minimum and random extra hours a terror site stays open.
pub const SITE_MIN_HOURS: u32 = 4;
pub const SITE_EXTRA_HOURS: u32 = 6;

// --- Economy ---

/// Monthly upkeep per soldier.
pub const SOLDIER_SALARY: i64 = 20_000;

/// Activity difference that moves a country's funding.
pub const FUNDING_SATISFACTION_MARGIN: i32 = 30;

/// Percentage band for monthly funding changes.
pub const FUNDING_CHANGE_MIN: i32 = 5;
pub const FUNDING_CHANGE_MAX: i32 = 20;

// --- Soldiers ---

/// Psi skill cap reached by training.
pub const PSI_SKILL_CAP: i32 = 100;

/// Psi skill gained per day of anytime training.
pub const PSI_DAILY_GAIN: (i32, i32) = (1, 3);

/// Psi skill gained per month of monthly training.
pub const PSI_MONTHLY_GAIN: (i32, i32) = (5, 15);
