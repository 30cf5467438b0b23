//! Interceptions between XCOM craft and flying UFOs.
//!
//! Dogfights run on host frames, not on the game clock. A batch of queued
//! fights opens together after one globe zoom-in; the clock stays held until
//! every open fight is either finished or minimized, and a zoom-out plays
//! before time resumes.

use serde::{Deserialize, Serialize};

use geoscape_core::components::Craft;
use geoscape_core::constants::*;
use geoscape_core::enums::{Altitude, DogfightOutcome, DogfightStance, UfoStatus, ZoomState};
use geoscape_core::ruleset::Ruleset;
use geoscape_core::state::DogfightView;
use geoscape_core::types::*;

use crate::systems::{alien_missions, TickContext};

/// One interception in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dogfight {
    /// Screen slot, 1..=4.
    pub slot: u8,
    pub craft: CraftId,
    pub ufo: UfoId,
    pub minimized: bool,
    pub stance: DogfightStance,
    /// Abstract range units between the two.
    pub distance: u32,
    /// Frames until the next round.
    pub round_timer: u32,
    pub rounds: u32,
    /// Rounds each craft weapon must wait before firing again.
    pub weapon_cooldowns: Vec<u32>,
    /// Rounds until the UFO fires.
    pub ufo_cooldown: u32,
    pub outcome: Option<DogfightOutcome>,
}

impl Dogfight {
    fn new(slot: u8, craft: CraftId, ufo: UfoId, weapons: usize) -> Self {
        Self {
            slot,
            craft,
            ufo,
            minimized: false,
            stance: DogfightStance::default(),
            distance: DOGFIGHT_START_DISTANCE,
            round_timer: DOGFIGHT_ROUND_FRAMES,
            rounds: 0,
            weapon_cooldowns: vec![0; weapons],
            ufo_cooldown: UFO_FIRE_INTERVAL,
            outcome: None,
        }
    }

    fn view(&self) -> DogfightView {
        DogfightView {
            slot: self.slot,
            craft: self.craft,
            ufo: self.ufo,
            distance: self.distance,
            stance: self.stance,
            minimized: self.minimized,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DogfightCoordinator {
    active: Vec<Dogfight>,
    to_be_started: Vec<(CraftId, UfoId)>,
    zoom: ZoomState,
    zoomed_in: bool,
}

impl DogfightCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active plus queued.
    pub fn total(&self) -> usize {
        self.active.len() + self.to_be_started.len()
    }

    pub fn can_queue(&self) -> bool {
        self.total() < MAX_DOGFIGHTS
    }

    /// Queue an interception. Refused at capacity or if the craft is
    /// already fighting.
    pub fn queue(&mut self, craft: CraftId, ufo: UfoId) -> bool {
        if !self.can_queue() || self.involves_craft(craft) {
            return false;
        }
        self.to_be_started.push((craft, ufo));
        if !self.zoomed_in && !matches!(self.zoom, ZoomState::ZoomingIn { .. }) {
            self.zoom = ZoomState::ZoomingIn {
                frames_left: DOGFIGHT_ZOOM_IN_FRAMES,
            };
        }
        tracing::debug!(target: "geoscape::dogfight", craft = %craft, ufo = %ufo, "dogfight.queued");
        true
    }

    pub fn has_pending(&self) -> bool {
        !self.to_be_started.is_empty()
    }

    /// Open fights that are not minimized.
    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|d| !d.minimized).count()
    }

    /// Whether the game clock must stay stopped.
    pub fn blocks_time(&self) -> bool {
        self.active_count() > 0 || self.has_pending() || self.zoom != ZoomState::Idle
    }

    pub fn zoom(&self) -> ZoomState {
        self.zoom
    }

    pub fn involves_ufo(&self, ufo: UfoId) -> bool {
        self.active.iter().any(|d| d.ufo == ufo) || self.to_be_started.iter().any(|&(_, u)| u == ufo)
    }

    pub fn involves_craft(&self, craft: CraftId) -> bool {
        self.active.iter().any(|d| d.craft == craft)
            || self.to_be_started.iter().any(|&(c, _)| c == craft)
    }

    /// Held in place by an open, non-minimized fight or a pending one.
    /// Minimized fights let both sides keep flying.
    pub fn engages_ufo(&self, ufo: UfoId) -> bool {
        self.active.iter().any(|d| d.ufo == ufo && !d.minimized)
            || self.to_be_started.iter().any(|&(_, u)| u == ufo)
    }

    pub fn engages_craft(&self, craft: CraftId) -> bool {
        self.active.iter().any(|d| d.craft == craft && !d.minimized)
            || self.to_be_started.iter().any(|&(c, _)| c == craft)
    }

    /// Forget every fight involving a craft that no longer exists.
    pub fn drop_craft(&mut self, craft: CraftId) {
        self.active.retain(|d| d.craft != craft);
        self.to_be_started.retain(|&(c, _)| c != craft);
    }

    pub fn minimize(&mut self, slot: u8) -> bool {
        self.with_slot(slot, |d| d.minimized = true)
    }

    pub fn restore(&mut self, slot: u8) -> bool {
        self.with_slot(slot, |d| d.minimized = false)
    }

    pub fn set_stance(&mut self, slot: u8, stance: DogfightStance) -> bool {
        let changed = self.with_slot(slot, |d| d.stance = stance);
        if changed {
            tracing::debug!(target: "geoscape::dogfight", slot, ?stance, "dogfight.stance");
        }
        changed
    }

    /// The craft opens range and breaks off once clear. A minimized fight
    /// breaks off at its next round.
    pub fn disengage(&mut self, slot: u8) -> bool {
        self.set_stance(slot, DogfightStance::Disengage)
    }

    fn with_slot(&mut self, slot: u8, f: impl FnOnce(&mut Dogfight)) -> bool {
        match self.active.iter_mut().find(|d| d.slot == slot) {
            Some(dogfight) => {
                f(dogfight);
                true
            }
            None => false,
        }
    }

    pub fn active(&self) -> &[Dogfight] {
        &self.active
    }

    pub fn views(&self) -> Vec<DogfightView> {
        self.active.iter().map(Dogfight::view).collect()
    }

    fn free_slot(&self) -> u8 {
        (1..=MAX_DOGFIGHTS as u8)
            .find(|slot| self.active.iter().all(|d| d.slot != *slot))
            .unwrap_or(MAX_DOGFIGHTS as u8)
    }
}

/// One host frame of dogfighting: zoom effects, opening queued fights,
/// playing rounds, and settling finished fights.
pub fn update(ctx: &mut TickContext<'_>) {
    // 1. Zoom
    match ctx.dogfights.zoom {
        ZoomState::ZoomingIn { frames_left } if frames_left > 1 => {
            ctx.dogfights.zoom = ZoomState::ZoomingIn {
                frames_left: frames_left - 1,
            };
            return;
        }
        ZoomState::ZoomingIn { .. } => {
            ctx.dogfights.zoom = ZoomState::Idle;
            ctx.dogfights.zoomed_in = true;
        }
        ZoomState::ZoomingOut { frames_left } if frames_left > 1 => {
            ctx.dogfights.zoom = ZoomState::ZoomingOut {
                frames_left: frames_left - 1,
            };
        }
        ZoomState::ZoomingOut { .. } => ctx.dogfights.zoom = ZoomState::Idle,
        ZoomState::Idle => {}
    }

    // 2. Open everything queued since the zoom-in.
    if ctx.dogfights.zoomed_in {
        open_queued(ctx);
    }

    // 3. Rounds
    for index in 0..ctx.dogfights.active.len() {
        if ctx.dogfights.active[index].outcome.is_some() {
            continue;
        }
        let dogfight = &mut ctx.dogfights.active[index];
        dogfight.round_timer = dogfight.round_timer.saturating_sub(1);
        if dogfight.round_timer > 0 {
            continue;
        }
        dogfight.round_timer = DOGFIGHT_ROUND_FRAMES;
        let outcome = if dogfight.minimized && dogfight.stance == DogfightStance::Disengage {
            Some(DogfightOutcome::Disengaged)
        } else if dogfight.minimized {
            check_contact(ctx, index)
        } else {
            play_round(ctx, index)
        };
        ctx.dogfights.active[index].outcome = outcome;
    }

    // 4. Settle
    settle(ctx);

    // 5. Zoom back out once nothing holds the clock.
    let coordinator = &mut *ctx.dogfights;
    if coordinator.zoomed_in && coordinator.active_count() == 0 && !coordinator.has_pending() {
        coordinator.zoomed_in = false;
        coordinator.zoom = ZoomState::ZoomingOut {
            frames_left: DOGFIGHT_ZOOM_OUT_FRAMES,
        };
    }
}

fn open_queued(ctx: &mut TickContext<'_>) {
    let queued = std::mem::take(&mut ctx.dogfights.to_be_started);
    for (craft, ufo) in queued {
        let Some(weapons) = ctx.campaign.craft(craft).map(|c| c.weapons.len()) else {
            continue;
        };
        let slot = ctx.dogfights.free_slot();
        tracing::debug!(target: "geoscape::dogfight", slot, craft = %craft, ufo = %ufo, "dogfight.started");
        ctx.dogfights
            .active
            .push(Dogfight::new(slot, craft, ufo, weapons));
    }
}

/// A minimized fight only checks the craft can still see the UFO.
fn check_contact(ctx: &mut TickContext<'_>, index: usize) -> Option<DogfightOutcome> {
    let ruleset = ctx.ruleset;
    let dogfight = &ctx.dogfights.active[index];
    let (Some(craft), Some(ufo)) = (
        ctx.campaign.craft(dogfight.craft),
        ctx.campaign.ufo(dogfight.ufo),
    ) else {
        return Some(DogfightOutcome::Aborted);
    };
    if ufo.status != UfoStatus::Flying {
        return Some(DogfightOutcome::Aborted);
    }
    let range = ruleset
        .craft(&craft.rule)
        .map_or(0.0, |r| nautical_miles_to_radians(r.radar_range));
    if craft.position.distance_to(ufo.position) > range {
        return Some(DogfightOutcome::UfoEscaped);
    }
    None
}

fn play_round(ctx: &mut TickContext<'_>, index: usize) -> Option<DogfightOutcome> {
    let ruleset = ctx.ruleset;
    let level = ctx.campaign.difficulty.level();
    let dogfight = &mut ctx.dogfights.active[index];
    let (Some((bi, ci)), Some(ui)) = (
        ctx.campaign.craft_location(dogfight.craft),
        ctx.campaign.ufo_index(dogfight.ufo),
    ) else {
        return Some(DogfightOutcome::Aborted);
    };
    if ctx.campaign.ufos[ui].status != UfoStatus::Flying {
        return Some(DogfightOutcome::Aborted);
    }
    let craft = &mut ctx.campaign.bases[bi].crafts[ci];
    let ufo = &mut ctx.campaign.ufos[ui];
    let (Some(craft_rule), Some(ufo_rule)) = (ruleset.craft(&craft.rule), ruleset.ufo(&ufo.rule))
    else {
        return Some(DogfightOutcome::Aborted);
    };

    let target = stance_distance(dogfight.stance, craft, ruleset);
    dogfight.distance = step_toward(dogfight.distance, target);
    let holding_fire = matches!(
        dogfight.stance,
        DogfightStance::Standoff | DogfightStance::Disengage
    );

    for (wi, weapon) in craft.weapons.iter_mut().enumerate() {
        let Some(rule) = ruleset.craft_weapon(&weapon.rule) else {
            continue;
        };
        let Some(cooldown) = dogfight.weapon_cooldowns.get_mut(wi) else {
            continue;
        };
        if *cooldown > 0 {
            *cooldown -= 1;
            continue;
        }
        if holding_fire || weapon.ammo == 0 || rule.range < dogfight.distance {
            continue;
        }
        weapon.ammo -= 1;
        *cooldown = rule.reload;
        if ctx.rng.percent(rule.accuracy) {
            let power = rule.power as i32;
            ufo.damage += ctx.rng.generate(power / 2, power) as u32;
        }
    }

    dogfight.ufo_cooldown = dogfight.ufo_cooldown.saturating_sub(1);
    if dogfight.ufo_cooldown == 0 {
        dogfight.ufo_cooldown = UFO_FIRE_INTERVAL;
        if ufo_rule.weapon_power > 0
            && dogfight.distance <= ufo_rule.weapon_range
            && ctx.rng.percent(UFO_HIT_CHANCE + UFO_HIT_CHANCE_PER_LEVEL * level)
        {
            craft.damage += ctx.rng.generate(0, ufo_rule.weapon_power as i32) as u32;
        }
    }
    dogfight.rounds += 1;

    if ufo_rule.max_damage > 0 && ufo.damage >= ufo_rule.max_damage {
        Some(DogfightOutcome::UfoDestroyed)
    } else if ufo_rule.max_damage > 0 && ufo.damage >= ufo_rule.max_damage / 2 {
        Some(DogfightOutcome::UfoCrashed)
    } else if craft.is_destroyed(craft_rule) {
        Some(DogfightOutcome::CraftDestroyed)
    } else if dogfight.stance == DogfightStance::Disengage
        && dogfight.distance > DOGFIGHT_ESCAPE_DISTANCE
    {
        Some(DogfightOutcome::Disengaged)
    } else if ufo_rule.break_off_time > 0
        && dogfight.rounds * DOGFIGHT_ROUND_SECONDS >= ufo_rule.break_off_time
    {
        Some(DogfightOutcome::UfoEscaped)
    } else if !craft.has_ammo() {
        Some(DogfightOutcome::Disengaged)
    } else {
        None
    }
}

/// Distance the craft tries to hold under `stance`. Range-based stances
/// fall back to standoff once every weapon is dry.
fn stance_distance(stance: DogfightStance, craft: &Craft, ruleset: &Ruleset) -> u32 {
    let armed: Vec<u32> = craft
        .weapons
        .iter()
        .filter(|w| w.ammo > 0)
        .filter_map(|w| ruleset.craft_weapon(&w.rule))
        .map(|r| r.range)
        .collect();
    match stance {
        DogfightStance::Standoff => DOGFIGHT_STANDOFF_DISTANCE,
        DogfightStance::Cautious => armed
            .iter()
            .max()
            .copied()
            .unwrap_or(DOGFIGHT_STANDOFF_DISTANCE),
        DogfightStance::Standard => armed
            .iter()
            .min()
            .copied()
            .unwrap_or(DOGFIGHT_STANDOFF_DISTANCE),
        DogfightStance::Aggressive => DOGFIGHT_AGGRESSIVE_DISTANCE,
        DogfightStance::Disengage => DOGFIGHT_DISENGAGE_DISTANCE,
    }
}

/// One round of movement. Range opens faster than it closes.
fn step_toward(distance: u32, target: u32) -> u32 {
    if distance < target {
        (distance + DOGFIGHT_RETREAT_STEP).min(target)
    } else {
        distance.saturating_sub(DOGFIGHT_APPROACH_STEP).max(target)
    }
}

/// Apply every finished fight to the campaign and close it.
fn settle(ctx: &mut TickContext<'_>) {
    let ruleset = ctx.ruleset;
    let finished: Vec<(CraftId, UfoId, DogfightOutcome)> = ctx
        .dogfights
        .active
        .iter()
        .filter_map(|d| d.outcome.map(|o| (d.craft, d.ufo, o)))
        .collect();
    if finished.is_empty() {
        return;
    }
    ctx.dogfights.active.retain(|d| d.outcome.is_none());

    for (craft_id, ufo_id, outcome) in finished {
        tracing::debug!(target: "geoscape::dogfight", craft = %craft_id, ufo = %ufo_id, ?outcome, "dogfight.ended");
        let mut shot_down = None;
        if let Some(ufo) = ctx.campaign.ufo_mut(ufo_id) {
            let score = ruleset.ufo(&ufo.rule).map_or(0, |r| r.score);
            let position = ufo.position;
            let mission = ufo.mission;
            match outcome {
                DogfightOutcome::UfoDestroyed => {
                    ufo.set_status(UfoStatus::Destroyed);
                    shot_down = Some((mission, position, score * 2));
                }
                DogfightOutcome::UfoCrashed => {
                    ufo.set_status(UfoStatus::Crashed);
                    ufo.altitude = Altitude::Ground;
                    ufo.destination = ufo.position;
                    ufo.detected = true;
                    let hours = CRASH_SITE_MIN_HOURS
                        + ctx.rng.generate(0, CRASH_SITE_EXTRA_HOURS as i32) as u32;
                    ufo.seconds_remaining = hours * 3600;
                    shot_down = Some((mission, position, score));
                }
                _ => {}
            }
        }
        if let Some((mission, position, points)) = shot_down {
            ctx.campaign.add_xcom_activity(ruleset, position, points);
            alien_missions::ufo_shot_down(ctx, mission);
        }

        let Some(craft) = ctx.campaign.craft_mut(craft_id) else {
            continue;
        };
        craft.in_dogfight = false;
        let Some(rule) = ruleset.craft(&craft.rule) else {
            continue;
        };
        match outcome {
            // Stay on the wreck so a crew can land.
            DogfightOutcome::UfoCrashed | DogfightOutcome::Aborted => {}
            DogfightOutcome::CraftDestroyed => {}
            DogfightOutcome::UfoDestroyed
            | DogfightOutcome::UfoEscaped
            | DogfightOutcome::Disengaged => craft.return_to_base(rule),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoscape_core::components::CraftWeapon;

    fn interceptor(ruleset: &Ruleset) -> Craft {
        let rule = ruleset.craft("STR_INTERCEPTOR").unwrap();
        let mut craft = Craft::new(CraftId(1), rule, BaseId(1), GeoPoint::new(0.0, 0.0));
        for name in ["STR_STINGRAY", "STR_CANNON"] {
            craft.weapons.push(CraftWeapon {
                rule: name.to_string(),
                ammo: 1,
                rearming: false,
            });
        }
        craft
    }

    #[test]
    fn capacity_is_four() {
        let mut coordinator = DogfightCoordinator::new();
        for i in 1..=4 {
            assert!(coordinator.queue(CraftId(i), UfoId(i)));
        }
        assert!(!coordinator.can_queue());
        assert!(!coordinator.queue(CraftId(5), UfoId(5)));
        assert_eq!(coordinator.total(), 4);
    }

    #[test]
    fn same_craft_cannot_queue_twice() {
        let mut coordinator = DogfightCoordinator::new();
        assert!(coordinator.queue(CraftId(1), UfoId(1)));
        assert!(!coordinator.queue(CraftId(1), UfoId(2)));
        assert!(coordinator.involves_ufo(UfoId(1)));
        assert!(!coordinator.involves_ufo(UfoId(2)));
    }

    #[test]
    fn first_queue_starts_zoom_and_holds_time() {
        let mut coordinator = DogfightCoordinator::new();
        assert!(!coordinator.blocks_time());
        coordinator.queue(CraftId(1), UfoId(1));
        assert_eq!(
            coordinator.zoom(),
            ZoomState::ZoomingIn {
                frames_left: DOGFIGHT_ZOOM_IN_FRAMES
            }
        );
        assert!(coordinator.blocks_time());
    }

    #[test]
    fn slots_fill_lowest_first() {
        let mut coordinator = DogfightCoordinator::new();
        coordinator.active.push(Dogfight::new(1, CraftId(1), UfoId(1), 0));
        coordinator.active.push(Dogfight::new(3, CraftId(3), UfoId(3), 0));
        assert_eq!(coordinator.free_slot(), 2);
    }

    #[test]
    fn minimized_fights_release_the_clock() {
        let mut coordinator = DogfightCoordinator::new();
        coordinator.active.push(Dogfight::new(1, CraftId(1), UfoId(1), 0));
        coordinator.active.push(Dogfight::new(2, CraftId(2), UfoId(2), 0));
        assert_eq!(coordinator.active_count(), 2);
        assert!(coordinator.minimize(1));
        assert!(coordinator.minimize(2));
        assert!(!coordinator.minimize(4));
        assert_eq!(coordinator.active_count(), 0);
        assert!(!coordinator.blocks_time());
        assert!(!coordinator.engages_craft(CraftId(1)));
        assert!(coordinator.involves_craft(CraftId(1)));
        assert!(coordinator.restore(2));
        assert!(coordinator.blocks_time());
    }

    #[test]
    fn dropping_a_craft_frees_its_slot() {
        let mut coordinator = DogfightCoordinator::new();
        coordinator.active.push(Dogfight::new(1, CraftId(1), UfoId(1), 0));
        coordinator.queue(CraftId(2), UfoId(1));
        coordinator.drop_craft(CraftId(1));
        coordinator.drop_craft(CraftId(2));
        assert_eq!(coordinator.total(), 0);
    }

    #[test]
    fn fifth_fight_is_refused_while_four_are_open() {
        let mut coordinator = DogfightCoordinator::new();
        for i in 1..=4u32 {
            coordinator
                .active
                .push(Dogfight::new(i as u8, CraftId(i), UfoId(i), 0));
        }
        assert!(!coordinator.queue(CraftId(5), UfoId(1)));
        assert!(!coordinator.has_pending());
    }

    #[test]
    fn each_stance_holds_its_own_distance() {
        let ruleset = Ruleset::builtin().unwrap();
        let mut craft = interceptor(&ruleset);
        let held = |craft: &Craft, stance| stance_distance(stance, craft, &ruleset);

        assert_eq!(held(&craft, DogfightStance::Standoff), DOGFIGHT_STANDOFF_DISTANCE);
        assert_eq!(held(&craft, DogfightStance::Cautious), 240);
        assert_eq!(held(&craft, DogfightStance::Standard), 80);
        assert_eq!(held(&craft, DogfightStance::Aggressive), DOGFIGHT_AGGRESSIVE_DISTANCE);
        assert_eq!(held(&craft, DogfightStance::Disengage), DOGFIGHT_DISENGAGE_DISTANCE);

        // Dry weapons no longer count.
        craft.weapons[0].ammo = 0;
        assert_eq!(held(&craft, DogfightStance::Cautious), 80);
        craft.weapons[1].ammo = 0;
        assert_eq!(held(&craft, DogfightStance::Cautious), DOGFIGHT_STANDOFF_DISTANCE);
        assert_eq!(held(&craft, DogfightStance::Standard), DOGFIGHT_STANDOFF_DISTANCE);
    }

    #[test]
    fn range_opens_faster_than_it_closes() {
        assert_eq!(step_toward(640, 560), 600);
        assert_eq!(step_toward(580, 560), 560);
        assert_eq!(step_toward(560, 560), 560);
        assert_eq!(step_toward(640, 800), 720);
        assert_eq!(step_toward(760, 800), 800);
    }

    #[test]
    fn stance_changes_only_reach_open_fights() {
        let mut coordinator = DogfightCoordinator::new();
        coordinator.active.push(Dogfight::new(2, CraftId(1), UfoId(1), 0));
        assert!(coordinator.set_stance(2, DogfightStance::Aggressive));
        assert!(!coordinator.set_stance(1, DogfightStance::Aggressive));
        assert!(coordinator.disengage(2));
        assert_eq!(coordinator.views()[0].stance, DogfightStance::Disengage);
        assert_eq!(coordinator.active()[0].outcome, None);
    }
}
