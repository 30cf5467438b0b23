//! Geoscape engine: the time advancer.
//!
//! `GeoscapeEngine` owns the campaign, processes player commands, advances
//! the clock in 5-second ticks, and produces `GeoscapeSnapshot`s. Completely
//! headless, enabling deterministic testing.

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use geoscape_core::commands::PlayerCommand;
use geoscape_core::constants::ALIEN_BASE_DESTROYED_POINTS;
use geoscape_core::enums::{CraftStatus, Difficulty, TimeSpeed, UfoStatus};
use geoscape_core::error::ConfigError;
use geoscape_core::events::Popup;
use geoscape_core::ruleset::Ruleset;
use geoscape_core::state::{GeoscapeSnapshot, HandlerCounts};
use geoscape_core::types::{CraftId, Target, TimeTrigger};

use crate::campaign::{BattleRequest, Campaign};
use crate::dogfight::{self, DogfightCoordinator};
use crate::persistence::SaveData;
use crate::popups::PopupQueue;
use crate::rng::SimRng;
use crate::scenario;
use crate::systems::{self, mission_scheduler, snapshot::FrameState, TickContext};

/// Player-facing rule toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameOptions {
    /// Every UFO looks for bases, not only retaliation missions, and every
    /// base seen is marked.
    pub aggressive_retaliation: bool,
    /// Psi labs train daily instead of once a month.
    pub anytime_psi_training: bool,
    pub autosave: bool,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            aggressive_retaliation: false,
            anytime_psi_training: false,
            autosave: true,
        }
    }
}

/// Configuration for starting a new campaign.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// RNG seed for determinism. Same seed = same campaign.
    pub seed: u64,
    pub options: GameOptions,
    pub speed: TimeSpeed,
    pub difficulty: Difficulty,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            options: GameOptions::default(),
            speed: TimeSpeed::default(),
            difficulty: Difficulty::default(),
        }
    }
}

pub struct GeoscapeEngine {
    campaign: Campaign,
    ruleset: Ruleset,
    options: GameOptions,
    rng: SimRng,
    seed: u64,
    speed: TimeSpeed,
    paused: bool,
    popups: PopupQueue,
    dogfights: DogfightCoordinator,
    command_queue: VecDeque<PlayerCommand>,
    counts: HandlerCounts,
}

impl GeoscapeEngine {
    /// Start a new campaign and schedule the first month's missions.
    pub fn new_game(config: SimConfig, ruleset: Ruleset) -> Result<Self, ConfigError> {
        let campaign = scenario::new_campaign(&ruleset, config.difficulty)?;
        let mut engine = Self::with_campaign(config, ruleset, campaign);
        mission_scheduler::determine_alien_missions(&mut engine.context())?;
        Ok(engine)
    }

    /// Wrap an existing campaign without scheduling anything.
    pub fn with_campaign(config: SimConfig, ruleset: Ruleset, campaign: Campaign) -> Self {
        Self {
            campaign,
            ruleset,
            options: config.options,
            rng: SimRng::new(config.seed),
            seed: config.seed,
            speed: config.speed,
            paused: false,
            popups: PopupQueue::default(),
            dogfights: DogfightCoordinator::new(),
            command_queue: VecDeque::new(),
            counts: HandlerCounts::default(),
        }
    }

    /// Resume a saved campaign. The RNG continues from a seed derived from
    /// the save's seed and campaign month.
    pub fn from_save(save: SaveData, ruleset: Ruleset, options: GameOptions) -> Self {
        let SaveData { mut campaign, seed, .. } = save;
        for base in &mut campaign.bases {
            for craft in &mut base.crafts {
                craft.in_dogfight = false;
                craft.landing_pending = false;
            }
        }
        let config = SimConfig {
            seed,
            options,
            ..SimConfig::default()
        };
        let mut engine = Self::with_campaign(config, ruleset, campaign);
        engine
            .rng
            .reseed(seed.wrapping_add(engine.campaign.months_passed as u64));
        engine
    }

    pub fn save_data(&self, slot: &str) -> SaveData {
        SaveData {
            campaign: self.campaign.clone(),
            seed: self.seed,
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs()),
            slot_name: slot.to_string(),
        }
    }

    /// Queue a player command for processing at the next frame.
    pub fn queue_command(&mut self, command: PlayerCommand) {
        self.command_queue.push_back(command);
    }

    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = PlayerCommand>) {
        self.command_queue.extend(commands);
    }

    /// One host frame: commands, dogfights, then as many ticks as the speed
    /// allows unless something holds the clock.
    pub fn frame(&mut self) -> Result<GeoscapeSnapshot, ConfigError> {
        self.process_commands();
        dogfight::update(&mut self.context());
        if !self.is_paused() {
            self.time_advance()?;
        }
        Ok(self.snapshot())
    }

    /// Run up to one speed step of ticks, stopping after any tick that
    /// raised a popup or opened a dogfight.
    pub fn time_advance(&mut self) -> Result<(), ConfigError> {
        for _ in 0..self.speed.ticks() {
            self.tick()?;
            if self.popups.take_pause_request() {
                self.speed = TimeSpeed::FiveSeconds;
                break;
            }
            if self.dogfights.blocks_time() || self.campaign.pending_battle.is_some() {
                break;
            }
        }
        Ok(())
    }

    /// Advance the clock one tick and run every handler the crossed boundary
    /// calls for, coarsest first.
    pub fn tick(&mut self) -> Result<TimeTrigger, ConfigError> {
        let trigger = self.campaign.time.advance();
        let counts = &mut self.counts;
        let mut ctx = TickContext {
            campaign: &mut self.campaign,
            ruleset: &self.ruleset,
            rng: &mut self.rng,
            popups: &mut self.popups,
            dogfights: &mut self.dogfights,
            options: &self.options,
        };

        if trigger >= TimeTrigger::Month {
            systems::monthly::run(&mut ctx)?;
            counts.monthly += 1;
        }
        if trigger >= TimeTrigger::Day {
            systems::daily::run(&mut ctx)?;
            counts.daily += 1;
        }
        if trigger >= TimeTrigger::Hour {
            systems::hourly::run(&mut ctx);
            counts.hourly += 1;
        }
        if trigger >= TimeTrigger::ThirtyMinutes {
            systems::thirty_minutes::run(&mut ctx)?;
            counts.thirty_minutes += 1;
        }
        if trigger >= TimeTrigger::TenMinutes {
            systems::ten_minutes::run(&mut ctx)?;
            counts.ten_minutes += 1;
        }
        systems::five_seconds::run(&mut ctx)?;
        counts.five_seconds += 1;
        Ok(trigger)
    }

    /// Whether the clock is held: player pause, a popup on screen, a battle
    /// in progress, or an open dogfight.
    pub fn is_paused(&self) -> bool {
        self.paused
            || !self.popups.is_empty()
            || self.campaign.pending_battle.is_some()
            || self.dogfights.blocks_time()
    }

    pub fn snapshot(&self) -> GeoscapeSnapshot {
        systems::snapshot::build_snapshot(
            &self.campaign,
            FrameState {
                speed: self.speed,
                paused: self.is_paused(),
                popup: self.popups.active(),
                queued_popups: self.popups.len(),
                dogfights: self.dogfights.views(),
                counts: &self.counts,
            },
        )
    }

    pub fn campaign(&self) -> &Campaign {
        &self.campaign
    }

    pub fn campaign_mut(&mut self) -> &mut Campaign {
        &mut self.campaign
    }

    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    pub fn counts(&self) -> &HandlerCounts {
        &self.counts
    }

    pub fn popups(&self) -> &PopupQueue {
        &self.popups
    }

    pub fn dogfights(&self) -> &DogfightCoordinator {
        &self.dogfights
    }

    pub fn speed(&self) -> TimeSpeed {
        self.speed
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub(crate) fn context(&mut self) -> TickContext<'_> {
        TickContext {
            campaign: &mut self.campaign,
            ruleset: &self.ruleset,
            rng: &mut self.rng,
            popups: &mut self.popups,
            dogfights: &mut self.dogfights,
            options: &self.options,
        }
    }

    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::SetTimeSpeed { speed } => self.speed = speed,
            PlayerCommand::Pause => self.paused = true,
            PlayerCommand::Resume => self.paused = false,
            PlayerCommand::DismissPopup => {
                // Closing a landing prompt without answering declines it.
                if let Some(Popup::ConfirmLanding { craft, .. }) = self.popups.dismiss() {
                    self.answer_landing(craft, false);
                }
            }
            PlayerCommand::SendCraft { craft, target } => self.send_craft(craft, target),
            PlayerCommand::ReturnToBase { craft } => {
                let ruleset = &self.ruleset;
                if let Some(craft) = self.campaign.craft_mut(craft) {
                    if let Some(rule) = ruleset.craft(&craft.rule) {
                        if craft.is_airborne() {
                            craft.return_to_base(rule);
                        }
                    }
                }
            }
            PlayerCommand::ConfirmLanding { craft, accept } => {
                if matches!(
                    self.popups.active(),
                    Some(Popup::ConfirmLanding { craft: c, .. }) if *c == craft
                ) {
                    self.popups.dismiss();
                }
                self.answer_landing(craft, accept);
            }
            PlayerCommand::BattleOutcome { victory } => self.finish_battle(victory),
            PlayerCommand::MinimizeDogfight { slot } => {
                self.dogfights.minimize(slot);
            }
            PlayerCommand::RestoreDogfight { slot } => {
                self.dogfights.restore(slot);
            }
            PlayerCommand::SetDogfightStance { slot, stance } => {
                self.dogfights.set_stance(slot, stance);
            }
            PlayerCommand::Disengage { slot } => {
                self.dogfights.disengage(slot);
            }
        }
    }

    fn send_craft(&mut self, id: CraftId, target: Target) {
        if self.campaign.target_position(target).is_none() {
            tracing::warn!(target: "geoscape::craft", craft = %id, ?target, "craft.send.no_target");
            return;
        }
        let ruleset = &self.ruleset;
        let Some(craft) = self.campaign.craft_mut(id) else {
            return;
        };
        let Some(rule) = ruleset.craft(&craft.rule) else {
            return;
        };
        let ready = craft.is_airborne() || craft.status == CraftStatus::Ready;
        if !ready || craft.low_fuel || craft.in_dogfight {
            tracing::warn!(target: "geoscape::craft", craft = %id, status = ?craft.status, "craft.send.refused");
            return;
        }
        craft.set_destination(target, rule);
        tracing::debug!(target: "geoscape::craft", craft = %id, ?target, "craft.launched");
    }

    fn answer_landing(&mut self, id: CraftId, accept: bool) {
        let ruleset = &self.ruleset;
        let Some(craft) = self.campaign.craft_mut(id) else {
            return;
        };
        if !craft.landing_pending {
            return;
        }
        craft.landing_pending = false;
        match (accept, craft.destination) {
            (true, Some(target)) => {
                self.campaign.pending_battle = Some(BattleRequest { craft: id, target });
                tracing::info!(target: "geoscape::battle", craft = %id, ?target, "battle.requested");
            }
            _ => {
                if let Some(rule) = ruleset.craft(&craft.rule) {
                    craft.return_to_base(rule);
                }
            }
        }
    }

    /// The host reports how the ground battle went.
    fn finish_battle(&mut self, victory: bool) {
        let Some(BattleRequest { craft, target }) = self.campaign.pending_battle.take() else {
            return;
        };
        let ruleset = &self.ruleset;
        tracing::info!(target: "geoscape::battle", craft = %craft, ?target, victory, "battle.finished");

        if victory {
            let mut points = 0;
            let mut position = None;
            match target {
                Target::Ufo(id) => {
                    if let Some(ufo) = self.campaign.ufo_mut(id) {
                        points = ruleset.ufo(&ufo.rule).map_or(0, |r| r.score);
                        position = Some(ufo.position);
                        ufo.set_status(UfoStatus::Destroyed);
                    }
                }
                Target::MissionSite(id) => {
                    if let Some(index) = self.campaign.mission_sites.iter().position(|s| s.id == id) {
                        let site = self.campaign.mission_sites.remove(index);
                        points = ruleset.deployment(&site.deployment).map_or(0, |d| d.points);
                        position = Some(site.position);
                    }
                }
                Target::AlienBase(id) => {
                    if let Some(index) = self.campaign.alien_bases.iter().position(|b| b.id == id) {
                        let base = self.campaign.alien_bases.remove(index);
                        points = ALIEN_BASE_DESTROYED_POINTS;
                        position = Some(base.position);
                        for mission in &mut self.campaign.alien_missions {
                            if mission.alien_base == Some(id) {
                                mission.alien_base = None;
                            }
                        }
                    }
                }
                Target::Waypoint(_) | Target::Base(_) => {}
            }
            if let Some(position) = position {
                self.campaign.add_xcom_activity(ruleset, position, points);
            }
        } else if let Some((bi, _)) = self.campaign.craft_location(craft) {
            self.campaign.bases[bi]
                .soldiers
                .retain(|s| s.craft != Some(craft));
        }

        if let Some(craft) = self.campaign.craft_mut(craft) {
            if let Some(rule) = ruleset.craft(&craft.rule) {
                craft.return_to_base(rule);
            }
        }
    }
}
