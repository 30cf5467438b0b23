//! Snapshot system: builds the host-facing view of the campaign.
//!
//! Read-only. Enemy contacts appear only once XCOM knows about them.

use geoscape_core::enums::{TimeSpeed, UfoStatus};
use geoscape_core::events::Popup;
use geoscape_core::state::*;

use crate::campaign::Campaign;

/// Engine-side state the snapshot reports alongside the campaign.
pub struct FrameState<'a> {
    pub speed: TimeSpeed,
    pub paused: bool,
    pub popup: Option<&'a Popup>,
    pub queued_popups: usize,
    pub dogfights: Vec<DogfightView>,
    pub counts: &'a HandlerCounts,
}

pub fn build_snapshot(campaign: &Campaign, frame: FrameState<'_>) -> GeoscapeSnapshot {
    GeoscapeSnapshot {
        time: campaign.time,
        speed: frame.speed,
        paused: frame.paused,
        funds: campaign.funds,
        months_passed: campaign.months_passed,
        popup: frame.popup.cloned(),
        queued_popups: frame.queued_popups,
        ufos: build_ufos(campaign),
        crafts: build_crafts(campaign),
        bases: build_bases(campaign),
        mission_sites: build_sites(campaign),
        alien_bases: build_alien_bases(campaign),
        dogfights: frame.dogfights,
        handler_counts: frame.counts.clone(),
    }
}

fn build_ufos(campaign: &Campaign) -> Vec<UfoView> {
    campaign
        .ufos
        .iter()
        .filter(|u| u.detected && u.status != UfoStatus::Destroyed)
        .map(|u| UfoView {
            id: u.id,
            rule: u.rule.clone(),
            position: u.position,
            status: u.status,
            hyper_detected: u.hyper_detected,
        })
        .collect()
}

fn build_crafts(campaign: &Campaign) -> Vec<CraftView> {
    campaign
        .crafts()
        .map(|c| CraftView {
            id: c.id,
            base: c.base,
            rule: c.rule.clone(),
            position: c.position,
            status: c.status,
            destination: c.destination,
            fuel: c.fuel,
            damage: c.damage,
            low_fuel: c.low_fuel,
        })
        .collect()
}

fn build_bases(campaign: &Campaign) -> Vec<BaseView> {
    campaign
        .bases
        .iter()
        .map(|b| BaseView {
            id: b.id,
            name: b.name.clone(),
            position: b.position,
            research: b.research.iter().map(|r| r.name.clone()).collect(),
            productions: b.productions.iter().map(|p| p.rule.clone()).collect(),
        })
        .collect()
}

fn build_sites(campaign: &Campaign) -> Vec<SiteView> {
    campaign
        .mission_sites
        .iter()
        .filter(|s| s.detected)
        .map(|s| SiteView {
            id: s.id,
            mission_rule: s.mission_rule.clone(),
            position: s.position,
            seconds_remaining: s.seconds_remaining,
        })
        .collect()
}

fn build_alien_bases(campaign: &Campaign) -> Vec<AlienBaseView> {
    campaign
        .alien_bases
        .iter()
        .filter(|b| b.discovered)
        .map(|b| AlienBaseView {
            id: b.id,
            position: b.position,
            race: b.race.clone(),
        })
        .collect()
}
