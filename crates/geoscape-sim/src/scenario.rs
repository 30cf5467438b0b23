//! Starting campaign: one equipped base in North America.

use geoscape_core::components::*;
use geoscape_core::enums::Difficulty;
use geoscape_core::error::ConfigError;
use geoscape_core::ruleset::Ruleset;
use geoscape_core::types::*;

use crate::campaign::Campaign;

pub const STARTING_FUNDS: i64 = 4_000_000;
pub const STARTING_SOLDIERS: u32 = 8;
pub const STARTING_SCIENTISTS: u32 = 10;
pub const STARTING_ENGINEERS: u32 = 10;

const BASE_FACILITIES: &[&str] = &[
    "STR_ACCESS_LIFT",
    "STR_HANGAR",
    "STR_HANGAR",
    "STR_HANGAR",
    "STR_LIVING_QUARTERS",
    "STR_LABORATORY",
    "STR_WORKSHOP",
    "STR_GENERAL_STORES",
    "STR_SMALL_RADAR_SYSTEM",
];

const STARTING_STOCK: &[(&str, u32)] = &[
    ("STR_STINGRAY_MISSILES", 25),
    ("STR_CANNON_ROUNDS_X50", 1),
];

/// Interceptor loadout, slot order.
const INTERCEPTOR_WEAPONS: &[&str] = &["STR_STINGRAY", "STR_CANNON"];

/// Build a fresh campaign from the ruleset.
pub fn new_campaign(ruleset: &Ruleset, difficulty: Difficulty) -> Result<Campaign, ConfigError> {
    let context = "starting base";
    let mut campaign = Campaign::new(ruleset, difficulty);
    campaign.funds = STARTING_FUNDS;

    let base_id = BaseId(campaign.next_id("BASES"));
    let position = GeoPoint::from_degrees(-98.0, 39.0);
    let mut base = Base::new(base_id, "Omaha", position);

    for &facility in BASE_FACILITIES {
        if ruleset.facility(facility).is_none() {
            return Err(ConfigError::undefined(context, "facility", facility));
        }
        base.facilities.push(Facility {
            rule: facility.to_string(),
            build_days: 0,
        });
    }
    for &(item, quantity) in STARTING_STOCK {
        ruleset.require_item(context, item)?;
        base.add_items(item, quantity);
    }
    base.scientists = STARTING_SCIENTISTS;
    base.engineers = STARTING_ENGINEERS;

    let interceptor = ruleset.require_craft(context, "STR_INTERCEPTOR")?;
    for _ in 0..2 {
        let id = CraftId(campaign.next_id("CRAFTS"));
        let mut craft = Craft::new(id, interceptor, base_id, position);
        for &name in INTERCEPTOR_WEAPONS {
            let weapon = ruleset
                .craft_weapon(name)
                .ok_or_else(|| ConfigError::undefined(context, "craft weapon", name))?;
            craft.weapons.push(CraftWeapon {
                rule: weapon.name.clone(),
                ammo: weapon.ammo_max,
                rearming: false,
            });
        }
        base.crafts.push(craft);
    }

    let transport = ruleset.require_craft(context, "STR_SKYRANGER")?;
    let skyranger = CraftId(campaign.next_id("CRAFTS"));
    base.crafts
        .push(Craft::new(skyranger, transport, base_id, position));

    for n in 0..STARTING_SOLDIERS {
        let id = SoldierId(campaign.next_id("SOLDIERS"));
        base.soldiers.push(Soldier {
            id,
            name: format!("Soldier {}", n + 1),
            craft: Some(skyranger),
            wound_recovery: 0,
            psi_training: false,
            psi_skill: 0,
        });
    }

    campaign.bases.push(base);
    tracing::info!(target: "geoscape::campaign", ?difficulty, base = %base_id, "campaign.created");
    Ok(campaign)
}
