//! Every hour: repairs, rearming, transfers, and manufacturing.

use std::collections::BTreeSet;

use geoscape_core::components::{Base, Production, TransferCargo};
use geoscape_core::enums::{CraftStatus, ProductionProgress};
use geoscape_core::events::Popup;
use geoscape_core::ruleset::{ManufactureRule, Ruleset};

use crate::systems::TickContext;

pub fn run(ctx: &mut TickContext<'_>) {
    let ruleset = ctx.ruleset;
    let mut touched = BTreeSet::new();

    for bi in 0..ctx.campaign.bases.len() {
        // 1. Repairs and rearming
        service_crafts(ctx, bi);

        // 2. Transfers
        let base = &mut ctx.campaign.bases[bi];
        if deliver_transfers(base) {
            touched.insert(base.id);
            ctx.popups.push(Popup::TransfersArrived { base: base.id });
        }

        // 3. Manufacturing
        if run_productions(ctx, bi) {
            touched.insert(ctx.campaign.bases[bi].id);
        }
    }

    // 4. Stores that just filled past capacity force a sale.
    for id in touched {
        if ctx
            .campaign
            .base(id)
            .is_some_and(|b| b.stores_overfull(ruleset))
        {
            ctx.popups.push(Popup::SellStock { base: id });
        }
    }
}

fn service_crafts(ctx: &mut TickContext<'_>, bi: usize) {
    let ruleset = ctx.ruleset;
    let base = &mut ctx.campaign.bases[bi];
    for ci in 0..base.crafts.len() {
        let Some(rule) = ruleset.craft(&base.crafts[ci].rule) else {
            continue;
        };
        match base.crafts[ci].status {
            CraftStatus::Repairs => base.crafts[ci].repair(rule),
            CraftStatus::Rearming => {
                if let Some(item) = rearm(base, ci, ruleset) {
                    let craft = &mut base.crafts[ci];
                    if !craft.warned {
                        craft.warned = true;
                        ctx.popups.push(Popup::RearmShortage {
                            craft: craft.id,
                            item,
                        });
                    }
                }
            }
            _ => {}
        }
    }
}

/// One hour of rearming. Each step loads `rearm_rate` rounds and uses one
/// clip item where the weapon needs them. A weapon whose clips ran out stops
/// rearming; the craft is ready once no weapon is rearming. Returns the
/// missing item, if any.
fn rearm(base: &mut Base, ci: usize, ruleset: &Ruleset) -> Option<String> {
    let mut missing = None;
    for wi in 0..base.crafts[ci].weapons.len() {
        let weapon = &base.crafts[ci].weapons[wi];
        if !weapon.rearming {
            continue;
        }
        let Some(rule) = ruleset.craft_weapon(&weapon.rule) else {
            base.crafts[ci].weapons[wi].rearming = false;
            continue;
        };
        if weapon.ammo >= rule.ammo_max {
            base.crafts[ci].weapons[wi].rearming = false;
            continue;
        }
        if let Some(clip) = rule.clip_item.as_deref() {
            if !base.remove_items(clip, 1) {
                base.crafts[ci].weapons[wi].rearming = false;
                missing = Some(clip.to_string());
                continue;
            }
        }
        let weapon = &mut base.crafts[ci].weapons[wi];
        weapon.ammo = (weapon.ammo + rule.rearm_rate).min(rule.ammo_max);
        if weapon.ammo >= rule.ammo_max {
            weapon.rearming = false;
        }
    }
    let craft = &mut base.crafts[ci];
    if craft.weapons.iter().all(|w| !w.rearming) {
        craft.status = CraftStatus::Ready;
    }
    missing
}

/// Count transfers down and unload the ones that arrived.
fn deliver_transfers(base: &mut Base) -> bool {
    let mut arrived = Vec::new();
    base.transfers.retain_mut(|transfer| {
        transfer.hours = transfer.hours.saturating_sub(1);
        if transfer.hours == 0 {
            arrived.push(transfer.cargo.clone());
            false
        } else {
            true
        }
    });
    let any = !arrived.is_empty();
    for cargo in arrived {
        match cargo {
            TransferCargo::Items { item, quantity } => base.add_items(&item, quantity),
            TransferCargo::Soldier(soldier) => base.soldiers.push(soldier),
            TransferCargo::Scientists(n) => base.scientists += n,
            TransferCargo::Engineers(n) => base.engineers += n,
        }
    }
    any
}

/// Step every production line. Finished or stalled lines are collected
/// first and removed afterwards. Returns whether stores changed.
fn run_productions(ctx: &mut TickContext<'_>, bi: usize) -> bool {
    let ruleset = ctx.ruleset;
    let base_id = ctx.campaign.bases[bi].id;
    let mut productions = std::mem::take(&mut ctx.campaign.bases[bi].productions);
    let mut finished = Vec::new();
    let mut produced_any = false;

    for (index, production) in productions.iter_mut().enumerate() {
        let Some(rule) = ruleset.manufacture_project(&production.rule) else {
            continue;
        };
        let (progress, made) = step_production(ctx, bi, production, rule);
        produced_any |= made;
        if progress != ProductionProgress::NotComplete {
            finished.push((index, progress));
        }
    }

    for &(index, progress) in finished.iter().rev() {
        let production = productions.remove(index);
        tracing::info!(
            target: "geoscape::base",
            base = %base_id,
            project = %production.rule,
            ?progress,
            "production.finished"
        );
        ctx.popups.push(Popup::ProductionFinished {
            base: base_id,
            project: production.rule,
            progress,
        });
    }
    ctx.campaign.bases[bi].productions = productions;
    produced_any
}

fn step_production(
    ctx: &mut TickContext<'_>,
    bi: usize,
    production: &mut Production,
    rule: &ManufactureRule,
) -> (ProductionProgress, bool) {
    production.time_spent += production.engineers;
    let due = if rule.time == 0 {
        production.amount_total
    } else {
        (production.time_spent / rule.time).min(production.amount_total)
    };

    let mut made = false;
    while production.amount_produced < due {
        if ctx.campaign.funds < rule.cost {
            return (ProductionProgress::NotEnoughMoney, made);
        }
        let base = &mut ctx.campaign.bases[bi];
        let has_materials = rule
            .required_items
            .iter()
            .all(|(item, qty)| base.item_count(item) >= *qty);
        if !has_materials {
            return (ProductionProgress::NotEnoughMaterials, made);
        }
        for (item, qty) in &rule.required_items {
            base.remove_items(item, *qty);
        }
        for (item, qty) in &rule.produced_items {
            base.add_items(item, *qty);
        }
        ctx.campaign.funds -= rule.cost;
        production.amount_produced += 1;
        made = true;
    }

    if production.amount_produced >= production.amount_total {
        (ProductionProgress::Complete, made)
    } else {
        (ProductionProgress::NotComplete, made)
    }
}
