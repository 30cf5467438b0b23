//! Every day: construction, research, recovery, alien bases, autosave.

use geoscape_core::constants::*;
use geoscape_core::enums::MissionObjective;
use geoscape_core::error::ConfigError;
use geoscape_core::events::Popup;

use crate::systems::{alien_missions, TickContext};

pub fn run(ctx: &mut TickContext<'_>) -> Result<(), ConfigError> {
    // 1. Construction
    build_facilities(ctx);
    // 2. Research
    for bi in 0..ctx.campaign.bases.len() {
        advance_research(ctx, bi);
    }
    // 3. Wounds and psi
    recover_soldiers(ctx);
    // 4. Alien bases
    alien_base_activity(ctx)?;
    // 5. Autosave
    if AUTOSAVE_DAYS.contains(&ctx.campaign.time.day) && ctx.options.autosave && !ctx.campaign.ironman {
        ctx.popups.push(Popup::Autosave);
    }
    Ok(())
}

fn build_facilities(ctx: &mut TickContext<'_>) {
    for base in &mut ctx.campaign.bases {
        for facility in base.facilities.iter_mut().filter(|f| !f.is_complete()) {
            facility.build_days -= 1;
            if facility.is_complete() {
                ctx.popups.push(Popup::FacilityComplete {
                    base: base.id,
                    facility: facility.rule.clone(),
                });
            }
        }
    }
}

/// A finished topic is discovered globally, so it leaves every base's queue,
/// along with any bonus topic it granted.
fn advance_research(ctx: &mut TickContext<'_>, bi: usize) {
    let ruleset = ctx.ruleset;
    let base = &mut ctx.campaign.bases[bi];
    let completed: Vec<String> = base
        .research
        .iter_mut()
        .filter_map(|project| project.step().then(|| project.name.clone()))
        .collect();
    let base_id = base.id;
    let position = base.position;

    for topic in completed {
        let rule = ruleset.research_topic(&topic);
        let bonus = rule.and_then(|rule| {
            let free: Vec<&String> = rule
                .get_one_free
                .iter()
                .filter(|t| !ctx.campaign.is_researched(t))
                .collect();
            (!free.is_empty()).then(|| free[ctx.rng.index(free.len())].clone())
        });

        ctx.campaign.discover(&topic);
        if let Some(bonus) = &bonus {
            ctx.campaign.discover(bonus);
        }
        for base in &mut ctx.campaign.bases {
            base.research
                .retain(|p| p.name != topic && Some(&p.name) != bonus.as_ref());
        }

        if let Some(rule) = rule {
            if let Some(item) = &rule.spawned_item {
                ctx.campaign.bases[bi].add_items(item, 1);
            }
            ctx.campaign.add_xcom_activity(ruleset, position, rule.points);
            if let Some(id) = &rule.cutscene {
                ctx.popups.push(Popup::Cutscene { id: id.clone() });
            }
        }
        tracing::info!(target: "geoscape::base", base = %base_id, %topic, ?bonus, "research.complete");
        ctx.popups.push(Popup::ResearchComplete { topic, bonus });
    }
}

fn recover_soldiers(ctx: &mut TickContext<'_>) {
    let ruleset = ctx.ruleset;
    let anytime = ctx.options.anytime_psi_training;
    for base in &mut ctx.campaign.bases {
        for soldier in &mut base.soldiers {
            soldier.wound_recovery = soldier.wound_recovery.saturating_sub(1);
        }
        if !anytime {
            continue;
        }
        let capacity = base.psi_lab_capacity(ruleset) as usize;
        let (min, max) = PSI_DAILY_GAIN;
        for soldier in base
            .soldiers
            .iter_mut()
            .filter(|s| s.psi_training)
            .take(capacity)
        {
            let gain = ctx.rng.generate(min, max);
            soldier.psi_skill = (soldier.psi_skill + gain).min(PSI_SKILL_CAP);
        }
    }
}

/// Each alien base scores daily, and may call in a supply run if none is
/// already on its way.
fn alien_base_activity(ctx: &mut TickContext<'_>) -> Result<(), ConfigError> {
    let ruleset = ctx.ruleset;
    let bases: Vec<_> = ctx
        .campaign
        .alien_bases
        .iter()
        .map(|b| (b.id, b.position, b.region.clone(), b.race.clone()))
        .collect();

    for (id, position, region, race) in bases {
        ctx.campaign
            .add_alien_activity(ruleset, position, ALIEN_BASE_DAILY_POINTS);

        if ctx.rng.generate(0, 100) >= ALIEN_BASE_SUPPLY_ODDS {
            continue;
        }
        let supplied = ctx.campaign.alien_missions.iter().any(|m| {
            m.alien_base == Some(id)
                && ruleset
                    .alien_mission(&m.rule)
                    .is_some_and(|r| r.objective == MissionObjective::Supply)
        });
        if supplied {
            continue;
        }
        let Some(supply) = ruleset.race(&race).and_then(|r| r.supply_mission.as_deref()) else {
            continue;
        };
        let mission = alien_missions::start_mission(ctx, supply, &region, &race, 0)?;
        if let Some(mission) = ctx.campaign.mission_mut(mission) {
            mission.alien_base = Some(id);
        }
    }
    Ok(())
}
