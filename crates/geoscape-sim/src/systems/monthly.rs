//! Month rollover: mission scheduling, psi training, funding settlement, and
//! the chance to reveal a hidden alien base.

use geoscape_core::constants::*;
use geoscape_core::error::ConfigError;
use geoscape_core::events::Popup;

use crate::systems::{mission_scheduler, TickContext};

pub fn run(ctx: &mut TickContext<'_>) -> Result<(), ConfigError> {
    // 1. Calendar
    ctx.campaign.months_passed += 1;
    // 2. New alien missions
    mission_scheduler::determine_alien_missions(ctx)?;
    // 3. Psi labs
    if !ctx.options.anytime_psi_training {
        train_psi(ctx);
    }
    // 4. Funding
    settle_funding(ctx);
    // 5. Intelligence
    if ctx.rng.percent(ALIEN_BASE_REVEAL_CHANCE) {
        if let Some(base) = ctx.campaign.alien_bases.iter_mut().find(|b| !b.discovered) {
            base.discovered = true;
            tracing::info!(target: "geoscape::detection", alien_base = %base.id, "alien_base.revealed");
            ctx.popups.push(Popup::AlienBaseDiscovered { alien_base: base.id });
        }
    }
    Ok(())
}

fn train_psi(ctx: &mut TickContext<'_>) {
    let ruleset = ctx.ruleset;
    let (min, max) = PSI_MONTHLY_GAIN;
    for base in &mut ctx.campaign.bases {
        let capacity = base.psi_lab_capacity(ruleset) as usize;
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

/// Countries react to last month's activity, ledgers roll over, and income
/// minus upkeep lands in the treasury.
fn settle_funding(ctx: &mut TickContext<'_>) {
    let ruleset = ctx.ruleset;
    let campaign = &mut *ctx.campaign;

    let rating: i32 = campaign
        .regions
        .iter()
        .map(|r| r.activity.current_xcom() - r.activity.current_alien())
        .sum();

    let mut funding_change = 0;
    for country in &mut campaign.countries {
        let current = country.current_funding();
        let diff = country.activity.current_xcom() - country.activity.current_alien();
        let change = if diff > FUNDING_SATISFACTION_MARGIN {
            current * ctx.rng.generate(FUNDING_CHANGE_MIN, FUNDING_CHANGE_MAX) as i64 / 100
        } else if diff < -FUNDING_SATISFACTION_MARGIN {
            -(current * ctx.rng.generate(FUNDING_CHANGE_MIN, FUNDING_CHANGE_MAX) as i64 / 100)
        } else {
            0
        };
        funding_change += change;
        country.funding.push((current + change).max(0));
        country.activity.new_month();
    }
    for region in &mut campaign.regions {
        region.activity.new_month();
    }

    let income: i64 = campaign.countries.iter().map(|c| c.current_funding()).sum();
    let upkeep: i64 = campaign
        .bases
        .iter()
        .map(|b| b.monthly_maintenance(ruleset, SOLDIER_SALARY))
        .sum();
    campaign.funds += income - upkeep;

    let (year, month) = if campaign.time.month == 1 {
        (campaign.time.year - 1, 12)
    } else {
        (campaign.time.year, campaign.time.month - 1)
    };
    tracing::info!(
        target: "geoscape::economy",
        year,
        month,
        rating,
        income,
        upkeep,
        funds = campaign.funds,
        "month.settled"
    );
    ctx.popups.push(Popup::MonthlyReport {
        year,
        month,
        rating,
        funding_change,
        funds: campaign.funds,
    });
}
