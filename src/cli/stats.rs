use std::collections::BTreeMap;

use ansi_term::Colour;

use crate::{
    factors::FactorKey,
    store::entities::ActivityCategory,
    utils::percentage::{share_percentage, Percentage},
};

use super::TREE_ABSORPTION_KG_PER_YEAR;

const BAR_WIDTH: usize = 20;

/// Renders the trailing-week stats: emitted and avoided totals, equivalence
/// lines and the per-category breakdown sorted by weight.
pub fn render_stats(
    week_emitted: f64,
    week_reduced: f64,
    breakdown: &BTreeMap<ActivityCategory, f64>,
    min_share: Percentage,
) -> String {
    let mut out = String::new();
    out += &format!("Week {week_emitted:.1} kg CO₂ emitted, {week_reduced:.1} kg avoided\n");
    out += &format!(
        "Equivalent to {:.1} trees/year or {:.0} km by car\n\n",
        week_emitted / TREE_ABSORPTION_KG_PER_YEAR * 52.,
        week_emitted / FactorKey::CarKm.kg_per_unit()
    );

    let total: f64 = breakdown.values().sum();
    let mut rows: Vec<_> = breakdown.iter().filter(|(_, value)| **value > 0.).collect();
    rows.sort_by(|a, b| b.1.partial_cmp(a.1).expect("totals are finite"));

    if rows.is_empty() {
        out += "No emissions recorded in the trailing week\n";
        return out;
    }

    for (category, value) in rows {
        let share = share_percentage(*value, total);
        if share < min_share {
            continue;
        }
        let bar_len = (*share / 100. * BAR_WIDTH as f64).round() as usize;
        out += &format!(
            "{category}\t{value:.1} kg\t{:.0}%\t{}\n",
            *share,
            category_colour(*category).paint("█".repeat(bar_len))
        );
    }
    out
}

fn category_colour(category: ActivityCategory) -> Colour {
    match category {
        ActivityCategory::Transport => Colour::Cyan,
        ActivityCategory::Food => Colour::Yellow,
        ActivityCategory::Energy => Colour::Red,
        ActivityCategory::Shopping => Colour::Purple,
        ActivityCategory::Other => Colour::White,
    }
}
