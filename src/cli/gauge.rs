use ansi_term::Colour;

use super::TREE_ABSORPTION_KG_PER_YEAR;

const BAR_WIDTH: usize = 30;

/// Renders the daily gauge: emitted kg against the goal with a colored bar,
/// the remaining quota, today's avoided kg and a tree equivalence line.
pub fn render_gauge(emitted: f64, reduced: f64, goal: f64) -> String {
    let ratio = emitted / goal;
    let capped = ratio.min(1.);
    let filled = (capped * BAR_WIDTH as f64).round() as usize;

    let colour = gauge_colour(ratio);
    let bar = format!(
        "{}{}",
        colour.paint("█".repeat(filled)),
        "░".repeat(BAR_WIDTH - filled)
    );

    let mut out = String::new();
    out += &format!(
        "Today {emitted:.1} / {goal:.1} kg CO₂ ({:.0}%)\n",
        capped * 100.
    );
    out += &format!("[{bar}]\n");
    if ratio < 1. {
        out += &format!("Remaining {:.1} kg of today's quota\n", goal - emitted);
    } else {
        out += "Over today's goal!\n";
    }
    out += &format!("Avoided {reduced:.1} kg\n");
    out += &format!(
        "Offsetting a whole year at today's rate takes {:.1} trees\n",
        emitted / TREE_ABSORPTION_KG_PER_YEAR * 365.
    );
    out
}

fn gauge_colour(ratio: f64) -> Colour {
    if ratio < 0.5 {
        Colour::Green
    } else if ratio < 0.8 {
        Colour::Yellow
    } else {
        Colour::Red
    }
}
