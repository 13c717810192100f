pub mod gauge;
pub mod history;
pub mod stats;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use history::DateStyle;
use tracing::level_filters::LevelFilter;

use crate::{
    factors::{preset_by_key, presets_for, FactorKey},
    store::{
        activity_store::ActivityStore,
        entities::{ActivityCategory, RecordId, DEFAULT_DAILY_GOAL},
        snapshot::JsonSnapshotStorage,
    },
    utils::{
        clock::DefaultClock, dir::create_application_default_path, logging::enable_logging,
        percentage::Percentage,
    },
};

/// A tree absorbs roughly this much co2 in a year. Used for the equivalence
/// lines under the gauge and the weekly stats.
pub const TREE_ABSORPTION_KG_PER_YEAR: f64 = 21.;

#[derive(Parser, Debug)]
#[command(name = "Carbontrace", version, long_about = None)]
#[command(about = "Command line tracker for your personal carbon footprint", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Log an activity from a preset, e.g. `carbontrace log car-km 12`")]
    Log {
        #[arg(help = "Preset to log. See `carbontrace presets` for the full table")]
        preset: FactorKey,
        #[arg(help = "Amount in the preset's unit, e.g. kilometers or meals")]
        amount: f64,
        #[arg(long, help = "Override the generated record label")]
        name: Option<String>,
    },
    #[command(about = "Log a one-off activity with an explicit co2 amount in kg")]
    LogCustom {
        category: ActivityCategory,
        #[arg(help = "Kg of co2 equivalent")]
        kg: f64,
        #[arg(help = "Display label for the record")]
        name: String,
        #[arg(long, help = "Count the amount as avoided instead of emitted")]
        reduction: bool,
    },
    #[command(about = "Remove a previously logged activity by its id")]
    Remove { id: RecordId },
    #[command(about = "Delete every logged activity")]
    Clear {
        #[arg(long, help = "Skip the confirmation")]
        yes: bool,
    },
    #[command(about = "Show today's gauge against the daily goal")]
    Today {},
    #[command(about = "Show totals for the trailing week grouped by category")]
    Stats {
        #[arg(short = 'p', long = "percentage", help = "Filter categories to have at least specified share", default_value_t = Percentage::new_opt(0.).unwrap())]
        min_share: Percentage,
    },
    #[command(about = "List logged activities")]
    History {
        #[arg(
            long = "start",
            short,
            help = "Start of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
        )]
        start_date: Option<String>,
        #[arg(
            long = "end",
            short,
            help = "End of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\""
        )]
        end_date: Option<String>,
        #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
        date_style: DateStyle,
    },
    #[command(about = "Show available presets and their emission factors")]
    Presets {
        #[arg(help = "Only show presets for this category")]
        category: Option<ActivityCategory>,
    },
    #[command(about = "Set the daily co2 goal in kg")]
    Goal {
        #[arg(
            help = "Goal in kg per day. Values that don't read as a positive number fall back to the default of 8"
        )]
        value: String,
    },
    #[command(about = "Store the api key for the external advice integration")]
    ApiKey { key: String },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };

    let dir = match args.dir.clone() {
        Some(v) => v,
        None => create_application_default_path()?,
    };
    enable_logging(&dir, logging_level, args.log)?;

    let storage = JsonSnapshotStorage::new(dir)?;
    let mut store = ActivityStore::load(storage, Box::new(DefaultClock)).await?;

    match args.commands {
        Commands::Log {
            preset,
            amount,
            name,
        } => log_preset(&mut store, preset, amount, name).await,
        Commands::LogCustom {
            category,
            kg,
            name,
            reduction,
        } => log_custom(&mut store, category, kg, name, reduction).await,
        Commands::Remove { id } => {
            store.remove_activity(id).await;
            println!("Removed #{id}");
            Ok(())
        }
        Commands::Clear { yes } => clear(&mut store, yes).await,
        Commands::Today {} => {
            print!("{}", gauge::render_gauge(store.today_emitted(), store.today_reduced(), store.daily_goal()));
            Ok(())
        }
        Commands::Stats { min_share } => {
            print!("{}", stats::render_stats(store.week_emitted(), store.week_reduced(), &store.category_breakdown(), min_share));
            Ok(())
        }
        Commands::History {
            start_date,
            end_date,
            date_style,
        } => history::process_history_command(&store, start_date, end_date, date_style),
        Commands::Presets { category } => {
            print_presets(category);
            Ok(())
        }
        Commands::Goal { value } => set_goal(&mut store, &value).await,
        Commands::ApiKey { key } => {
            store.set_api_key(key).await;
            println!("Api key updated");
            Ok(())
        }
    }
}

async fn log_preset(
    store: &mut ActivityStore<JsonSnapshotStorage>,
    key: FactorKey,
    amount: f64,
    name: Option<String>,
) -> Result<()> {
    if !(amount.is_finite() && amount >= 0.) {
        return Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Amount must be a non-negative number, got {amount}"),
            )
            .into());
    }

    let (category, preset) = preset_by_key(key);
    let carbon_kg = preset.factor.kg_per_unit() * amount;
    let name: Arc<str> = name
        .unwrap_or_else(|| format!("{} {}{}", preset.name, amount, preset.unit))
        .into();

    let id = store
        .add_activity(category, name.clone(), carbon_kg, preset.is_reduction)
        .await?;

    if preset.is_reduction {
        println!("#{id}\t{name}\t{carbon_kg:.2} kg avoided");
    } else {
        println!("#{id}\t{name}\t{carbon_kg:.2} kg");
    }
    Ok(())
}

async fn log_custom(
    store: &mut ActivityStore<JsonSnapshotStorage>,
    category: ActivityCategory,
    kg: f64,
    name: String,
    reduction: bool,
) -> Result<()> {
    let name: Arc<str> = name.into();
    let id = store
        .add_activity(category, name.clone(), kg, reduction)
        .await?;

    if reduction {
        println!("#{id}\t{name}\t{kg:.2} kg avoided");
    } else {
        println!("#{id}\t{name}\t{kg:.2} kg");
    }
    Ok(())
}

async fn clear(store: &mut ActivityStore<JsonSnapshotStorage>, yes: bool) -> Result<()> {
    let count = store.activities().len();
    if !yes {
        println!("This would delete {count} logged activities. Pass --yes to confirm.");
        return Ok(());
    }
    store.clear_activities().await;
    println!("Deleted {count} activities");
    Ok(())
}

/// Goals are forgiving on purpose. Anything that doesn't read as a number
/// becomes the default instead of an error, the store handles non-positive
/// numbers the same way.
async fn set_goal(store: &mut ActivityStore<JsonSnapshotStorage>, value: &str) -> Result<()> {
    let goal = match value.trim().parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            println!("Can't read \"{value}\" as a number, using the default of {DEFAULT_DAILY_GOAL} kg");
            DEFAULT_DAILY_GOAL
        }
    };
    store.set_daily_goal(goal).await;
    println!("Daily goal set to {} kg", store.daily_goal());
    Ok(())
}

fn print_presets(category: Option<ActivityCategory>) {
    let categories = match category {
        Some(v) => vec![v],
        None => ActivityCategory::ALL.to_vec(),
    };

    for category in categories {
        let presets = presets_for(category);
        if presets.is_empty() {
            continue;
        }
        println!("{category}");
        for preset in presets {
            println!(
                "  {}\t{}\t{}\t{} kg/{}{}",
                preset.icon,
                preset.factor,
                preset.name,
                preset.factor.kg_per_unit(),
                preset.unit,
                if preset.is_reduction { "\tavoided" } else { "" }
            );
        }
        println!();
    }
}
