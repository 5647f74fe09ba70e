//! Command-line interface: one binary, one subcommand per maintenance task.
//! `collect` is the default so a bare invocation from cron does a run.

use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use tracing::info;

use crate::collector::{run_collection, RunSummary};
use crate::config::{Config, Credentials};
use crate::db::{self, schema};
use crate::error::{AppError, Result};
use crate::fetcher::{MetricsSource, RailwayClient};
use crate::goals::{GoalTracker, YtdProgress};
use crate::scorer::WeightedScore;

#[derive(Parser)]
#[command(name = "collector")]
#[command(about = "Railway template metrics collector", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, store and derive metrics (default if no command specified)
    Collect,

    /// Create the schema and list its tables and views
    Setup,

    /// Check API credentials without writing anything
    Verify,

    /// Manage yearly earnings goals
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
}

#[derive(Subcommand)]
pub enum GoalCommands {
    /// Set or replace the goal for a year
    Set {
        /// Goal amount in dollars
        amount: f64,

        /// Defaults to the current year
        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List all goals, newest year first
    List,

    /// Year-to-date progress against the goal
    Progress {
        /// Defaults to the current year
        #[arg(long)]
        year: Option<i32>,
    },
}

pub async fn run_collect(cfg: &Config, creds: &Credentials) -> Result<RunSummary> {
    let pool = db::connect(&cfg.database_url).await?;
    let client = RailwayClient::new(cfg, &creds.api_token)?;

    let summary = run_collection(
        &client,
        creds,
        &pool,
        WeightedScore::new(cfg.score_weights),
        Utc::now(),
    )
    .await?;

    info!(
        templates = summary.templates_fetched,
        inserted = summary.templates_inserted,
        derived = summary.derived_rows.unwrap_or(0),
        "Run summary"
    );
    Ok(summary)
}

pub async fn run_setup(cfg: &Config) -> Result<()> {
    let pool = db::connect(&cfg.database_url).await?;

    info!("Applying schema...");
    schema::MIGRATOR.run(&pool).await?;

    let (tables, views) = schema::list_objects(&pool).await?;
    println!("Tables:");
    for t in &tables {
        println!("  - {t}");
    }
    println!("Views:");
    for v in &views {
        println!("  - {v}");
    }
    Ok(())
}

pub async fn run_verify(cfg: &Config, creds: &Credentials) -> Result<()> {
    let client = RailwayClient::new(cfg, &creds.api_token)?;

    let viewer = client.fetch_viewer().await?;
    println!(
        "Authenticated as {} ({})",
        viewer.name.as_deref().unwrap_or("unknown"),
        viewer.email.as_deref().unwrap_or(&viewer.id)
    );

    let earnings = client.fetch_earnings(&creds.customer_id).await?;
    println!(
        "Earnings: {} lifetime, {} from templates, {} available",
        dollars(earnings.lifetime_earnings),
        dollars(earnings.template_earnings_lifetime),
        dollars(earnings.available_balance)
    );

    let templates = client.fetch_templates(&creds.workspace_id).await?;
    println!("Templates: {}", templates.len());
    for t in templates.iter().take(5) {
        println!(
            "  - {} ({} active projects, {} payout)",
            t.name.as_deref().unwrap_or(&t.id),
            t.active_projects.unwrap_or(0),
            dollars(t.total_payout.unwrap_or(0))
        );
    }

    println!("Credentials OK");
    Ok(())
}

pub async fn run_goal(cfg: &Config, command: GoalCommands) -> Result<()> {
    let pool = db::connect(&cfg.database_url).await?;
    schema::bootstrap(&pool).await?;
    let tracker = GoalTracker::new(pool, cfg.pace);
    let this_year = Utc::now().year();

    match command {
        GoalCommands::Set {
            amount,
            year,
            notes,
        } => {
            let cents = dollars_to_cents(amount)?;
            let goal = tracker
                .set_goal(year.unwrap_or(this_year), cents, notes.as_deref(), Utc::now())
                .await?;
            println!("Goal for {}: {}", goal.year, dollars(goal.goal_amount));
        }
        GoalCommands::List => {
            let goals = tracker.list_goals().await?;
            if goals.is_empty() {
                println!("No goals set");
            }
            for g in goals {
                match g.notes {
                    Some(notes) => println!("{}: {} ({notes})", g.year, dollars(g.goal_amount)),
                    None => println!("{}: {}", g.year, dollars(g.goal_amount)),
                }
            }
        }
        GoalCommands::Progress { year } => {
            let year = year.unwrap_or(this_year);
            match tracker.progress(year, Utc::now()).await? {
                Some(p) => print_progress(&p),
                None => println!("No earnings snapshots for {year}"),
            }
        }
    }
    Ok(())
}

fn print_progress(p: &YtdProgress) {
    println!("{} progress", p.year);
    println!("  Earned:          {}", dollars(p.ytd_earnings));
    if p.goal_amount > 0 {
        println!("  Goal:            {} ({:.2}%)", dollars(p.goal_amount), p.progress_pct);
        println!("  Remaining:       {}", dollars(p.remaining_to_goal));
    } else {
        println!("  Goal:            not set");
    }
    println!(
        "  Days:            {} elapsed, {} remaining ({:.2}% of year)",
        p.days_elapsed, p.days_remaining, p.year_completion_pct
    );
    println!("  Daily average:   {}", dollars(p.avg_daily_earnings.round() as i64));
    println!("  Projected:       {}", dollars(p.projected_year_end.round() as i64));
    println!("  Required daily:  {}", dollars(p.required_daily_avg.round() as i64));
    println!("  Pace:            {}", p.pace);
    if let Some(notes) = &p.goal_notes {
        println!("  Notes:           {notes}");
    }
    println!("  Last updated:    {}", p.last_updated.to_rfc3339());
}

fn dollars_to_cents(amount: f64) -> Result<i64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::Config(format!(
            "goal amount must be a non-negative number, got {amount}"
        )));
    }
    Ok((amount * 100.0).round() as i64)
}

/// `123456` -> `$1,234.56`
fn dollars(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}${grouped}.{:02}", cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_dollars() {
        assert_eq!(dollars(0), "$0.00");
        assert_eq!(dollars(5), "$0.05");
        assert_eq!(dollars(123_456), "$1,234.56");
        assert_eq!(dollars(100_000_000), "$1,000,000.00");
        assert_eq!(dollars(-2_550), "-$25.50");
    }

    #[test]
    fn goal_amount_rounds_to_cents() {
        assert_eq!(dollars_to_cents(50_000.0).unwrap(), 5_000_000);
        assert_eq!(dollars_to_cents(19.999).unwrap(), 2_000);
        assert!(dollars_to_cents(-1.0).is_err());
        assert!(dollars_to_cents(f64::NAN).is_err());
    }

    #[test]
    fn bare_invocation_has_no_subcommand() {
        let cli = Cli::try_parse_from(["collector"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_goal_set() {
        let cli = Cli::try_parse_from(["collector", "goal", "set", "2500.50", "--year", "2026", "--notes", "stretch"])
            .unwrap();
        match cli.command {
            Some(Commands::Goal {
                command: GoalCommands::Set { amount, year, notes },
            }) => {
                assert_eq!(amount, 2500.50);
                assert_eq!(year, Some(2026));
                assert_eq!(notes.as_deref(), Some("stretch"));
            }
            _ => panic!("expected goal set"),
        }
    }
}
