use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};

use toodi::aggregate::AggregateResult;
use toodi::chart::{Bar, RaceChart, sphere_layout};
use toodi::config::{Config, default_config_path, load_config, save_config};
use toodi::{EntityKind, HistorySource, load, logging};

const BAR_COLUMNS: usize = 40;
const MS_PER_MINUTE: u64 = 60_000;

#[derive(Parser)]
#[command(
    name = "toodi",
    version,
    about = "Rank and replay a music streaming history"
)]
struct Cli {
    #[arg(long, value_name = "PATH", global = true)]
    config_path: Option<PathBuf>,
    #[arg(long, global = true, help = "Log filter, e.g. debug or toodi=trace")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the top artists and tracks.
    Summary(SourceArgs),
    /// Write the aggregate as JSON.
    Export {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, short, value_name = "PATH", help = "Write to a file instead of stdout")]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = false, help = "Single-line JSON")]
        compact: bool,
    },
    /// Print each day's top list.
    Days {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, value_enum, default_value_t = Kind::Artists)]
        kind: Kind,
    },
    /// Replay the days as a cumulative bar chart.
    Race {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, value_enum, default_value_t = Kind::Artists)]
        kind: Kind,
        #[arg(long, help = "Number of bars per frame")]
        bars: Option<usize>,
    },
    /// Print the sphere scene layout as JSON.
    Scene(SourceArgs),
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    Show,
    Set {
        #[arg(long, help = "Default history file, directory or URL")]
        history: Option<String>,
        #[arg(long)]
        top_n: Option<usize>,
        #[arg(long)]
        chart_bars: Option<usize>,
        #[arg(long)]
        min_ms_played: Option<u64>,
        #[arg(long = "default-log-level")]
        log_level: Option<String>,
    },
}

#[derive(Args)]
struct SourceArgs {
    #[arg(help = "History file, StreamingHistory directory or URL")]
    source: Option<String>,
    #[arg(long, help = "Entries per top list")]
    top_n: Option<usize>,
    #[arg(long, help = "Plays at or below this are skipped")]
    min_ms_played: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Artists,
    Tracks,
}

impl From<Kind> for EntityKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Artists => EntityKind::Artist,
            Kind::Tracks => EntityKind::Track,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path.unwrap_or_else(default_config_path);
    let config = load_config(&config_path)?;
    logging::init(cli.log_level.as_deref().unwrap_or(&config.log_level));

    match cli.command {
        Commands::Summary(args) => {
            let result = load_result(&config, &args)?;
            print_summary(&result);
        }
        Commands::Export {
            source,
            output,
            compact,
        } => {
            let result = load_result(&config, &source)?;
            let json = if compact {
                serde_json::to_string(&result)
            } else {
                serde_json::to_string_pretty(&result)
            }
            .context("Failed serializing aggregate to JSON")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, format!("{json}\n"))
                        .with_context(|| format!("Failed writing {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Days { source, kind } => {
            let result = load_result(&config, &source)?;
            print_days(&result, kind.into());
        }
        Commands::Race { source, kind, bars } => {
            let result = load_result(&config, &source)?;
            let bars = bars.unwrap_or(config.chart_bars);
            if bars == 0 {
                bail!("The chart needs at least one bar.");
            }
            print_race(&result, kind.into(), bars)?;
        }
        Commands::Scene(args) => {
            let result = load_result(&config, &args)?;
            let layout = serde_json::to_string_pretty(&sphere_layout(&result.top_artists))
                .context("Failed serializing scene layout")?;
            println!("{layout}");
        }
        Commands::Config { command } => handle_config(command, config, &config_path)?,
    }
    Ok(())
}

fn handle_config(command: ConfigCommand, mut config: Config, config_path: &Path) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let shown =
                serde_json::to_string_pretty(&config).context("Failed serializing config")?;
            println!("{shown}");
        }
        ConfigCommand::Set {
            history,
            top_n,
            chart_bars,
            min_ms_played,
            log_level,
        } => {
            if let Some(history) = history {
                config.history = Some(history);
            }
            if let Some(top_n) = top_n {
                config.top_n = top_n;
            }
            if let Some(chart_bars) = chart_bars {
                config.chart_bars = chart_bars;
            }
            if let Some(min_ms_played) = min_ms_played {
                config.min_ms_played = min_ms_played;
            }
            if let Some(log_level) = log_level {
                config.log_level = log_level;
            }
            save_config(&config, config_path)?;
            println!("Saved settings in {}", config_path.display());
        }
    }
    Ok(())
}

fn load_result(config: &Config, args: &SourceArgs) -> Result<AggregateResult> {
    let Some(source) = args.source.as_deref().or(config.history.as_deref()) else {
        bail!("No history given. Pass a source or run `toodi config set --history`.");
    };
    let source = HistorySource::parse(source);
    let mut settings = config.aggregate_settings();
    if let Some(top_n) = args.top_n {
        settings.top_n = top_n;
    }
    if let Some(min_ms_played) = args.min_ms_played {
        settings.min_ms_played = min_ms_played;
    }
    load(&source, settings).with_context(|| format!("Failed loading history from {source}"))
}

fn print_summary(result: &AggregateResult) {
    if result.top_artists.is_empty() {
        println!("No plays longer than the skip threshold.");
        return;
    }
    println!("Top artists");
    for (idx, artist) in result.top_artists.iter().enumerate() {
        println!(
            "{:>3}. {}\t{} min",
            idx + 1,
            artist.name,
            minutes(artist.ms_played)
        );
    }
    println!("Top tracks");
    for (idx, track) in result.top_tracks.iter().enumerate() {
        println!(
            "{:>3}. {} - {}\t{} plays, {} min, last {}",
            idx + 1,
            track.track_name,
            track.artist_name,
            track.replays,
            minutes(track.ms_played),
            track.last_end_time
        );
    }
    println!(
        "Top artist playtime: {} min",
        minutes(result.total_playtime_top_artist)
    );
    println!(
        "Top track playtime: {} min",
        minutes(result.total_playtime_top_track)
    );
}

fn print_days(result: &AggregateResult, kind: EntityKind) {
    for (date, entries) in result.top_for_day.days(kind) {
        println!("{date}");
        for entry in entries {
            println!("  {}\t{} min", entry.name, minutes(entry.ms_played));
        }
    }
}

fn print_race(result: &AggregateResult, kind: EntityKind, bars: usize) -> Result<()> {
    let mut chart = RaceChart::new(result, kind, bars);
    let mut stdout = std::io::stdout().lock();
    for frame in chart.by_ref() {
        writeln!(stdout, "{}", frame.date)?;
        write_bars(&mut stdout, &frame.bars)?;
    }
    writeln!(stdout, "Your top {} {} for the whole history", bars, kind.label())?;
    write_bars(&mut stdout, &chart.standings())?;
    Ok(())
}

fn write_bars(out: &mut impl Write, bars: &[Bar]) -> Result<()> {
    for bar in bars {
        let width = (bar.width_fraction * BAR_COLUMNS as f64).round() as usize;
        writeln!(
            out,
            "  {:<columns$} {} ({} min)",
            "#".repeat(width.max(1)),
            bar.name,
            bar.minutes,
            columns = BAR_COLUMNS
        )?;
    }
    Ok(())
}

fn minutes(ms: u64) -> u64 {
    ms / MS_PER_MINUTE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(name: &str, width_fraction: f64) -> Bar {
        Bar {
            name: name.to_string(),
            cumulative_ms: 0,
            minutes: 3,
            width_fraction,
        }
    }

    #[test]
    fn bar_labels_line_up_after_the_widest_bar() {
        let mut out = Vec::new();
        write_bars(&mut out, &[bar("A", 1.0), bar("B", 0.5)]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], format!("  {} A (3 min)", "#".repeat(BAR_COLUMNS)));
        assert_eq!(
            lines[1],
            format!("  {}{} B (3 min)", "#".repeat(BAR_COLUMNS / 2), " ".repeat(BAR_COLUMNS / 2))
        );
    }
}
