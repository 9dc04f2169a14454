use calendar_core::grid::{month_label, week_dates, week_label, weeks_of_month};
use calendar_core::recurrence::{expand, next_occurrence_from};
use calendar_core::*;
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "kal")]
#[command(about = "Calendar with recurring events", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the occurrence after a date
    Next {
        #[arg(long)]
        date: CalendarDate,

        /// daily, weekly, monthly or yearly
        #[arg(long)]
        freq: RecurrenceFrequency,

        #[arg(long, default_value_t = 1)]
        interval: u32,
    },

    /// List every occurrence of a rule
    Expand {
        #[arg(long)]
        start: CalendarDate,

        #[arg(long)]
        freq: RecurrenceFrequency,

        #[arg(long, default_value_t = 1)]
        interval: u32,

        #[command(flatten)]
        end: EndArgs,
    },

    /// Create an event (one row per occurrence if recurring)
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        date: CalendarDate,

        /// Start time (HH:MM)
        #[arg(long, value_parser = parse_hhmm)]
        start: chrono::NaiveTime,

        /// End time (HH:MM)
        #[arg(long, value_parser = parse_hhmm)]
        end: chrono::NaiveTime,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, default_value = "")]
        location: String,

        #[arg(long, default_value = "")]
        category: String,

        /// Minutes before start to notify (defaults to config)
        #[arg(long)]
        notify: Option<u32>,

        /// Repeat frequency; omit for a one-off event
        #[arg(long)]
        freq: Option<RecurrenceFrequency>,

        #[arg(long, default_value_t = 1)]
        interval: u32,

        #[command(flatten)]
        repeat_end: EndArgs,
    },

    /// List stored events
    List {
        /// Only events in this month (YYYY-MM)
        #[arg(long, conflicts_with = "date")]
        month: Option<String>,

        /// Only events on this day
        #[arg(long)]
        date: Option<CalendarDate>,
    },

    /// Find events by title, description or location
    Search { term: String },

    /// Change fields of one event; an edited occurrence leaves its series
    Edit(EditArgs),

    /// Delete a single event or occurrence
    Delete { id: Uuid },

    /// Delete every occurrence of a recurring series
    DeleteSeries { group_id: Uuid },

    /// Print a month grid, marking days with events
    Month {
        /// Month to show (YYYY-MM); defaults to the current month
        #[arg(long)]
        month: Option<String>,
    },

    /// List the Sunday-first week containing a date
    Week {
        /// Any day of the week; defaults to today
        #[arg(long)]
        date: Option<CalendarDate>,
    },

    /// Show notifications due at a moment
    Notify {
        /// Moment to check (YYYY-MM-DDTHH:MM); defaults to now
        #[arg(long, value_parser = parse_moment)]
        now: Option<NaiveDateTime>,
    },
}

#[derive(Args)]
struct EndArgs {
    /// Last possible occurrence date (inclusive)
    #[arg(long, conflicts_with = "count")]
    until: Option<CalendarDate>,

    /// Number of occurrences
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_OCCURRENCES)))]
    count: Option<u32>,
}

#[derive(Args)]
struct EditArgs {
    id: Uuid,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    date: Option<CalendarDate>,

    /// Start time (HH:MM)
    #[arg(long, value_parser = parse_hhmm)]
    start: Option<chrono::NaiveTime>,

    /// End time (HH:MM)
    #[arg(long, value_parser = parse_hhmm)]
    end: Option<chrono::NaiveTime>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    category: Option<String>,

    /// Minutes before start to notify
    #[arg(long)]
    notify: Option<u32>,
}

impl EditArgs {
    /// Overwrite the fields given on the command line.
    fn apply(self, fields: &mut EventDraft) {
        if let Some(title) = self.title {
            fields.title = title;
        }
        if let Some(date) = self.date {
            fields.date = date;
        }
        if let Some(start) = self.start {
            fields.start_time = start;
        }
        if let Some(end) = self.end {
            fields.end_time = end;
        }
        if let Some(description) = self.description {
            fields.description = description;
        }
        if let Some(location) = self.location {
            fields.location = location;
        }
        if let Some(category) = self.category {
            fields.category = category;
        }
        if let Some(minutes) = self.notify {
            fields.notification_minutes = minutes;
        }
    }
}

impl EndArgs {
    fn repeat_end(&self) -> RepeatEnd {
        match (self.until, self.count) {
            (Some(date), _) => RepeatEnd::Date { date },
            (None, Some(occurrences)) => RepeatEnd::Count { occurrences },
            (None, None) => RepeatEnd::None,
        }
    }
}

fn parse_hhmm(s: &str) -> std::result::Result<chrono::NaiveTime, String> {
    parse_time(s).map_err(|e| e.to_string())
}

fn parse_moment(s: &str) -> std::result::Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .map_err(|_| format!("Invalid moment {:?}: expected YYYY-MM-DDTHH:MM", s))
}

/// First day of a `YYYY-MM` month
fn parse_month(s: &str) -> Result<CalendarDate> {
    format!("{}-01", s)
        .parse()
        .map_err(|_| Error::DateParse(s.to_string()))
}

fn today() -> CalendarDate {
    CalendarDate::from(chrono::Local::now().date_naive())
}

fn main() -> Result<()> {
    calendar_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());
    let store = JsonFileStore::in_dir(&data_dir);
    tracing::debug!("Using events file {:?}", store.path());

    match cli.command {
        Commands::Next {
            date,
            freq,
            interval,
        } => cmd_next(date, freq, interval),
        Commands::Expand {
            start,
            freq,
            interval,
            end,
        } => cmd_expand(start, freq, interval, end.repeat_end()),
        Commands::Add {
            title,
            date,
            start,
            end,
            description,
            location,
            category,
            notify,
            freq,
            interval,
            repeat_end,
        } => {
            let repeat = match freq {
                Some(frequency) => RepeatInfo {
                    kind: frequency.into(),
                    interval: RecurrenceInterval::new(interval)?.get(),
                    end: repeat_end.repeat_end(),
                    group_id: None,
                },
                None => RepeatInfo::none(),
            };
            let draft = EventDraft {
                title,
                date,
                start_time: start,
                end_time: end,
                description,
                location,
                category,
                repeat,
                notification_minutes: notify.unwrap_or(config.notifications.default_minutes),
            };
            cmd_add(&store, draft, &config)
        }
        Commands::List { month, date } => cmd_list(&store, month, date),
        Commands::Search { term } => cmd_search(&store, &term),
        Commands::Edit(args) => cmd_edit(&store, args),
        Commands::Delete { id } => cmd_delete(&store, id),
        Commands::DeleteSeries { group_id } => cmd_delete_series(&store, group_id),
        Commands::Month { month } => cmd_month(&store, month),
        Commands::Week { date } => cmd_week(&store, date.unwrap_or_else(today)),
        Commands::Notify { now } => cmd_notify(&store, &data_dir, now),
    }
}

fn cmd_next(date: CalendarDate, freq: RecurrenceFrequency, interval: u32) -> Result<()> {
    let next = next_occurrence_from(date, freq, RecurrenceInterval::new(interval)?)?;
    println!("{}", next);
    Ok(())
}

fn cmd_expand(
    start: CalendarDate,
    freq: RecurrenceFrequency,
    interval: u32,
    end: RepeatEnd,
) -> Result<()> {
    let rule = RecurrenceRule {
        frequency: freq,
        interval: RecurrenceInterval::new(interval)?,
        end: EndCondition::try_from(end)?,
    };
    for date in expand(start, &rule)? {
        println!("{}", date);
    }
    Ok(())
}

fn cmd_add(store: &JsonFileStore, draft: EventDraft, config: &Config) -> Result<()> {
    let horizon = config.recurrence.open_ended_horizon_months;
    let (created, clashes) = store.update(|calendar| {
        let created = calendar.add_draft(draft, horizon)?;
        let clashes: Vec<String> = created
            .iter()
            .flat_map(|event| calendar.overlapping(event))
            .filter(|other| !created.iter().any(|c| c.id == other.id))
            .map(describe)
            .collect();
        Ok((created, clashes))
    })?;

    println!("✓ Created {} event(s)", created.len());
    if let Some(group) = created.first().and_then(|e| e.group_id()) {
        println!("  Series: {}", group);
    }
    for event in &created {
        println!("  {}", describe(event));
    }

    if !clashes.is_empty() {
        println!();
        println!("⚠ Overlaps with existing events:");
        for clash in clashes {
            println!("  {}", clash);
        }
    }
    Ok(())
}

fn cmd_list(store: &JsonFileStore, month: Option<String>, date: Option<CalendarDate>) -> Result<()> {
    let calendar = store.load()?;

    let events: Vec<&Event> = match (month, date) {
        (Some(month), _) => {
            let first = parse_month(&month)?;
            let last = CalendarDate::from_ymd(
                first.year(),
                first.month(),
                grid::days_in_month(first.year(), first.month()),
            )?;
            calendar.events_between(first, last)
        }
        (None, Some(date)) => calendar.events_on(date),
        (None, None) => calendar.events().iter().collect(),
    };

    print_events(&events);
    Ok(())
}

fn cmd_search(store: &JsonFileStore, term: &str) -> Result<()> {
    let calendar = store.load()?;
    print_events(&calendar.search(term));
    Ok(())
}

fn cmd_edit(store: &JsonFileStore, args: EditArgs) -> Result<()> {
    let id = args.id;
    let (previous_group, updated) = store.update(|calendar| {
        let mut event = calendar.get(id).cloned().ok_or(Error::NotFound(id))?;
        let previous_group = event.group_id();
        args.apply(&mut event.fields);
        let updated = calendar.update(event)?;
        Ok((previous_group, updated))
    })?;

    println!("✓ Updated {}", describe(&updated));
    if let Some(group) = previous_group {
        println!("  Detached from series {}", group);
    }
    Ok(())
}

fn cmd_delete(store: &JsonFileStore, id: Uuid) -> Result<()> {
    let removed = store.update(|calendar| calendar.delete(id))?;
    println!("✓ Deleted {}", describe(&removed));
    Ok(())
}

fn cmd_delete_series(store: &JsonFileStore, group_id: Uuid) -> Result<()> {
    let removed = store.update(|calendar| Ok(calendar.delete_series(group_id)))?;
    if removed == 0 {
        return Err(Error::NotFound(group_id));
    }
    println!("✓ Deleted {} occurrences", removed);
    Ok(())
}

fn cmd_month(store: &JsonFileStore, month: Option<String>) -> Result<()> {
    let first = match month {
        Some(month) => parse_month(&month)?,
        None => {
            let today = today();
            CalendarDate::from_ymd(today.year(), today.month(), 1)?
        }
    };
    let calendar = store.load()?;

    println!("{}", month_label(first));
    println!("  Sun  Mon  Tue  Wed  Thu  Fri  Sat");
    for week in weeks_of_month(first) {
        let mut line = String::new();
        for cell in week {
            match cell {
                Some(day) => {
                    let date = CalendarDate::from_ymd(first.year(), first.month(), day)?;
                    let marker = if calendar.events_on(date).is_empty() { ' ' } else { '*' };
                    line.push_str(&format!("  {:>2}{}", day, marker));
                }
                None => line.push_str("     "),
            }
        }
        println!("{}", line.trim_end());
    }
    println!("  * = has events");
    Ok(())
}

fn cmd_week(store: &JsonFileStore, date: CalendarDate) -> Result<()> {
    let calendar = store.load()?;

    println!("{}", week_label(date));
    for day in week_dates(date) {
        let events = calendar.events_on(day);
        println!("{} {}", day, day.naive().format("%a"));
        for event in events {
            println!("    {}", describe(event));
        }
    }
    Ok(())
}

fn cmd_notify(
    store: &JsonFileStore,
    data_dir: &std::path::Path,
    now: Option<NaiveDateTime>,
) -> Result<()> {
    let now = now.unwrap_or_else(|| chrono::Local::now().naive_local());
    let calendar = store.load()?;

    let tracker_path = NotificationTracker::path_in(data_dir);
    let mut tracker = NotificationTracker::load(&tracker_path)?;
    tracker.retain_known(calendar.events());
    let due = tracker.due(calendar.events(), now);
    tracker.save(&tracker_path)?;

    if due.is_empty() {
        println!("No upcoming events.");
    }
    for notification in due {
        println!("🔔 {}", notification.message);
    }
    Ok(())
}

fn describe(event: &Event) -> String {
    format!(
        "{} {}-{}  {}  [{}]",
        event.fields.date,
        event.fields.start_time.format("%H:%M"),
        event.fields.end_time.format("%H:%M"),
        event.fields.title,
        event.id
    )
}

fn print_events(events: &[&Event]) {
    if events.is_empty() {
        println!("No events.");
        return;
    }
    for event in events {
        let marker = if event.group_id().is_some() { "↻ " } else { "" };
        println!("{}{}", marker, describe(event));
    }
}
