use log::*;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use structopt::StructOpt;
use trackboard::board::Board;
use trackboard::color::style_for;
use trackboard::command::Command;
use trackboard::config::BoardConfig;
use trackboard::error::BoardError;
use trackboard::model::{format_hhmm, validate_train, ScheduleFile, ScheduleState};
use trackboard::notify::LogNotifier;
use trackboard::persistence::{JsonFileStore, SnapshotStore};

#[derive(Debug)]
pub enum OutputFormat {
    Schedule,
    Session,
}

impl FromStr for OutputFormat {
    type Err = &'static str;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schedule" => Ok(OutputFormat::Schedule),
            "session" => Ok(OutputFormat::Session),
            _ => Err("Could not parse output format."),
        }
    }
}

#[derive(Debug, StructOpt)]
#[structopt(name = "trackboard", about = "Train schedule board.")]
struct Opt {
    /// Schedule file (tracks, trains and viewport as JSON)
    #[structopt(name = "FILE")]
    #[structopt(parse(from_os_str))]
    file: PathBuf,

    /// Board configuration JSON. Missing fields use defaults.
    #[structopt(short, long)]
    #[structopt(parse(from_os_str))]
    config: Option<PathBuf>,

    /// JSON list of commands to apply to the schedule, in order.
    #[structopt(short, long)]
    #[structopt(parse(from_os_str))]
    replay: Option<PathBuf>,

    /// Write the resulting board to this file.
    #[structopt(short, long)]
    #[structopt(parse(from_os_str))]
    output: Option<PathBuf>,

    /// "schedule" writes a plain schedule file, "session" writes the
    /// schedule together with its undo history.
    #[structopt(long, default_value = "schedule")]
    output_format: OutputFormat,

    /// Comma separated train numbers to highlight.
    #[structopt(long)]
    search: Option<String>,

    /// Viewport width in pixels, used to pick the search scroll offset.
    #[structopt(long, default_value = "1200")]
    viewport_width: f64,

    /// Activate debug mode
    #[structopt(short, long)]
    verbose: bool,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, BoardError> {
    trace!("Loading file {}", path.display());
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn run(opt: &Opt) -> Result<(), BoardError> {
    let mut board = {
        let _h = hprof::enter("load");
        let config = match &opt.config {
            Some(path) => BoardConfig::load(path)?,
            None => BoardConfig::default(),
        };
        let file: ScheduleFile = read_json(&opt.file)?;
        let state = ScheduleState::from_file(file);
        for train in state.trains.values() {
            if let Err(e) = validate_train(train, &state.tracks, config.min_service_minutes) {
                warn!("Loaded schedule has an invalid train: {}", e);
            }
        }
        info!(
            "Loaded {} tracks and {} trains",
            state.tracks.len(),
            state.trains.len()
        );
        Board::new(state, config, LogNotifier)
    };

    if let Some(path) = &opt.replay {
        let _h = hprof::enter("replay");
        let commands: Vec<Command> = read_json(path)?;
        let mut changed = 0;
        for (i, command) in commands.into_iter().enumerate() {
            match board.apply(command) {
                Ok(true) => changed += 1,
                Ok(false) => {}
                Err(e) => warn!("Command {} rejected: {}", i, e),
            }
        }
        info!("Replay done, {} commands changed the board", changed);
    }

    {
        let _h = hprof::enter("layout");
        let positioned = board.positioned();
        let state = board.state();
        let viewport = state.viewport;
        println!(
            "View {} to {}",
            format_hhmm(viewport.start_minutes()),
            format_hhmm(viewport.start_minutes() + viewport.view_hours * 60)
        );
        for row in board.layout() {
            let name = state
                .track(row.track)
                .map(|t| t.name.as_str())
                .unwrap_or("?");
            println!(
                "Track {:<8} top {:>6.1} height {:>5.1} lanes {}",
                name, row.top, row.height, row.lanes
            );
            for p in positioned.iter().filter(|p| p.top >= row.top && p.top < row.top + row.height) {
                let train = &state.trains[&p.id];
                let style = style_for(train, &board.config().colors);
                println!(
                    "  {:<10} {}-{} x {:>7.1} w {:>6.1} {} {} text {}",
                    train.label(),
                    format_hhmm(train.start),
                    format_hhmm(train.end),
                    p.left,
                    p.width,
                    style.bucket,
                    style.background,
                    style.text.hex()
                );
            }
        }
        let unplaced = board.not_laid_out();
        if !unplaced.is_empty() {
            println!("{} trains not laid out: {:?}", unplaced.len(), unplaced);
        }
    }

    if let Some(query) = &opt.search {
        let _h = hprof::enter("search");
        let highlight = board.search(query, opt.viewport_width);
        if highlight.is_cleared() {
            println!("Search cleared");
        } else {
            println!(
                "Search {:?}: {} matched, {} dimmed, {} visible at once",
                query,
                highlight.matched.len(),
                highlight.dimmed.len(),
                highlight.max_visible
            );
            if let Some(offset) = highlight.scroll_offset {
                let view_left = board.state().viewport.scroll_left(board.config().pixels_per_minute);
                println!("Scroll to {:.1} ({:+.1} from the current view)", offset, offset - view_left);
            }
        }
    }

    let status = board.status();
    debug!("History: {:#?}", board.history().summary());
    println!(
        "Undo: {} ({}), redo: {} ({})",
        status.undo_description.as_deref().unwrap_or("-"),
        status.undo_depth,
        status.redo_description.as_deref().unwrap_or("-"),
        status.redo_depth
    );

    if let Some(path) = &opt.output {
        let _h = hprof::enter("write");
        match opt.output_format {
            OutputFormat::Schedule => {
                let file = std::fs::File::create(path)?;
                serde_json::to_writer_pretty(file, &board.state().to_file())?;
            }
            OutputFormat::Session => {
                JsonFileStore::new(path).save(&board.persisted())?;
            }
        }
        info!("Wrote board to file {}", path.display());
    }

    Ok(())
}

fn main() {
    let _h1 = hprof::enter("init");

    let opt = Opt::from_args();
    let level = if opt.verbose {
        if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    } else {
        LevelFilter::Error
    };
    if let Err(e) = simple_logger::SimpleLogger::new().with_level(level).init() {
        eprintln!("Could not set up logging: {}", e);
    }
    info!("{:#?}", opt);
    drop(_h1);

    let result = run(&opt);

    hprof::end_frame();
    if opt.verbose {
        hprof::profiler().print_timing();
    }

    if let Err(e) = result {
        error!("{}", e);
        eprintln!("trackboard: {}", e);
        std::process::exit(1);
    }
}
