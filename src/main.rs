mod ui;

use std::{
    error::Error,
    fs::{self, File, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant},
};

use chrono::{Local, NaiveDate};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use keypace::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    ghost::Ghost,
    goals::GoalSpec,
    input::action_for_key,
    runtime::{AppEvent, CrosstermEvents, EventSource, Runner, TICK_RATE},
    session::{Applied, Session, TestMode},
    stats::StatsDb,
    tracker::{FinishReport, Tracker},
    words::{session_words, BundledText, TextSupply},
};
use log::{info, warn};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use time_humanize::{Accuracy, HumanTime, Tense};

/// typing practice in the terminal, with ghosts, goals and history
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// test mode; remembered for the next run
    #[clap(short, long, value_enum)]
    mode: Option<TestMode>,

    /// seconds for a timed test (implies --mode time)
    #[clap(short, long)]
    seconds: Option<u32>,

    /// number of words for a word-count test (implies --mode words)
    #[clap(short, long)]
    words: Option<usize>,

    /// capitalize sentences and add punctuation
    #[clap(long)]
    punctuation: bool,

    /// mix numbers into the word stream
    #[clap(long)]
    numbers: bool,

    /// race a replay of your best result in the same configuration
    #[clap(long, overrides_with = "no_ghost")]
    ghost: bool,

    /// do not show the ghost cursor
    #[clap(long)]
    no_ghost: bool,

    /// record results under this user id
    #[clap(short, long)]
    user: Option<String>,

    /// set a practice goal, e.g. tests:daily:5 or wpm:weekly:80 (repeatable)
    #[clap(long = "goal", value_name = "KIND:PERIOD:TARGET")]
    goals: Vec<GoalSpec>,

    /// print recent results and exit
    #[clap(long)]
    history: bool,

    /// export every result as CSV to this path and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

impl Cli {
    /// Flags given on the command line win over the stored config.
    fn apply(&self, cfg: &mut Config) {
        if let Some(secs) = self.seconds {
            cfg.duration_secs = secs;
            cfg.mode = TestMode::Time;
        }
        if let Some(words) = self.words {
            cfg.word_count = words;
            cfg.mode = TestMode::Words;
        }
        if let Some(mode) = self.mode {
            cfg.mode = mode;
        }
        cfg.punctuation |= self.punctuation;
        cfg.numbers |= self.numbers;
        if self.ghost {
            cfg.ghost = true;
        }
        if self.no_ghost {
            cfg.ghost = false;
        }
        if let Some(user) = &self.user {
            cfg.user_id = user.clone();
        }
    }

    /// Goals given on the command line start their bucket today.
    fn apply_goals(&self, tracker: &mut Tracker, today: NaiveDate) {
        for spec in &self.goals {
            info!("goal set: {} {} {}", spec.period, spec.kind, spec.target);
            tracker.add_goal(spec.into_goal(today));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Typing,
    Results,
    Stats,
}

pub struct App {
    pub config: Config,
    pub session: Session,
    pub tracker: Tracker,
    pub ghost: Option<Ghost>,
    pub report: Option<FinishReport>,
    pub screen: Screen,
    /// instant of the last event, used for rendering
    pub now: Instant,
    pub should_quit: bool,
    text: Box<dyn TextSupply>,
}

impl App {
    pub fn new(config: Config, tracker: Tracker, text: Box<dyn TextSupply>) -> Self {
        let (session_config, words) =
            session_words(text.as_ref(), &config.session_config(), config.word_options());
        let mut app = Self {
            session: Session::new(session_config, words),
            config,
            tracker,
            ghost: None,
            report: None,
            screen: Screen::Typing,
            now: Instant::now(),
            should_quit: false,
            text,
        };
        app.attach_ghost(true);
        app
    }

    /// Race the best previous result in the current configuration.
    ///
    /// The ghost walks the reference result's words, so the live session
    /// has to type the same stream. With `adopt_words` the session takes
    /// those words over; otherwise the ghost is only kept when the words
    /// already match.
    fn attach_ghost(&mut self, adopt_words: bool) {
        self.ghost = None;
        if !self.config.ghost {
            return;
        }
        let Some(source) = self.tracker.ghost_source(self.session.config()) else {
            return;
        };
        let ghost = Ghost::from_result(source);
        if !ghost.is_active() {
            return;
        }
        if source.words != self.session.words() {
            if !adopt_words {
                return;
            }
            let words = source.words.clone();
            self.session.reset(words);
        }
        self.ghost = Some(ghost);
    }

    /// Fresh words under the current config; also abandons a running test.
    pub fn new_test(&mut self) {
        let (session_config, words) = session_words(
            self.text.as_ref(),
            &self.config.session_config(),
            self.config.word_options(),
        );
        self.session.reset_with(session_config, words);
        self.report = None;
        self.screen = Screen::Typing;
        self.attach_ghost(true);
    }

    /// Same words again
    pub fn retry(&mut self) {
        let words = self.session.words().to_vec();
        self.session.reset(words);
        self.report = None;
        self.screen = Screen::Typing;
        self.attach_ghost(false);
    }

    pub fn on_tick(&mut self, now: Instant) {
        self.now = now;
        if self.screen == Screen::Typing && self.session.tick_at(now) {
            self.finish(now);
        }
    }

    pub fn on_key(&mut self, key: KeyEvent, now: Instant) {
        self.now = now;
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.screen {
            Screen::Typing => self.on_typing_key(key, now),
            Screen::Results => match key.code {
                KeyCode::Esc => self.should_quit = true,
                KeyCode::Char('r') => self.retry(),
                KeyCode::Char('n') | KeyCode::Tab => self.new_test(),
                KeyCode::Char('s') => self.screen = Screen::Stats,
                KeyCode::Char('p') => {
                    self.config.punctuation = !self.config.punctuation;
                    self.save_config();
                    self.new_test();
                }
                KeyCode::Char('#') => {
                    self.config.numbers = !self.config.numbers;
                    self.save_config();
                    self.new_test();
                }
                KeyCode::Char('m') => {
                    self.config.mode = next_mode(self.config.mode);
                    self.save_config();
                    self.new_test();
                }
                _ => {}
            },
            Screen::Stats => match key.code {
                KeyCode::Esc => self.should_quit = true,
                KeyCode::Char('b') | KeyCode::Backspace => {
                    self.screen = if self.report.is_some() {
                        Screen::Results
                    } else {
                        Screen::Typing
                    }
                }
                KeyCode::Char('n') => self.new_test(),
                _ => {}
            },
        }
    }

    fn on_typing_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            // zen never ends by itself
            KeyCode::Esc
                if self.session.config().mode == TestMode::Zen && self.session.is_running() =>
            {
                self.finish(now);
            }
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.new_test(),
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.screen = Screen::Stats;
            }
            _ => {
                let Some(action) = action_for_key(key) else {
                    return;
                };
                match self.session.apply_at(action, now) {
                    Applied::FinishRequested => self.finish(now),
                    Applied::Typed(_) if self.session.is_complete_at(now) => self.finish(now),
                    _ => {}
                }
            }
        }
    }

    fn finish(&mut self, now: Instant) {
        if let Some(report) = self.tracker.finish(&mut self.session, now) {
            info!(
                "{} finished: {} wpm, {}% accuracy{}",
                report.result.configuration_label(),
                report.result.wpm,
                report.result.accuracy,
                if report.result.is_personal_best { " (personal best)" } else { "" }
            );
            self.report = Some(report);
            self.screen = Screen::Results;
        }
    }

    fn save_config(&self) {
        if let Err(e) = FileConfigStore::new().save(&self.config) {
            warn!("could not save config: {e}");
        }
    }
}

fn next_mode(mode: TestMode) -> TestMode {
    match mode {
        TestMode::Time => TestMode::Words,
        TestMode::Words => TestMode::Quote,
        TestMode::Quote => TestMode::Zen,
        TestMode::Zen => TestMode::Time,
    }
}

/// Log to a file in the state directory; stderr would tear the alternate screen.
fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

fn open_tracker(user_id: &str) -> Tracker {
    let restored = StatsDb::new().and_then(|db| Tracker::restore(user_id, Box::new(db)));
    match restored {
        Ok(tracker) => tracker,
        Err(e) => {
            warn!("running without saved history: {e}");
            Tracker::new(user_id)
        }
    }
}

fn print_history(tracker: &Tracker) {
    let history = tracker.history();
    if history.is_empty() {
        println!("no results yet");
        return;
    }
    let summary = history.summary();
    println!(
        "{} tests, best {} wpm, average {:.0} wpm at {:.0}% accuracy, {:.0} minutes typed",
        summary.tests,
        summary.best_wpm,
        summary.average_wpm,
        summary.average_accuracy,
        summary.total_secs / 60.0
    );
    println!(
        "practice streak: {} days (longest {})",
        tracker.streak().current_on(Local::now().date_naive()),
        tracker.streak().longest
    );
    let now = Local::now();
    for result in history.results().iter().take(20) {
        let age = (now - result.timestamp).to_std().unwrap_or(Duration::ZERO);
        println!(
            "{:>16}  {:<10} {:>4} wpm {:>4}% acc{}",
            HumanTime::from(age).to_text_en(Accuracy::Rough, Tense::Past),
            result.configuration_label(),
            result.wpm,
            result.accuracy,
            if result.is_personal_best { "  pb" } else { "" }
        );
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply(&mut config);
    if let Err(e) = store.save(&config) {
        warn!("could not save config to {}: {e}", store.path().display());
    }

    let mut tracker = open_tracker(&config.user_id);
    cli.apply_goals(&mut tracker, Local::now().date_naive());

    if cli.history {
        print_history(&tracker);
        return Ok(());
    }
    if let Some(path) = &cli.export {
        tracker.history().export_csv(File::create(path)?)?;
        println!("exported {} results to {}", tracker.history().len(), path.display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let text = BundledText::load()?;
    let mut app = App::new(config, tracker, Box::new(text));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = run_app(&mut terminal, &mut app, Runner::new(CrosstermEvents::new(), TICK_RATE));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn run_app<B: Backend, E: EventSource>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut runner: Runner<E>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui(app, f))?;
    while !app.should_quit {
        match runner.step() {
            AppEvent::Tick => {
                app.on_tick(Instant::now());
                if app.session.is_running() || app.screen != Screen::Typing {
                    terminal.draw(|f| ui(app, f))?;
                }
            }
            AppEvent::Resize => {
                terminal.draw(|f| ui(app, f))?;
            }
            AppEvent::Key(key) => {
                app.on_key(key, Instant::now());
                terminal.draw(|f| ui(app, f))?;
            }
        }
    }
    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}
