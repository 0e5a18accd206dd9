// Controllers for the Next Train Arrivals live view
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use futures::FutureExt;
use geo::Point;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;

use crate::nta_config::Config;
use crate::nta_directions::{DirectionGroup, DirectionGrouper};
use crate::nta_models::{
    ArrivalsFeed, CongestionFeed, CongestionReading, FeedTransport, Lang, NTAError, Result,
    TrainRecord,
};
use crate::nta_poller::{CancelToken, Poller};
use crate::nta_session::{Session, SessionStore, sanitize_search, to_fragment};
use crate::nta_station_graph::StationGraph;
use crate::nta_trains::{CellId, TrainCell, TrainStore};
use crate::nta_views::NTAViews;

/// Everything a render needs besides the station view itself.
pub struct AppState {
    pub graph: StationGraph,
    pub lang: Lang,
    pub now: DateTime<Utc>,
    pub feed_tz: Tz,
    pub near: Option<Point<f64>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CongestionArgs {
    pub line: String,
    pub train: String,
    pub lang: Lang,
}

impl CongestionArgs {
    fn of(cell: &TrainCell, lang: Lang) -> Self {
        CongestionArgs {
            line: cell.record().line.clone(),
            train: cell.record().train.clone(),
            lang,
        }
    }
}

/// Arrivals are tagged with the station they were fetched for.
pub type ArrivalsPoller = Poller<String, (String, Vec<TrainRecord>)>;
pub type CongestionPoller = Poller<CongestionArgs, Vec<CongestionReading>>;

// ============================================================================
// Station view
// ============================================================================

/// Live arrivals of one station: the arrivals poller feeding the train store,
/// the direction groups built on top of it, and one congestion poller per
/// expanded train.
pub struct StationView {
    station_id: String,
    supported_lines: Vec<String>,
    arrivals: ArrivalsPoller,
    congestion: HashMap<CellId, CongestionPoller>,
    trains: TrainStore,
    directions: DirectionGrouper,
    congestion_feed: CongestionFeed,
    congestion_interval: Duration,
}

impl StationView {
    pub fn new(
        station_id: &str,
        config: &Config,
        arrivals_feed: ArrivalsFeed,
        congestion_feed: CongestionFeed,
    ) -> Self {
        let arrivals = Poller::new(
            "arrivals",
            config.arrivals_interval,
            move |station: String, token: CancelToken| {
                let request = arrivals_feed.upcoming(&station);
                async move {
                    let records = request.await;
                    token.check()?;
                    records.map(|records| (station, records))
                }
                .boxed()
            },
        );

        StationView {
            station_id: station_id.to_string(),
            supported_lines: config.supported_lines.clone(),
            arrivals,
            congestion: HashMap::new(),
            trains: TrainStore::new(),
            directions: DirectionGrouper::new(station_id, config.supported_lines.iter()),
            congestion_feed,
            congestion_interval: config.congestion_interval,
        }
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    /// Points the view at another station. Trains, groups and congestion
    /// pollers of the old station are dropped; arrivals are fetched right away.
    pub fn select_station(&mut self, station_id: &str, now: Instant) {
        if self.station_id == station_id {
            return;
        }
        info!("Switching station {} -> {}", self.station_id, station_id);

        self.station_id = station_id.to_string();
        self.trains.clear();
        self.directions = DirectionGrouper::new(station_id, self.supported_lines.iter());
        for poller in self.congestion.values_mut() {
            poller.teardown();
        }
        self.congestion.clear();
        self.arrivals.update(self.station_id.clone(), now);
    }

    /// Drives every poller's cadence. Congestion pollers pick up a language
    /// change here.
    pub fn tick(&mut self, lang: Lang, now: Instant) {
        self.arrivals.update(self.station_id.clone(), now);
        for (id, poller) in self.congestion.iter_mut() {
            if let Some(cell) = self.trains.get(*id) {
                poller.update(CongestionArgs::of(cell, lang), now);
            }
        }
    }

    pub fn refresh(&mut self, now: Instant) {
        self.arrivals.refresh(now);
        for poller in self.congestion.values_mut() {
            poller.refresh(now);
        }
    }

    pub async fn arrivals_settled(&mut self) -> bool {
        self.arrivals.settled().await
    }

    /// Latest arrivals of the current station. Records still held from the
    /// previous station read as none until the new station answers.
    pub fn current_arrivals(&self) -> Option<&[TrainRecord]> {
        match self.arrivals.value() {
            Some((station, records)) if *station == self.station_id => Some(records),
            _ => None,
        }
    }

    /// Folds the latest arrivals into the train store and regroups.
    pub fn apply_arrivals(&mut self, graph: &StationGraph) {
        let records = match self.arrivals.value() {
            Some((station, records)) if *station == self.station_id => records,
            _ => return,
        };

        let summary = self.trains.reconcile(records);
        for id in &summary.removed {
            if let Some(mut poller) = self.congestion.remove(id) {
                poller.teardown();
            }
        }
        self.directions.regroup(&self.trains, graph);

        debug!(
            "{}: {} trains ({} new, {} kept, {} gone), {} direction groups",
            self.station_id,
            self.trains.len(),
            summary.added.len(),
            summary.updated.len(),
            summary.removed.len(),
            self.directions.len()
        );
        for group in self.directions.groups() {
            debug!(
                "  {:?} {} [{}]: {} trains",
                group.id(),
                group.key(),
                group.line(),
                group.trains().len()
            );
        }
    }

    /// Applies finished congestion runs. Returns whether anything changed.
    pub fn pump_congestion(&mut self) -> bool {
        let mut changed = false;
        for poller in self.congestion.values_mut() {
            changed |= poller.pump();
        }
        changed
    }

    /// Trains in display order: group by group, earliest first. Display
    /// numbers are 1-based positions in this list.
    pub fn visible_trains(&self) -> Vec<CellId> {
        self.directions
            .groups()
            .flat_map(|group| group.trains().iter().copied())
            .collect()
    }

    /// Expands or collapses the train shown as `number`. Expanding starts its
    /// congestion poller, collapsing tears it down.
    pub fn toggle(&mut self, number: usize, lang: Lang, now: Instant) -> Option<bool> {
        let id = *self.visible_trains().get(number.checked_sub(1)?)?;
        let expanded = self.trains.toggle_expanded(id)?;

        if expanded {
            let cell = self.trains.get(id)?;
            let mut poller = self.congestion_poller();
            poller.update(CongestionArgs::of(cell, lang), now);
            self.congestion.insert(id, poller);
        } else if let Some(mut poller) = self.congestion.remove(&id) {
            poller.teardown();
        }
        Some(expanded)
    }

    fn congestion_poller(&self) -> CongestionPoller {
        let feed = self.congestion_feed.clone();
        Poller::new(
            "congestion",
            self.congestion_interval,
            move |args: CongestionArgs, token: CancelToken| {
                let request = feed.cars(&args.line, &args.train, args.lang);
                async move {
                    let cars = request.await;
                    token.check()?;
                    cars
                }
                .boxed()
            },
        )
    }

    /// Earliest moment any poller wants to run again.
    pub fn next_due(&self) -> Option<Instant> {
        self.congestion
            .values()
            .filter_map(Poller::next_due)
            .chain(self.arrivals.next_due())
            .min()
    }

    pub fn teardown(&mut self) {
        self.arrivals.teardown();
        for poller in self.congestion.values_mut() {
            poller.teardown();
        }
    }

    pub fn arrivals(&self) -> &ArrivalsPoller {
        &self.arrivals
    }

    pub fn groups(&self) -> impl Iterator<Item = &DirectionGroup> + '_ {
        self.directions.groups()
    }

    pub fn train(&self, id: CellId) -> Option<&TrainCell> {
        self.trains.get(id)
    }

    pub fn congestion(&self, id: CellId) -> Option<&CongestionPoller> {
        self.congestion.get(&id)
    }
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Expand or collapse a train by its display number
    Toggle(usize),
    Search(String),
    SwitchLang(Lang),
    Refresh,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(input: &str) -> Option<Command> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }

        if let Ok(number) = input.parse::<usize>() {
            return Some(Command::Toggle(number));
        }

        let (word, rest) = input.split_once(' ').unwrap_or((input, ""));
        let rest = rest.trim();
        let command = match (word.to_lowercase().as_str(), rest) {
            ("q" | "quit", "") => Command::Quit,
            ("r" | "refresh", "") => Command::Refresh,
            ("h" | "help" | "?", "") => Command::Help,
            ("s" | "search", text) if !text.is_empty() => Command::Search(text.to_string()),
            ("l" | "lang", code) => match code.parse() {
                Ok(lang) => Command::SwitchLang(lang),
                Err(_) => Command::Unknown(input.to_string()),
            },
            _ => Command::Unknown(input.to_string()),
        };
        Some(command)
    }
}

// ============================================================================
// Application loop
// ============================================================================

pub struct NTAControllers {
    config: Config,
    state: AppState,
    clock: Poller<(), DateTime<Utc>>,
    view: Option<StationView>,
    session: SessionStore,
    arrivals_feed: ArrivalsFeed,
    congestion_feed: CongestionFeed,
    /// Other stations matching the last search
    matches: Vec<String>,
}

impl NTAControllers {
    pub fn new(
        config: Config,
        graph: StationGraph,
        transport: Arc<dyn FeedTransport>,
        mut session: SessionStore,
        start: &Session,
        near: Option<Point<f64>>,
    ) -> Self {
        let clock: Poller<(), DateTime<Utc>> =
            Poller::new("clock", config.clock_interval, |_: (), _: CancelToken| {
                futures::future::ready(Ok::<_, NTAError>(Utc::now())).boxed()
            });
        session.set_lang(start.lang);

        NTAControllers {
            state: AppState {
                graph,
                lang: start.lang,
                now: Utc::now(),
                feed_tz: config.feed_tz,
                near,
            },
            clock,
            view: None,
            session,
            arrivals_feed: ArrivalsFeed::new(transport.clone()),
            congestion_feed: CongestionFeed::new(transport),
            matches: Vec::new(),
            config,
        }
    }

    /// Runs until `q` or Ctrl+C. Pollers are torn down and the session is saved
    /// on the way out.
    pub async fn run(mut self, station: Option<String>, search: &str) -> Result<()> {
        NTAViews::show_welcome_screen(self.state.lang);

        let now = Instant::now();
        self.clock.update((), now);
        match station {
            Some(id) => self.open_station(&id, now),
            None if !search.is_empty() => self.search(search, now),
            None => NTAViews::show_help(self.state.lang),
        }

        let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
        let mut stdin_open = true;

        loop {
            let deadline = self.next_deadline();

            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    self.tick(Instant::now());
                }
                changed = self.clock.settled() => {
                    if changed {
                        if let Some(now) = self.clock.value() {
                            self.state.now = *now;
                        }
                        if let Some(view) = self.view.as_mut() {
                            view.pump_congestion();
                        }
                        self.render();
                    }
                }
                changed = Self::view_settled(&mut self.view) => {
                    if changed {
                        if let Some(view) = self.view.as_mut() {
                            view.apply_arrivals(&self.state.graph);
                        }
                        self.render();
                    }
                }
                line = lines.next(), if stdin_open => match line {
                    Some(Ok(line)) => {
                        if !self.handle_input(&line) {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("stdin closed: {}", e);
                        stdin_open = false;
                    }
                    None => {
                        debug!("stdin reached end of input");
                        stdin_open = false;
                    }
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        self.shutdown();
        Ok(())
    }

    async fn view_settled(view: &mut Option<StationView>) -> bool {
        match view {
            Some(view) => view.arrivals_settled().await,
            None => std::future::pending().await,
        }
    }

    fn next_deadline(&self) -> Instant {
        let fallback = Instant::now() + self.config.clock_interval;
        self.view
            .as_ref()
            .and_then(StationView::next_due)
            .into_iter()
            .chain(self.clock.next_due())
            .min()
            .unwrap_or(fallback)
    }

    fn tick(&mut self, now: Instant) {
        self.clock.update((), now);
        if let Some(view) = self.view.as_mut() {
            view.tick(self.state.lang, now);
        }
    }

    /// Returns false when the user asked to quit.
    fn handle_input(&mut self, input: &str) -> bool {
        let Some(command) = Command::parse(input) else {
            self.render();
            return true;
        };
        let now = Instant::now();

        match command {
            Command::Quit => return false,
            Command::Toggle(number) => {
                let toggled = self
                    .view
                    .as_mut()
                    .and_then(|view| view.toggle(number, self.state.lang, now));
                if toggled.is_none() {
                    NTAViews::invalid_train_number(number);
                    return true;
                }
            }
            Command::Search(text) => self.search(&text, now),
            Command::SwitchLang(lang) => {
                self.state.lang = lang;
                self.session.set_lang(lang);
                self.save_session();
                self.tick(now);
            }
            Command::Refresh => {
                if let Some(view) = self.view.as_mut() {
                    view.refresh(now);
                }
            }
            Command::Help => {
                NTAViews::show_help(self.state.lang);
                return true;
            }
            Command::Unknown(input) => {
                NTAViews::unknown_command(&input);
                NTAViews::show_help(self.state.lang);
                return true;
            }
        }

        self.render();
        true
    }

    fn search(&mut self, raw: &str, now: Instant) {
        let text = sanitize_search(raw);
        if text.trim().is_empty() {
            self.matches.clear();
            NTAViews::no_station_found(raw);
            return;
        }
        self.session.set_search(&text);
        self.save_session();

        let found: Vec<String> = self
            .state
            .graph
            .search(&text, self.state.near)
            .into_iter()
            .map(|station| station.id.clone())
            .collect();

        match found.first() {
            Some(id) => {
                let id = id.clone();
                self.open_station(&id, now);
                self.matches = found;
            }
            None => {
                self.matches.clear();
                NTAViews::no_station_found(&text);
            }
        }
    }

    fn open_station(&mut self, id: &str, now: Instant) {
        if self.state.graph.station(id).is_none() {
            NTAViews::unknown_station(id);
            return;
        }

        match self.view.as_mut() {
            Some(view) => view.select_station(id, now),
            None => {
                let mut view = StationView::new(
                    id,
                    &self.config,
                    self.arrivals_feed.clone(),
                    self.congestion_feed.clone(),
                );
                view.tick(self.state.lang, now);
                self.view = Some(view);
            }
        }
        self.render();
    }

    fn render(&self) {
        if let Some(view) = &self.view {
            NTAViews::show_station(&self.state, view, &self.matches);
        }
    }

    fn save_session(&self) {
        if let Err(e) = self.session.save() {
            warn!("Could not save session: {}", e);
        }
    }

    fn shutdown(&mut self) {
        self.clock.teardown();
        if let Some(view) = self.view.as_mut() {
            view.teardown();
        }
        self.save_session();

        let search = self.session.search().unwrap_or_default();
        NTAViews::goodbye_message(&to_fragment(self.state.lang, search));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nta_models::tests::FakeTransport;
    use crate::nta_station_graph::tests::station;

    const CITY_HALL_BATCH: &str = r#"[
        {"eta": "2024-05-01T09:01:00", "etaMessage": "전역 출발", "line": "2",
         "lineName": "2호선", "train": "2034", "destination": "City Hall", "nextStation": "euljiro-1ga"},
        {"eta": "2024-05-01T09:05:00", "etaMessage": "3전역 출발", "line": "2",
         "lineName": "2호선", "train": "2040", "destination": "City Hall", "nextStation": "euljiro-1ga"}
    ]"#;

    const CITY_HALL_NEXT_BATCH: &str = r#"[
        {"eta": "2024-05-01T09:01:30", "etaMessage": "도착", "line": "2",
         "lineName": "2호선", "train": "2034", "destination": "City Hall", "nextStation": "euljiro-1ga"}
    ]"#;

    fn graph() -> StationGraph {
        StationGraph::new(vec![station(
            "city-hall",
            &[("2", Some("chungjeongno"), Some("euljiro-1ga"))],
        )])
    }

    fn view_with(arrivals: Arc<FakeTransport>, congestion: Arc<FakeTransport>) -> StationView {
        StationView::new(
            "city-hall",
            &Config::default(),
            ArrivalsFeed::new(arrivals),
            CongestionFeed::new(congestion),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn arrivals_end_up_in_one_direction_group() {
        let graph = graph();
        let mut view = view_with(FakeTransport::ok(CITY_HALL_BATCH), FakeTransport::ok("[]"));

        view.tick(Lang::Ko, Instant::now());
        assert!(view.arrivals_settled().await);
        view.apply_arrivals(&graph);

        let groups: Vec<_> = view.groups().collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key(), "City Hall-euljiro-1ga");
        assert_eq!(groups[0].previous_station(), Some("chungjeongno"));

        let trains: Vec<_> = view
            .visible_trains()
            .into_iter()
            .map(|id| view.train(id).unwrap().record().train.clone())
            .collect();
        assert_eq!(trains, ["2034", "2040"]);
    }

    #[tokio::test(start_paused = true)]
    async fn expanded_trains_survive_the_next_poll() {
        let graph = graph();
        let arrivals = FakeTransport::scripted(vec![
            Ok(CITY_HALL_BATCH.to_string()),
            Ok(CITY_HALL_NEXT_BATCH.to_string()),
        ]);
        let congestion = FakeTransport::ok("[0, 3]");
        let mut view = view_with(arrivals, congestion.clone());

        view.tick(Lang::En, Instant::now());
        view.arrivals_settled().await;
        view.apply_arrivals(&graph);

        let first = view.visible_trains()[0];
        assert_eq!(view.toggle(1, Lang::En, Instant::now()), Some(true));
        assert!(view.congestion(first).is_some());
        tokio::task::yield_now().await;
        assert!(view.pump_congestion());
        assert_eq!(view.congestion(first).unwrap().value().unwrap().len(), 2);

        // Train 2040 disappears, train 2034 keeps its cell, expansion and poller
        view.refresh(Instant::now());
        view.arrivals_settled().await;
        view.apply_arrivals(&graph);

        assert_eq!(view.visible_trains(), vec![first]);
        let cell = view.train(first).unwrap();
        assert!(cell.is_expanded());
        assert_eq!(cell.record().eta_message, "도착");
        assert_eq!(congestion.call_count(), 2);
        assert_eq!(congestion.calls.lock().unwrap()[1], "/congestion/2/2034");
    }

    #[tokio::test(start_paused = true)]
    async fn line_nine_congestion_never_hits_the_network() {
        let graph = StationGraph::new(vec![station(
            "yeouido",
            &[("9", Some("saetgang"), Some("national-assembly"))],
        )]);
        let batch = r#"[{"eta": "2024-05-01T09:01:00", "etaMessage": "도착", "line": "9",
            "lineName": "9호선", "train": "9101", "nextStation": "national-assembly"}]"#;
        let congestion = FakeTransport::ok("[1, 1]");
        let mut view = StationView::new(
            "yeouido",
            &Config::default(),
            ArrivalsFeed::new(FakeTransport::ok(batch)),
            CongestionFeed::new(congestion.clone()),
        );

        view.tick(Lang::En, Instant::now());
        view.arrivals_settled().await;
        view.apply_arrivals(&graph);
        assert_eq!(view.toggle(1, Lang::En, Instant::now()), Some(true));
        tokio::task::yield_now().await;
        view.pump_congestion();

        let id = view.visible_trains()[0];
        let poller = view.congestion(id).unwrap();
        assert_eq!(poller.error(), Some("No congestion data for this line"));
        assert_eq!(congestion.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_polls_keep_the_groups() {
        let graph = graph();
        let arrivals = FakeTransport::scripted(vec![
            Ok(CITY_HALL_BATCH.to_string()),
            Err(NTAError::FeedError("upstream timeout".into())),
        ]);
        let mut view = view_with(arrivals, FakeTransport::ok("[]"));

        view.tick(Lang::Ko, Instant::now());
        view.arrivals_settled().await;
        view.apply_arrivals(&graph);

        view.refresh(Instant::now());
        view.arrivals_settled().await;
        view.apply_arrivals(&graph);

        assert_eq!(view.arrivals().error(), Some("upstream timeout"));
        assert_eq!(view.visible_trains().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_station_drops_trains_and_congestion() {
        let graph = graph();
        let arrivals = FakeTransport::ok(CITY_HALL_BATCH);
        let mut view = view_with(arrivals.clone(), FakeTransport::ok("[2]"));

        view.tick(Lang::Ko, Instant::now());
        view.arrivals_settled().await;
        view.apply_arrivals(&graph);
        let expanded = view.visible_trains()[1];
        view.toggle(2, Lang::Ko, Instant::now());

        view.select_station("euljiro-1ga", Instant::now());
        assert_eq!(view.station_id(), "euljiro-1ga");
        assert!(view.visible_trains().is_empty());
        assert!(view.congestion(expanded).is_none());
        assert_eq!(
            *arrivals.calls.lock().unwrap(),
            ["/upcoming/city-hall", "/upcoming/euljiro-1ga"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_first_poll_of_a_new_station_shows_none_of_the_old_trains() {
        let graph = graph();
        let arrivals = FakeTransport::scripted(vec![
            Ok(CITY_HALL_BATCH.to_string()),
            Err(NTAError::FeedError("station offline".into())),
        ]);
        let mut view = view_with(arrivals, FakeTransport::ok("[]"));

        view.tick(Lang::Ko, Instant::now());
        view.arrivals_settled().await;
        view.apply_arrivals(&graph);
        assert_eq!(view.current_arrivals().map(<[TrainRecord]>::len), Some(2));

        view.select_station("euljiro-1ga", Instant::now());
        assert!(view.current_arrivals().is_none());
        assert!(view.arrivals_settled().await);
        view.apply_arrivals(&graph);

        assert_eq!(view.arrivals().error(), Some("station offline"));
        assert!(view.current_arrivals().is_none());
        assert!(view.visible_trains().is_empty());
        assert_eq!(view.groups().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn language_changes_refetch_congestion() {
        let graph = graph();
        let congestion = FakeTransport::ok("[1]");
        let mut view = view_with(FakeTransport::ok(CITY_HALL_BATCH), congestion.clone());

        view.tick(Lang::Ko, Instant::now());
        view.arrivals_settled().await;
        view.apply_arrivals(&graph);
        view.toggle(1, Lang::Ko, Instant::now());
        tokio::task::yield_now().await;
        view.pump_congestion();

        view.tick(Lang::Ko, Instant::now());
        assert_eq!(congestion.call_count(), 1);
        view.tick(Lang::Ja, Instant::now());
        assert_eq!(congestion.call_count(), 2);
    }

    #[test]
    fn toggling_unknown_numbers_does_nothing() {
        let mut view = view_with(FakeTransport::ok("[]"), FakeTransport::ok("[]"));
        assert_eq!(view.toggle(0, Lang::Ko, Instant::now()), None);
        assert_eq!(view.toggle(3, Lang::Ko, Instant::now()), None);
    }

    #[test]
    fn commands_are_parsed() {
        assert_eq!(Command::parse("  "), None);
        assert_eq!(Command::parse("3"), Some(Command::Toggle(3)));
        assert_eq!(Command::parse("q"), Some(Command::Quit));
        assert_eq!(
            Command::parse("s City Hall"),
            Some(Command::Search("City Hall".into()))
        );
        assert_eq!(Command::parse("l ja"), Some(Command::SwitchLang(Lang::Ja)));
        assert_eq!(Command::parse("l fr"), Some(Command::Unknown("l fr".into())));
        assert_eq!(Command::parse("s"), Some(Command::Unknown("s".into())));
        assert_eq!(Command::parse("R"), Some(Command::Refresh));
    }
}
