// Views for Next Train Arrivals
use std::io::{self, Write};

use crate::nta_controllers::{AppState, CongestionPoller, StationView};
use crate::nta_countdown::Countdown;
use crate::nta_directions::DirectionGroup;
use crate::nta_locale::Locale;
use crate::nta_models::{CongestionReading, Lang};

pub struct NTAViews;

impl NTAViews {
    /// Seoul Metro line colours; unknown lines get grey.
    const LINE_COLORS: [(&'static str, &'static str); 9] = [
        ("1", "0052A4"),
        ("2", "00A84D"),
        ("3", "EF7C1C"),
        ("4", "00A5DE"),
        ("5", "996CAC"),
        ("6", "CD7C2F"),
        ("7", "747F00"),
        ("8", "E6186C"),
        ("9", "BDB092"),
    ];

    const CONGESTION_GLYPHS: [char; 4] = ['░', '▒', '▓', '█'];

    pub fn show_welcome_screen(lang: Lang) {
        println!("\n{}", "═".repeat(70));
        println!("  ╔═══════════════════════════════════════════════════════════╗");
        println!("  ║            🚇 NEXT TRAIN ARRIVALS - SEOUL METRO           ║");
        println!("  ║              Live arrivals grouped by direction           ║");
        println!("  ╚═══════════════════════════════════════════════════════════╝");
        println!("{}", "═".repeat(70));
        println!("\n  🌐 Language: {}", lang);
    }

    pub fn show_help(lang: Lang) {
        println!("\n📋 COMMANDS");
        println!("  <number>     expand or collapse a train (congestion per car)");
        println!("  s <text>     search a station, e.g. 's City Hall' or 's 시청'");
        println!(
            "  l <lang>     switch language ({})",
            Lang::ALL.map(Lang::code).join("|")
        );
        println!("  r            refresh now");
        println!("  q            quit");
        println!("\n  🌐 {}", lang);
        Self::flush();
    }

    /// Full redraw of one station.
    pub fn show_station(state: &AppState, view: &StationView, matches: &[String]) {
        let locale = Locale::of(state.lang);
        let station_id = view.station_id();

        Self::clear_screen();
        println!("{}", "═".repeat(70));
        println!(
            "🚇 {}",
            state.graph.display_name(station_id, state.lang)
        );
        let others: Vec<&str> = matches
            .iter()
            .filter(|id| id.as_str() != station_id)
            .take(4)
            .map(|id| state.graph.display_name(id, state.lang))
            .collect();
        if !others.is_empty() {
            println!("   💡 {}", others.join(" · "));
        }
        let local_now = state.now.with_timezone(&state.feed_tz);
        print!("🕐 {}", local_now.format("%H:%M:%S"));
        if view.arrivals().is_loading() {
            print!("   🔄 {}", locale.loading);
        }
        println!();
        println!("{}", "═".repeat(70));

        let arrivals = view.arrivals();
        if let Some(error) = arrivals.error() {
            println!("\n⚠️  {}: {}", locale.stale_data, error);
        }

        let numbered = view.visible_trains();
        if view.current_arrivals().is_none() {
            if arrivals.is_loading() {
                println!("\n⏳ {}...", locale.loading);
            }
        } else if numbered.is_empty() {
            println!("\nℹ️  {}", locale.no_trains);
        }

        let mut number = 0;
        for group in view.groups() {
            Self::show_group_header(state, view, group);
            for id in group.trains() {
                number += 1;
                let Some(cell) = view.train(*id) else {
                    continue;
                };
                let record = cell.record();
                let delta = Countdown::seconds_until(record.eta, state.now, state.feed_tz);
                let countdown = Countdown::format(delta, state.lang);
                let marker = if Countdown::is_now(delta) { "🔴" } else { "  " };

                println!(
                    "  {:>2}. {} {:<18} {}",
                    number, marker, record.eta_message, countdown
                );
                if cell.is_expanded() {
                    Self::show_congestion(view.congestion(*id), locale);
                }
            }
        }

        println!("\n{}", "─".repeat(70));
        println!("  [number] expand · s <text> search · l <lang> language · r refresh · q quit");
        print!("> ");
        Self::flush();
    }

    fn show_group_header(state: &AppState, view: &StationView, group: &DirectionGroup) {
        let destination = group
            .trains()
            .first()
            .and_then(|id| view.train(*id))
            .and_then(|cell| cell.record().destination.as_deref())
            .unwrap_or(group.key());

        println!(
            "\n  {} {} → {}",
            Self::colorize_line(group.line(), Self::line_color(group.line())),
            group.line_name(),
            destination
        );
        if let Some(previous) = group.previous_station() {
            println!(
                "     ⬅ {} {}",
                Locale::of(state.lang).previous_station,
                state.graph.display_name(previous, state.lang)
            );
        }
    }

    fn show_congestion(poller: Option<&CongestionPoller>, locale: &Locale) {
        let Some(poller) = poller else {
            return;
        };

        match poller.value() {
            Some(cars) if !cars.is_empty() => {
                println!("         🚃 {}", Self::congestion_bar(cars, locale));
            }
            Some(_) => println!("         🚃 -"),
            None if poller.is_loading() => println!("         ⏳ {}...", locale.loading),
            None => {}
        }
        if let Some(error) = poller.error() {
            println!("         ⚠️  {}", error);
        }
    }

    /// One glyph per car, then the label and number of the most crowded car.
    fn congestion_bar(cars: &[CongestionReading], locale: &Locale) -> String {
        let bar: String = cars
            .iter()
            .map(|reading| {
                let level = usize::from(reading.value.min(CongestionReading::MAX_LEVEL));
                Self::CONGESTION_GLYPHS[level]
            })
            .collect();
        match cars.iter().max_by_key(|reading| reading.value) {
            Some(worst) => format!(
                "[{}] {} (#{})",
                bar,
                locale.congestion_label(worst.value),
                worst.car
            ),
            None => format!("[{}]", bar),
        }
    }

    pub fn invalid_train_number(number: usize) {
        println!("\n✗ No train numbered {}", number);
        Self::flush();
    }

    pub fn unknown_command(input: &str) {
        println!("\n✗ Unknown command '{}'", input);
    }

    pub fn no_station_found(text: &str) {
        println!("\n✗ No station matches '{}'", text);
        println!("💡 Try another spelling, or a name in Korean, English, Japanese or Chinese");
        Self::flush();
    }

    pub fn unknown_station(id: &str) {
        println!("\n✗ Unknown station id '{}'", id);
        Self::flush();
    }

    pub fn goodbye_message(link: &str) {
        println!("\n{}", "═".repeat(60));
        println!("       👋 Thank you for using Next Train Arrivals!");
        println!("       🔗 Pick up where you left off: --link '{}'", link);
        println!("{}", "═".repeat(60));
        println!();
    }

    fn line_color(line: &str) -> &'static str {
        Self::LINE_COLORS
            .iter()
            .find(|(code, _)| *code == line)
            .map(|(_, color)| *color)
            .unwrap_or("808080")
    }

    fn parse_hex_color(hex_color: &str) -> (u8, u8, u8) {
        if hex_color.len() != 6 {
            return (128, 128, 128);
        }
        let channel = |range: std::ops::Range<usize>| {
            hex_color
                .get(range)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .unwrap_or(128)
        };
        (channel(0..2), channel(2..4), channel(4..6))
    }

    /// Line badge with a contrasting foreground
    fn colorize_line(code: &str, hex_color: &str) -> String {
        let (r, g, b) = Self::parse_hex_color(hex_color);
        let luminance = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) / 255.0;
        let text_color = if luminance > 0.5 { "30" } else { "97" };

        format!(
            "\x1b[48;2;{};{};{}m\x1b[{}m {} \x1b[0m",
            r, g, b, text_color, code
        )
    }

    fn clear_screen() {
        print!("\x1B[2J\x1B[1;1H");
    }

    fn flush() {
        let _ = io::stdout().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_badges_use_line_colours() {
        assert_eq!(NTAViews::parse_hex_color(NTAViews::line_color("2")), (0x00, 0xA8, 0x4D));
        assert_eq!(NTAViews::parse_hex_color(NTAViews::line_color("Shinbundang")), (128, 128, 128));
        assert_eq!(NTAViews::parse_hex_color("zz0000"), (128, 0, 0));

        // Dark background, white text
        assert!(NTAViews::colorize_line("1", "0052A4").contains("\x1b[97m 1 "));
        // Light background, black text
        assert!(NTAViews::colorize_line("9", "BDB092").contains("\x1b[30m 9 "));
    }

    #[test]
    fn congestion_bar_shows_every_car_and_the_worst_label() {
        let cars: Vec<CongestionReading> = [0, 1, 3, 2]
            .iter()
            .enumerate()
            .map(|(index, value)| CongestionReading {
                car: index as u32 + 1,
                value: *value,
            })
            .collect();

        assert_eq!(
            NTAViews::congestion_bar(&cars, Locale::of(Lang::En)),
            "[░▒█▓] Crowded (#3)"
        );
        assert_eq!(
            NTAViews::congestion_bar(&cars[..1], Locale::of(Lang::Ko)),
            "[░] 여유 (#1)"
        );
    }
}
