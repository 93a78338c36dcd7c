//! (re)Route CLI
//!
//! Usage:
//!   reroute --mood "calm walk by the sea"    # Single resolution
//!   reroute --interactive                    # Interactive conversation
//!   reroute --simulate                       # Walk the demo route
//!   reroute --serve                          # HTTP API server
//!   reroute --mood "text" --json             # JSON output

use clap::Parser;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use reroute::core::tracker::alternative_switchable;
use reroute::core::{
    run_server, DemoService, NavigationTracker, PositionSource, SimulatedSource, WalkSession,
};
use reroute::types::{
    ConversationOutcome, GeoUpdate, MoodQuery, NavEvent, NavPhase, Position, StartPoint,
};
use reroute::VERSION;

/// Demo origin: Plaça de Catalunya
const ORIGIN_LAT: f64 = 41.3874;
const ORIGIN_LNG: f64 = 2.1686;

#[derive(Parser, Debug)]
#[command(
    name = "reroute",
    version = VERSION,
    about = "(re)Route - describe your walk mood, get a route, walk it",
    long_about = "(re)Route turns a free-text walk mood into a concrete route\n\
                  and tracks the walk live.\n\n\
                  Modes:\n  \
                  --mood TEXT    One-shot resolution of a mood query\n  \
                  --interactive  Conversational mode (answer prompts, then walk)\n  \
                  --simulate     Resolve a demo route and replay a walk along it\n  \
                  --serve        HTTP API server mode\n\n\
                  Phases:\n  \
                  IDLE        - No route on screen\n  \
                  BROWSING    - Route displayed, not walking yet\n  \
                  NAVIGATING  - Live tracking against the route\n  \
                  ARRIVED     - Arrival detected"
)]
struct Args {
    /// Mood text to resolve (single mode)
    #[arg(short, long)]
    mood: Option<String>,

    /// Answer a duration prompt with this many minutes (single mode)
    #[arg(long)]
    minutes: Option<u32>,

    /// Interactive conversation mode
    #[arg(short, long)]
    interactive: bool,

    /// Resolve a demo route and simulate walking it
    #[arg(long)]
    simulate: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Verbose logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    });
    builder.init();

    if args.no_color {
        colored::control::set_override(false);
    }

    if args.serve {
        run_serve(&args).await;
    } else if args.simulate {
        run_simulate(&args).await;
    } else if args.interactive {
        run_interactive(&args).await;
    } else if let Some(ref mood) = args.mood {
        run_mood(mood, &args).await;
    } else {
        // Default to interactive if no mode specified
        run_interactive(&args).await;
    }
}

/// Resolve a single mood query and print whatever branch comes back
async fn run_mood(mood: &str, args: &Args) {
    let mut session = WalkSession::new(Arc::new(DemoService::new()));
    let origin = Position::new(ORIGIN_LAT, ORIGIN_LNG);

    if session.submit(MoodQuery::new(origin, mood)).await.is_err() {
        print_session_message(&session);
        std::process::exit(1);
    }

    // A one-shot duration answer lets scripts drive the prompt too
    if let (Some(ConversationOutcome::DurationPrompt { .. }), Some(minutes)) =
        (session.outcome(), args.minutes)
    {
        if session.pick_duration(minutes).await.is_err() {
            print_session_message(&session);
            std::process::exit(1);
        }
    }

    match session.outcome() {
        Some(outcome) if args.json => match serde_json::to_string_pretty(outcome) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("serialization failed: {}", e),
        },
        Some(outcome) => print_outcome(outcome, args.no_color),
        None => print_session_message(&session),
    }
}

/// Interactive conversation: type a mood, answer prompts by number,
/// then start and exit walks
async fn run_interactive(args: &Args) {
    let mut session = WalkSession::new(Arc::new(DemoService::new()));
    let mut tracker = NavigationTracker::new();
    let origin = Position::new(ORIGIN_LAT, ORIGIN_LNG);

    print_header(args.no_color);
    println!("Type a walk mood and press Enter.");
    println!("Prompts are answered by number; 'more' loads more places,");
    println!("'another' asks for a different route, 'start' begins the walk,");
    println!("'exit' leaves it. Type 'quit' to leave.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{}", format_prompt(&tracker, args.no_color));
        let _ = stdout.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }

        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") {
            println!("\nSession ended.");
            break;
        }
        if line.is_empty() {
            continue;
        }

        match line.to_lowercase().as_str() {
            "more" => {
                let _ = session.load_more_places().await;
            }
            "another" => {
                let _ = session.try_another().await;
                sync_tracker(&session, &mut tracker);
            }
            "start" => {
                match tracker.start(&StartPoint::DeviceLocation) {
                    Ok(()) => println!("{}", "Walking. Position samples would drive the readout now.".cyan()),
                    Err(e) => println!("{}", e.user_message().yellow()),
                }
                continue;
            }
            "exit" => {
                tracker.exit();
                session.clear();
                println!("Left the walk.");
                continue;
            }
            _ => {
                if let Ok(number) = line.parse::<usize>() {
                    answer_with_number(&mut session, number).await;
                } else {
                    let _ = session.submit(MoodQuery::new(origin, line)).await;
                }
                sync_tracker(&session, &mut tracker);
            }
        }

        match session.outcome() {
            Some(outcome) if args.json => {
                if let Ok(json) = serde_json::to_string(outcome) {
                    println!("{}", json);
                }
            }
            Some(outcome) => print_outcome(outcome, args.no_color),
            None => print_session_message(&session),
        }
    }
}

/// Route a number to whichever prompt is waiting for one
async fn answer_with_number(session: &mut WalkSession<DemoService>, number: usize) {
    let mut minutes = None;
    let mut place = None;
    match session.outcome() {
        Some(ConversationOutcome::DurationPrompt { options, .. }) => {
            minutes = Some(
                options
                    .get(number.saturating_sub(1))
                    .map(|o| o.minutes)
                    .unwrap_or(number as u32),
            );
        }
        Some(ConversationOutcome::PlaceOptions(pc)) => {
            place = pc.shown().get(number.saturating_sub(1)).cloned();
            if place.is_none() {
                println!("No option {}.", number);
                return;
            }
        }
        _ => {
            println!("Nothing is waiting for a number right now.");
            return;
        }
    }

    if let Some(minutes) = minutes {
        let _ = session.pick_duration(minutes).await;
    } else if let Some(option) = place {
        let _ = session.pick_place(option).await;
    }
}

/// Keep the tracker bound to the active route. An unchanged route is left
/// alone, so a no-op turn cannot tear down live navigation.
fn sync_tracker(session: &WalkSession<DemoService>, tracker: &mut NavigationTracker) {
    match session.outcome() {
        Some(ConversationOutcome::RouteResult(rec)) => {
            if tracker.route() != Some(&rec.recommended) {
                tracker.show_route(rec.recommended.clone(), rec.is_loop);
            }
        }
        _ => tracker.exit(),
    }
}

/// Resolve the demo route, then replay a walk along its polyline
async fn run_simulate(args: &Args) {
    let mut session = WalkSession::new(Arc::new(DemoService::new()));
    let origin = Position::new(ORIGIN_LAT, ORIGIN_LNG);

    let query = MoodQuery::new(origin, "an easy loop around the neighborhood");
    if session.submit(query).await.is_err() {
        print_session_message(&session);
        std::process::exit(1);
    }
    let rec = match session.outcome() {
        Some(ConversationOutcome::RouteResult(rec)) => rec.clone(),
        _ => {
            eprintln!("demo query did not resolve to a route");
            std::process::exit(1);
        }
    };

    let mut tracker = NavigationTracker::new();
    tracker.show_route(rec.recommended.clone(), rec.is_loop);
    print_outcome(&ConversationOutcome::RouteResult(rec.clone()), args.no_color);

    if let Err(e) = tracker.start(&StartPoint::DeviceLocation) {
        eprintln!("could not start: {}", e);
        std::process::exit(1);
    }
    println!();
    println!("{}", "Walking the route...".cyan());

    let script: Vec<GeoUpdate> = rec
        .recommended
        .coordinates
        .iter()
        .map(|c| GeoUpdate::Fix(Position::new(c.lat(), c.lng())))
        .collect();
    let source = SimulatedSource::new(script, Duration::from_millis(400));
    let mut rx = source.subscribe();

    while let Some(update) = rx.recv().await {
        let events = tracker.on_position(update);
        let snap = tracker.snapshot();

        if args.json {
            if let Ok(json) = serde_json::to_string(&snap) {
                println!("{}", json);
            }
        } else {
            let color = if args.no_color { "" } else { snap.phase.color_code() };
            let reset = if args.no_color { "" } else { NavPhase::color_reset() };
            println!(
                "{}[{}] {} left · {} · {:.0}%{}",
                color,
                snap.phase,
                snap.remaining_distance_label,
                snap.remaining_time_label,
                snap.progress * 100.0,
                reset
            );
        }

        for event in &events {
            match event {
                NavEvent::PoiRevealed(h) => {
                    println!("  {} {}", "◆".magenta(), h.name.bold());
                    if let Some(desc) = &h.description {
                        println!("    {}", desc.dimmed());
                    }
                }
                NavEvent::Arrived => {
                    println!();
                    println!("{}", "✓ You've arrived.".green().bold());
                }
                NavEvent::Advisory { message } => println!("  {}", message.yellow()),
            }
        }

        if tracker.phase() == NavPhase::Arrived {
            break;
        }
    }
}

fn print_header(no_color: bool) {
    if no_color {
        println!("========================================");
        println!("  (re)Route v{}", VERSION);
        println!("========================================");
    } else {
        println!("{}", format!("(re)Route v{}", VERSION).bold());
        println!("{}", "describe your walk mood".dimmed());
    }
    println!();
}

fn format_prompt(tracker: &NavigationTracker, no_color: bool) -> String {
    let phase = tracker.phase();
    if no_color {
        format!("[{}] > ", phase)
    } else {
        format!("{}[{}]{} > ", phase.color_code(), phase, NavPhase::color_reset())
    }
}

fn print_session_message<S: reroute::core::MoodService>(session: &WalkSession<S>) {
    if let Some(message) = session.last_message() {
        println!("{}", message.yellow());
    }
}

/// Render one conversation branch for the terminal
fn print_outcome(outcome: &ConversationOutcome, no_color: bool) {
    match outcome {
        ConversationOutcome::EdgeCase {
            message,
            suggestion,
            ..
        } => {
            println!("{}", message.yellow());
            if let Some(suggestion) = suggestion {
                println!("  Try: {}", suggestion.italic());
            }
        }
        ConversationOutcome::DurationPrompt {
            message, options, ..
        } => {
            println!("{}", message);
            for (i, option) in options.iter().enumerate() {
                println!("  {}. {}", i + 1, option.label);
            }
        }
        ConversationOutcome::PlaceOptions(pc) => {
            println!("{}", pc.heading.bold());
            if let Some(fallback) = &pc.fallback_message {
                println!("{}", fallback.dimmed());
            }
            let divider = pc.also_nearby_divider();
            for (i, option) in pc.shown().iter().enumerate() {
                if divider == Some(i) {
                    println!("  {}", "── also nearby ──".dimmed());
                }
                let rating = option
                    .rating
                    .map(|r| format!(" ({:.1})", r))
                    .unwrap_or_default();
                println!("  {}. {}{}", i + 1, option.name, rating.dimmed());
            }
            println!("{}", "  pick a number, or 'more'".dimmed());
        }
        ConversationOutcome::RouteResult(rec) => {
            let color = if no_color { "" } else { rec.intent.color_code() };
            let reset = if no_color { "" } else { "\x1b[0m" };
            println!("{}[{}]{} {}", color, rec.intent, reset, rec.recommended.summary.bold());
            println!(
                "  {} · {}{}",
                rec.recommended.distance_label(),
                rec.recommended.duration_label(),
                if rec.is_loop { " · loop" } else { "" }
            );
            if let Some(name) = rec.display_destination_name() {
                println!("  to {}", name.bold());
            }
            if alternative_switchable(rec) {
                if let Some(quick) = &rec.quick {
                    println!(
                        "  {} {} · {}",
                        "quicker option:".dimmed(),
                        quick.distance_label(),
                        quick.duration_label()
                    );
                }
            }
            println!("{}", "  'start' to walk it, 'another' for a different one".dimmed());
        }
    }
}

/// Run HTTP API server
async fn run_serve(args: &Args) {
    println!();
    println!("{}", format!("(re)Route API Server v{}", VERSION).bold());
    println!();

    if let Err(e) = run_server(&args.addr).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
