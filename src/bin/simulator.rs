use crossterm::{
    cursor::MoveTo,
    execute,
    style::Stylize,
    terminal::{Clear, ClearType},
};
use pageturner_core::awards::Award;
use pageturner_core::config::TrackerConfig;
use pageturner_core::core::types::PreferenceSet;
use pageturner_core::library::LibraryBook;
use pageturner_core::persistence::FileStore;
use pageturner_core::ReadingTracker;
use std::io::{stdin, stdout, Write};
use std::path::PathBuf;

fn main() {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = TrackerConfig::load_or_default(config_path.as_deref());
    env_logger::Builder::new()
        .parse_filters(&config.log_level)
        .parse_default_env()
        .init();

    let mut tracker = match ReadingTracker::open(&config) {
        Ok(tracker) => tracker,
        Err(e) => {
            eprintln!("[ERROR] Could not open store at {}: {}", config.store_path().display(), e);
            std::process::exit(1);
        }
    };
    let mut message = String::from("Welcome! Type 'help' for commands.");

    loop {
        print_ui(&tracker, &message);

        let mut input = String::new();
        match stdin().read_line(&mut input) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let mut parts = input.trim().splitn(2, ' ');
        let cmd = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim();

        message = match cmd {
            "exit" | "quit" => break,
            "help" => help_text(),
            "hobbies" | "genres" => set_tags(&mut tracker, cmd, rest),
            "add" => add_book(&mut tracker, rest),
            "log" => log_reading(&mut tracker, rest),
            "fav" => match rest.parse::<usize>() {
                Ok(n) if n > 0 => match tracker.toggle_favorite(n - 1) {
                    Ok(true) => "Marked as favorite ♥".to_string(),
                    Ok(false) => "Removed from favorites".to_string(),
                    Err(e) => format!("{}", e),
                },
                _ => "Usage: fav <book number>".to_string(),
            },
            "backup" => match tracker.save_snapshot(&config.snapshot_path()) {
                Ok(()) => format!("Ledger saved to {}", config.snapshot_path().display()),
                Err(e) => format!("Backup failed: {}", e),
            },
            "restore" => match tracker.restore_snapshot(&config.snapshot_path()) {
                Ok(()) => "Ledger restored from backup".to_string(),
                Err(e) => format!("Restore failed: {}", e),
            },
            "" => String::new(),
            other => format!("Unknown command '{}'. Type 'help'.", other),
        };
    }

    println!("\nBye! Your shelf is saved in '{}'", config.store_path().display());
}

fn help_text() -> String {
    [
        "hobbies gaming, music      set hobbies",
        "genres fantasy, mystery    set genres",
        "add <title> [| pages [| category, category]]",
        "log <book number> <pages> [total pages]",
        "fav <book number>          toggle favorite",
        "backup / restore           binary ledger backup",
        "exit",
    ]
    .join("\n")
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',').map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect()
}

fn set_tags(tracker: &mut ReadingTracker<FileStore>, which: &str, rest: &str) -> String {
    let current = tracker.preferences();
    let tags = split_list(rest);
    let prefs = if which == "hobbies" {
        PreferenceSet::new(tags, current.genres)
    } else {
        PreferenceSet::new(current.hobbies, tags)
    };
    match tracker.set_preferences(&prefs) {
        Ok(()) => format!("Saved {}.", which),
        Err(e) => format!("Could not save {}: {}", which, e),
    }
}

fn add_book(tracker: &mut ReadingTracker<FileStore>, rest: &str) -> String {
    let mut fields = rest.split('|').map(str::trim);
    let title = fields.next().unwrap_or("");
    let pages = fields.next().and_then(|p| p.parse::<u32>().ok()).filter(|&p| p > 0);
    let categories = fields.next().map(split_list).unwrap_or_default();

    let book = LibraryBook { pages, categories, ..LibraryBook::new(title) };
    match tracker.add_book(book) {
        Ok(added) => {
            let awards = added.ledger.map(|l| l.newly_earned).unwrap_or_default();
            format!("Added '{}'.{}", title, celebrate(&awards))
        }
        Err(e) => format!("{}", e),
    }
}

fn log_reading(tracker: &mut ReadingTracker<FileStore>, rest: &str) -> String {
    let nums: Vec<u32> = rest.split_whitespace().filter_map(|n| n.parse().ok()).collect();
    let (index, pages, total) = match nums.as_slice() {
        [i, p] if *i > 0 => (*i as usize - 1, *p, None),
        [i, p, t] if *i > 0 => (*i as usize - 1, *p, Some(*t)),
        _ => return "Usage: log <book number> <pages> [total pages]".to_string(),
    };

    match tracker.log_reading(index, pages, total) {
        Ok(logged) => {
            let p = &logged.progress;
            let mut msg = format!("Now on page {} of {} ({}% read).", p.current_page, p.total_pages, p.percent);
            if p.finished_now {
                msg.push_str(" Book finished!");
            }
            if let Some(outcome) = logged.ledger {
                msg.push_str(&celebrate(&outcome.newly_earned));
            }
            msg
        }
        Err(e) => format!("{}", e),
    }
}

fn celebrate(awards: &[Award]) -> String {
    awards
        .iter()
        .map(|a| format!("\n  🏆 Award unlocked: {} (+{} pts)", a.label(), a.points()))
        .collect()
}

fn print_ui(tracker: &ReadingTracker<FileStore>, message: &str) {
    let mut out = stdout();
    let _ = execute!(out, Clear(ClearType::All), MoveTo(0, 0));

    println!("{}", "PageTurner Simulator".bold());
    println!("---------------------------------------------------------------");

    let prefs = tracker.preferences();
    println!("Hobbies: {:?}  Genres: {:?}", prefs.hobbies, prefs.genres);

    println!("\n{}", "Recommended for you:".cyan());
    for entry in tracker.recommendations().iter().take(8) {
        let tags = entry.tags.join(", ");
        let tags = if entry.matched { tags.green().to_string() } else { tags.dark_grey().to_string() };
        println!("  [{}] {} by {}  {}", entry.score, entry.item.title, entry.item.author, tags);
    }

    println!("\n{}", "Your shelf:".cyan());
    let books = tracker.books();
    if books.is_empty() {
        println!("  (empty, try 'add')");
    }
    for (i, book) in books.iter().enumerate() {
        let fav = if book.favorite { "♥" } else { " " };
        println!("  {:>2}. {} {}  {}% read", i + 1, fav, book.title, book.percent_read());
    }

    let stats = tracker.stats();
    println!(
        "\nPages: {}  Finished: {}  Streak: {}  Points: {}",
        stats.pages_read,
        stats.finished_books,
        stats.current_streak,
        tracker.total_points().to_string().yellow()
    );
    let earned: Vec<&str> = tracker.earned_awards().iter().map(|(a, _)| a.label()).collect();
    if !earned.is_empty() {
        println!("Awards: {}", earned.join(" · "));
    }

    if !message.is_empty() {
        println!("\n{}", message);
    }
    print!("\n> ");
    let _ = out.flush();
}
