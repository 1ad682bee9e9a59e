//! hand_fireworks — interactive entry point.

use hand_fireworks::app::{run, AppConfig};
use std::io::{self, Write};

fn main() {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║       Hand Fireworks — gesture bursts & fortune draws        ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Mode: LeapMotion hand tracking");
    #[cfg(not(feature = "leap"))]
    println!("  Mode: Keyboard + mouse simulation  (use --features leap for hardware)");
    println!();

    let cfg = if std::env::args().any(|a| a == "--quick") {
        println!("  Quick-start: classic fortunes, 1500-particle pool\n");
        AppConfig::default()
    } else {
        configure_interactively()
    };

    println!();
    println!("  Opening visualizer window…");
    println!();

    if let Err(e) = run(cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn configure_interactively() -> AppConfig {
    let defaults = AppConfig::default();

    let fortunes = pick_fortunes(&defaults.fortunes);

    let pool_capacity: usize = {
        let n = read_line("  Particle pool size (default 1500): ")
            .trim()
            .parse()
            .unwrap_or(defaults.pool_capacity);
        n.clamp(200, 20000)
    };

    AppConfig {
        fortunes,
        pool_capacity,
        ..defaults
    }
}

fn pick_fortunes(defaults: &[String]) -> Vec<String> {
    println!("  Fortune set:");
    println!("    1. Classic lots (great blessing … great curse)");
    println!("    2. Custom (comma-separated)");
    match read_line("  Choice (default 1): ").trim() {
        "2" => {
            let list: Vec<String> = read_line("  Fortunes: ")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if list.is_empty() {
                println!("  ⚠  Empty list — using the classic set.");
                defaults.to_vec()
            } else {
                list
            }
        }
        _ => defaults.to_vec(),
    }
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}
