// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2024 Dualfisheye contributors

use simplelog::{ ColorChoice, Config, LevelFilter, TermLogger, TerminalMode };

mod cli;
mod export;

fn main() {
    if let Err(e) = TermLogger::init(LevelFilter::Debug, Config::default(), TerminalMode::Mixed, ColorChoice::Auto) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    log::debug!("Dualfisheye v{}", env!("CARGO_PKG_VERSION"));

    if !cli::run() {
        std::process::exit(1);
    }
}
