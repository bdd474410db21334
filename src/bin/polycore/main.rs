//! polycore - terminal keyboard for the synthesis engine
//!
//! Run with: cargo run --bin polycore
//! Set RUST_LOG=debug to see engine logging on stderr.

mod app;
mod ui;

use app::Polycore;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    Polycore::new().octave(4).run()
}
