use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::Context;
use c8i_base::{
    framebuffer::PartialOffscreenDrawing,
    processor::{RunConfig, ShiftSource},
    Processor,
};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use crate::{debugger::Debugger, keymap::Keymap};

mod debugger;
mod keymap;
mod terminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OffscreenDrawing {
    ClipXy,
    ClipXWrapY,
    WrapXClipY,
    WrapXy,
}

impl From<OffscreenDrawing> for PartialOffscreenDrawing {
    fn from(offscreen_drawing: OffscreenDrawing) -> Self {
        match offscreen_drawing {
            OffscreenDrawing::ClipXy => Self::ClipXY,
            OffscreenDrawing::ClipXWrapY => Self::ClipXWrapY,
            OffscreenDrawing::WrapXClipY => Self::WrapXClipY,
            OffscreenDrawing::WrapXy => Self::WrapXY,
        }
    }
}

#[derive(Debug, Parser)]
#[command(version, author = "Hans Christian Schmitz", about)]
struct CliOpts {
    /// The path to the file containing the ROM.
    /// The file's contents will be loaded into the interpreter's memory,
    /// starting at address 0x200.
    rom_file: PathBuf,
    /// Instructions executed per second.
    #[arg(long, default_value_t = 700, value_parser = clap::value_parser!(u32).range(1..))]
    ips: u32,
    /// Seed for the random number generator, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,
    /// The physical keys for the CHIP-8 keys 0 to F, in that order.
    #[arg(long, default_value = "x123qweasdzc4rfv", value_parser = str::parse::<Keymap>)]
    keymap: Keymap,
    /// The clipping/wrapping behavior for sprites that are drawn partially offscreen.
    #[arg(short, long, value_enum, default_value_t = OffscreenDrawing::ClipXy)]
    partial_offscreen_drawing: OffscreenDrawing,
    /// Shift Vy into Vx with 8xy6 and 8xyE, instead of shifting Vx in place.
    #[arg(long)]
    shift_vy: bool,
    /// Advance I past the last register accessed by Fx55 and Fx65.
    #[arg(long)]
    increment_i: bool,
    /// Run the line oriented debugger on stdin instead of the terminal display.
    #[arg(long)]
    debug: bool,
    /// Write logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Install the tracing subscriber, filtered by `RUST_LOG` or else `default_directive`.
fn init_logging(log_file: Option<&Path>, default_directive: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let subscriber = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_env_filter(env_filter);

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("could not create log file {}", path.display()))?;
            subscriber
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => subscriber.with_writer(io::stderr).init(),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli_opts = CliOpts::parse();

    // The terminal display owns stderr's screen, so it only gets logs on request.
    let default_directive = if cli_opts.debug || cli_opts.log_file.is_some() {
        "warn"
    } else {
        "off"
    };
    init_logging(cli_opts.log_file.as_deref(), default_directive)?;

    let program = std::fs::read(&cli_opts.rom_file)
        .with_context(|| format!("could not read ROM file {}", cli_opts.rom_file.display()))?;

    let mut builder = Processor::builder()
        .partial_offscreen_drawing(cli_opts.partial_offscreen_drawing.into())
        .shift_source(if cli_opts.shift_vy {
            ShiftSource::Y
        } else {
            ShiftSource::X
        });
    if cli_opts.increment_i {
        builder = builder.increment_i_on_load_store();
    }
    if let Some(seed) = cli_opts.seed {
        builder = builder.seed(seed);
    }
    let mut processor = builder
        .program(&program)
        .with_context(|| format!("could not load ROM file {}", cli_opts.rom_file.display()))?
        .build();
    info!(
        rom_file = %cli_opts.rom_file.display(),
        program_len = program.len(),
        quirks = ?processor.quirks(),
        "program loaded"
    );

    if cli_opts.debug {
        let stdin = io::stdin();
        Debugger::new(&mut processor, io::stdout()).run(stdin.lock())?;
    } else {
        let config = RunConfig {
            instructions_per_second: cli_opts.ips,
            ..RunConfig::default()
        };
        terminal::run(processor, config, &cli_opts.keymap)?;
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition() {
        CliOpts::command().debug_assert();
    }

    #[test]
    fn cli_defaults() {
        let cli_opts = CliOpts::try_parse_from(["c8i", "game.ch8"]).unwrap();
        assert_eq!(cli_opts.ips, 700);
        assert_eq!(cli_opts.keymap, Keymap::default());
        assert_eq!(cli_opts.partial_offscreen_drawing, OffscreenDrawing::ClipXy);
        assert!(!cli_opts.debug);
    }

    #[test]
    fn cli_options() {
        let cli_opts = CliOpts::try_parse_from([
            "c8i",
            "game.ch8",
            "--ips",
            "1000",
            "--keymap",
            "0123456789abcdef",
            "-p",
            "wrap-x-clip-y",
            "--shift-vy",
        ])
        .unwrap();
        assert_eq!(cli_opts.ips, 1000);
        assert_eq!(
            PartialOffscreenDrawing::from(cli_opts.partial_offscreen_drawing),
            PartialOffscreenDrawing::WrapXClipY
        );
        assert!(cli_opts.shift_vy);

        assert!(CliOpts::try_parse_from(["c8i", "game.ch8", "--keymap", "0123"]).is_err());
        assert!(CliOpts::try_parse_from(["c8i", "game.ch8", "--ips", "0"]).is_err());
    }
}
