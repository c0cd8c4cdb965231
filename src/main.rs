//! crankbox - A hand-cranked music box

use anyhow::{bail, Context, Result};
use clap::Parser;
use crankbox::config::{self, CrankboxConfig};
use crankbox::engine::{self, AudioBackend, Engine, Player, Recorder};
use crankbox::transport::MusicBox;
use crankbox::tune::{library, Tune};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands, TuneArgs};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play { config: config_path, tune } => {
            let cfg = config::load_or_default(&config_path)?;
            let playlist = playlist(&tune)?;

            // Render at the device's own rate so the sample clock is real time
            let device = cfg.audio.device.as_deref();
            let sample_rate = engine::output_sample_rate(device)?;
            let backend = AudioBackend::new(sample_rate as f64);
            let engine = Arc::new(Mutex::new(Engine::with_backend(&cfg, backend)));

            let mut music_box = MusicBox::new(&cfg, playlist);
            let mut player = Player::new();
            player.start(engine.clone(), device)?;

            println!("Playing \"{}\" at {} Hz", music_box.tune().name, sample_rate);
            println!("  Right/Left: crank   Space: play/pause   t: test tone");
            println!("  n: next tune   p: next page   c: clear   s: timbre");
            println!("  l: crank lock   +/-: transpose   [/]: volume   q: quit\n");

            let result = cli::play::run(&mut music_box, engine.clone());
            player.stop();
            if let Ok(mut engine) = engine.lock() {
                engine.close();
            }
            result?;
        }

        Commands::Record {
            config: config_path,
            tune,
            output,
            duration,
        } => {
            let cfg = config::load_or_default(&config_path)?;
            let playlist = playlist(&tune)?;
            let sample_rate = cfg.audio.sample_rate;

            let mut engine = Engine::with_backend(&cfg, AudioBackend::running(sample_rate as f64));
            let mut music_box = MusicBox::new(&cfg, playlist);
            music_box.toggle_playing(&mut engine);

            println!(
                "Recording {} seconds of \"{}\" to {:?}...",
                duration,
                music_box.tune().name,
                output
            );
            let mut recorder = Recorder::new(&output, sample_rate)?;
            record(&mut music_box, &mut engine, &mut recorder, &cfg, duration)?;
            recorder.finalize()?;
            println!("\nRecorded to {:?}", output);
        }

        Commands::Check { config: config_path, tune } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    print_config(&cfg);
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }

            if let Some(path) = tune {
                println!("\nChecking tune at {:?}...", path);
                match Tune::load(&path) {
                    Ok(tune) => {
                        println!("Tune is valid!");
                        print_tune(&tune);
                    }
                    Err(e) => {
                        println!("Tune is invalid: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        }

        Commands::Export { name, output } => {
            let Some(tune) = library::by_name(&name) else {
                bail!(
                    "No built-in tune named '{}' (available: {})",
                    name,
                    library::names().join(", ")
                );
            };
            let path = output.unwrap_or_else(|| tune.file_name().into());
            if path.exists() {
                println!("{:?} already exists. Not overwriting.", path);
            } else {
                tune.save(&path)?;
                println!("Exported \"{}\" to {:?}", tune.name, path);
            }
        }

        Commands::Devices => {
            println!("Available audio devices:\n");

            if let Some(name) = engine::default_device_name() {
                println!("Default output: {}", name);
                println!();
            }

            println!("Output devices:");
            let devices = engine::list_output_devices();
            if devices.is_empty() {
                println!("  (none found)");
            }
            for (name, config) in devices {
                println!(
                    "  - {} ({} Hz, {} ch)",
                    name, config.sample_rate.0, config.channels
                );
            }

            println!("\nBuilt-in tunes:");
            for tune in library::builtin() {
                println!("  - {} ({} bpm, {})", tune.name, tune.bpm, tune.timbre);
            }
        }

        Commands::Init => {
            let path = "crankbox.yaml";
            if Path::new(path).exists() {
                println!("crankbox.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, config::EXAMPLE_CONFIG)?;
                println!("Created crankbox.yaml with example configuration.");
            }
        }
    }

    Ok(())
}

/// Tunes to cycle through, the requested one first
fn playlist(args: &TuneArgs) -> Result<Vec<Tune>> {
    let mut tunes = library::builtin();

    if let Some(path) = &args.file {
        let tune = Tune::load(path).with_context(|| format!("failed to load tune {:?}", path))?;
        tunes.insert(0, tune);
    } else if let Some(name) = &args.tune {
        let Some(index) = tunes.iter().position(|t| t.name.eq_ignore_ascii_case(name)) else {
            bail!(
                "No built-in tune named '{}' (available: {})",
                name,
                library::names().join(", ")
            );
        };
        tunes.rotate_left(index);
    }

    Ok(tunes)
}

/// Render `duration` seconds offline, ticking the music box every millisecond
fn record(
    music_box: &mut MusicBox,
    engine: &mut Engine,
    recorder: &mut Recorder,
    cfg: &CrankboxConfig,
    duration: u64,
) -> Result<()> {
    let frames_per_ms = cfg.audio.sample_rate as f64 / 1000.0;
    let mut rendered = 0usize;

    for ms in 0..duration * 1000 {
        music_box.tick(ms, &mut *engine);

        let target = ((ms + 1) as f64 * frames_per_ms).round() as usize;
        recorder.capture(engine, target - rendered, cfg.audio.buffer_size)?;
        rendered = target;

        if ms % 1000 == 0 {
            print!("\r  Progress: {}s / {}s", ms / 1000, duration);
            std::io::stdout().flush()?;
        }
    }

    Ok(())
}

fn print_config(cfg: &CrankboxConfig) {
    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
    println!("  Buffer size: {}", cfg.audio.buffer_size);
    println!("  Master volume: {:.0}%", cfg.master.volume * 100.0);
    println!("  Transpose: {:+} semitones", cfg.master.transpose);
    println!("  Reverb mix: {:.0}%", cfg.master.reverb_mix * 100.0);
    println!(
        "  Voices: {} (evict {} at a time)",
        cfg.polyphony.max_voices, cfg.polyphony.evict_batch
    );
    println!(
        "  Crank: {}° per step, {} beats per step",
        cfg.crank.threshold_deg, cfg.transport.crank_step
    );
}

fn print_tune(tune: &Tune) {
    println!("  Name: {}", tune.name);
    println!("  BPM: {}", tune.bpm);
    println!("  Timbre: {}", tune.timbre);
    println!("  Beats: {}", tune.total_beats);
    println!("  Events: {}", tune.pattern.len());
    println!("  Pitches: {}", tune.pattern.pitches().join(" "));
}
