//! Interactive terminal session
//!
//! Keys: Right/Left crank forward/backward, space plays and pauses, `t`
//! plays a test tone, `n` switches tune, `p` flips the page, `c` clears the
//! pattern, `s` changes the timbre, `l` changes the crank lock, `+`/`-`
//! transpose, `[`/`]` set the volume, `q` or Esc quits.

use anyhow::{anyhow, Result};
use crossterm::{
    cursor::MoveToColumn,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType},
};
use crankbox::engine::Engine;
use crankbox::transport::{Direction, MusicBox};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::info;

/// Time between status line redraws
const STATUS_INTERVAL: Duration = Duration::from_millis(100);

/// Volume change per key press
const VOLUME_STEP: f64 = 0.05;

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Step(Direction),
    TogglePlay,
    TestTone,
    NextTune,
    NextPage,
    Clear,
    CycleTimbre,
    CycleLock,
    Transpose(i32),
    Volume(f64),
    Quit,
}

fn action_for(code: KeyCode, modifiers: KeyModifiers) -> Option<Action> {
    match (code, modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Action::Quit),
        (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => Some(Action::Quit),
        (KeyCode::Right, _) | (KeyCode::Up, _) => Some(Action::Step(Direction::Forward)),
        (KeyCode::Left, _) | (KeyCode::Down, _) => Some(Action::Step(Direction::Backward)),
        (KeyCode::Char(' '), _) => Some(Action::TogglePlay),
        (KeyCode::Char('t'), _) => Some(Action::TestTone),
        (KeyCode::Char('n'), _) => Some(Action::NextTune),
        (KeyCode::Char('p'), _) => Some(Action::NextPage),
        (KeyCode::Char('c'), _) => Some(Action::Clear),
        (KeyCode::Char('s'), _) => Some(Action::CycleTimbre),
        (KeyCode::Char('l'), _) => Some(Action::CycleLock),
        (KeyCode::Char('+'), _) | (KeyCode::Char('='), _) => Some(Action::Transpose(1)),
        (KeyCode::Char('-'), _) => Some(Action::Transpose(-1)),
        (KeyCode::Char(']'), _) => Some(Action::Volume(VOLUME_STEP)),
        (KeyCode::Char('['), _) => Some(Action::Volume(-VOLUME_STEP)),
        _ => None,
    }
}

fn lock(engine: &Mutex<Engine>) -> Result<MutexGuard<'_, Engine>> {
    engine.lock().map_err(|_| anyhow!("engine lock poisoned"))
}

/// Run the session until the user quits
pub fn run(music_box: &mut MusicBox, engine: Arc<Mutex<Engine>>) -> Result<()> {
    enable_raw_mode()?;
    let result = event_loop(music_box, &engine);
    disable_raw_mode()?;
    println!();
    result
}

fn event_loop(music_box: &mut MusicBox, engine: &Mutex<Engine>) -> Result<()> {
    let started = Instant::now();
    let mut last_status: Option<Instant> = None;
    let mut stdout = std::io::stdout();

    loop {
        let now_ms = started.elapsed().as_millis() as u64;
        music_box.tick(now_ms, &mut *lock(engine)?);

        if event::poll(Duration::from_millis(5))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                let Some(action) = action_for(key.code, key.modifiers) else {
                    continue;
                };

                let mut engine = lock(engine)?;
                match action {
                    Action::Quit => break,
                    Action::Step(direction) => {
                        music_box.key_step(direction, now_ms, &mut *engine);
                    }
                    Action::TogglePlay => {
                        music_box.toggle_playing(&mut *engine);
                    }
                    Action::TestTone => {
                        engine.wake();
                        engine.test_tone();
                    }
                    Action::NextTune => {
                        music_box.next_tune(&mut *engine);
                    }
                    Action::NextPage => {
                        music_box.next_page();
                    }
                    Action::Clear => music_box.clear_pattern(),
                    Action::CycleTimbre => {
                        music_box.cycle_timbre();
                    }
                    Action::CycleLock => {
                        music_box.cycle_lock();
                    }
                    Action::Transpose(semitones) => {
                        let transpose = engine.transpose() + semitones;
                        engine.set_transpose(transpose);
                    }
                    Action::Volume(delta) => {
                        let volume = engine.volume() + delta;
                        engine.set_volume(volume);
                    }
                }
            }
        }

        if last_status.map_or(true, |at| at.elapsed() >= STATUS_INTERVAL) {
            let line = status_line(music_box, &*lock(engine)?);
            execute!(
                stdout,
                MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(line)
            )?;
            last_status = Some(Instant::now());
        }
    }

    info!("session ended");
    Ok(())
}

fn status_line(music_box: &MusicBox, engine: &Engine) -> String {
    let transport = music_box.transport();
    format!(
        "{} {} ({}) | beat {:6.2}/{} | page {}/{} | crank {:4.0}° {:?} {:?} momentum {:5.1} | voices {:2} | {:+} st vol {:3.0}%",
        if transport.is_playing() { "▶" } else { "⏸" },
        music_box.tune().name,
        music_box.tune().timbre,
        transport.position(),
        transport.total_beats(),
        transport.page() + 1,
        transport.page_count(),
        music_box.crank().rotation().rem_euclid(360.0),
        music_box.crank().state(),
        music_box.crank().lock(),
        music_box.momentum(),
        engine.voice_count(),
        engine.transpose(),
        engine.volume() * 100.0,
    )
}
