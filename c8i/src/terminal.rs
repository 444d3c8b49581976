use std::{
    collections::HashMap,
    io::{self, Write},
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use c8i_base::{
    framebuffer::Framebuffer,
    input::{Key, KeyState},
    processor::{ControlEvent, ProcessorEvent, RunConfig},
    Processor,
};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{self, ClearType},
};
use flume::TryRecvError;
use tracing::{debug, info, warn};

use crate::keymap::Keymap;

/// How long a key counts as held after the terminal last reported it.
/// Terminals only report presses and auto repeats, never releases.
const KEY_HOLD: Duration = Duration::from_millis(150);
/// Longest wait for terminal input before the processor events are checked again.
const INPUT_POLL: Duration = Duration::from_millis(5);

/// Raw mode and alternate screen, restored on drop.
struct RawTerminal {
    stdout: io::Stdout,
}

impl RawTerminal {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(error) = execute!(
            stdout,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(ClearType::All)
        ) {
            let _ = terminal::disable_raw_mode();
            return Err(error);
        }
        Ok(Self { stdout })
    }

    fn draw(&mut self, screen: &Framebuffer, status: &str) -> io::Result<()> {
        for (row, line) in render_lines(screen).iter().enumerate() {
            queue!(self.stdout, cursor::MoveTo(0, row as u16), Print(line))?;
        }
        queue!(
            self.stdout,
            cursor::MoveTo(0, (Framebuffer::HEIGHT / 2) as u16),
            terminal::Clear(ClearType::CurrentLine),
            Print(status)
        )?;
        self.stdout.flush()
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        if let Err(error) = execute!(self.stdout, cursor::Show, terminal::LeaveAlternateScreen)
            .and_then(|()| terminal::disable_raw_mode())
        {
            warn!(%error, "could not restore the terminal");
        }
    }
}

/// Render the screen as text, two pixel rows per line, using half block characters.
pub fn render_lines(screen: &Framebuffer) -> Vec<String> {
    (0..Framebuffer::HEIGHT)
        .step_by(2)
        .map(|y| {
            screen
                .row(y)
                .zip(screen.row(y + 1))
                .map(|pixels| match pixels {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                })
                .collect()
        })
        .collect()
}

/// Keys pressed recently enough to count as held.
#[derive(Debug, Default)]
struct HeldKeys {
    released_at: HashMap<Key, Instant>,
}

impl HeldKeys {
    /// Hold `key` until `now + KEY_HOLD`, returning whether it was not held before.
    fn press(&mut self, key: Key, now: Instant) -> bool {
        self.released_at.insert(key, now + KEY_HOLD).is_none()
    }

    /// Forget and return the keys whose hold ran out.
    fn expire(&mut self, now: Instant) -> Vec<Key> {
        let expired: Vec<Key> = self
            .released_at
            .iter()
            .filter(|(_, &released_at)| released_at <= now)
            .map(|(&key, _)| key)
            .collect();
        for key in &expired {
            self.released_at.remove(key);
        }
        expired
    }
}

/// Run `processor` on its own thread, showing its screen in the terminal
/// and feeding it key presses translated through `keymap`, until `Esc` is pressed
/// or the processor halts.
pub fn run(processor: Processor, config: RunConfig, keymap: &Keymap) -> anyhow::Result<()> {
    let mut screen = *processor.screen();
    let (control_event_sender, processor_event_receiver, processor_join_handle) = processor
        .start(config)
        .context("could not spawn the processor thread")?;

    let mut terminal = RawTerminal::enter().context("could not set up the terminal")?;
    let mut held_keys = HeldKeys::default();
    let mut status = "Esc quits";
    terminal.draw(&screen, status)?;

    'frontend: loop {
        if event::poll(INPUT_POLL)? {
            match event::read()? {
                Event::Key(KeyEvent {
                    code: KeyCode::Esc, ..
                })
                | Event::Key(KeyEvent {
                    code: KeyCode::Char('c'),
                    modifiers: KeyModifiers::CONTROL,
                }) => {
                    info!("quit requested");
                    break 'frontend;
                }
                Event::Key(KeyEvent {
                    code: KeyCode::Char(character),
                    ..
                }) => match keymap.key(character) {
                    Some(key) => {
                        if held_keys.press(key, Instant::now()) {
                            debug!(?key, %character, "key pressed");
                            let pressed = ControlEvent::KeyStateChange {
                                key,
                                new_state: KeyState::Pressed,
                            };
                            if control_event_sender.send(pressed).is_err() {
                                break 'frontend;
                            }
                        }
                    }
                    None => debug!(%character, "unmapped key"),
                },
                Event::Resize(..) => terminal.draw(&screen, status)?,
                _ => (),
            }
        }

        for key in held_keys.expire(Instant::now()) {
            debug!(?key, "key released");
            let released = ControlEvent::KeyStateChange {
                key,
                new_state: KeyState::NotPressed,
            };
            if control_event_sender.send(released).is_err() {
                break 'frontend;
            }
        }

        loop {
            match processor_event_receiver.try_recv() {
                Ok(ProcessorEvent::ScreenUpdate { new_screen }) => {
                    screen = new_screen;
                    status = "Esc quits";
                    terminal.draw(&screen, status)?;
                }
                Ok(ProcessorEvent::WaitForKeyPress) => {
                    status = "Waiting for a key press, Esc quits";
                    terminal.draw(&screen, status)?;
                }
                // The runner stops on its own after an error.
                Ok(ProcessorEvent::ErrorEncountered { .. }) | Err(TryRecvError::Disconnected) => {
                    break 'frontend
                }
                Err(TryRecvError::Empty) => break,
            }
        }
    }

    // Leave the alternate screen before any error gets printed.
    drop(terminal);
    drop(control_event_sender);

    let processor = processor_join_handle
        .join()
        .map_err(|_| anyhow!("the processor thread panicked"))?
        .context("error running the CHIP-8 program")?;
    info!(
        program_counter = processor.state().program_counter(),
        "processor stopped"
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use c8i_base::framebuffer::PartialOffscreenDrawing;

    #[test]
    fn half_blocks() {
        let mut screen = Framebuffer::default();
        screen.draw_sprite(0, 0, &[0b1100_0000, 0b1010_0000], PartialOffscreenDrawing::ClipXY);

        let lines = render_lines(&screen);
        assert_eq!(lines.len(), 16);
        assert!(lines[0].starts_with("█▀▄ "));
        assert_eq!(lines[0].chars().count(), 64);
        assert!(lines[1].chars().all(|c| c == ' '));
    }

    #[test]
    fn held_keys_expire() {
        let start = Instant::now();
        let mut held_keys = HeldKeys::default();

        assert!(held_keys.press(Key::K5, start));
        assert!(!held_keys.press(Key::K5, start + KEY_HOLD / 2));
        assert!(held_keys.expire(start + KEY_HOLD).is_empty());
        assert_eq!(held_keys.expire(start + KEY_HOLD * 2), vec![Key::K5]);
        assert!(held_keys.expire(start + KEY_HOLD * 3).is_empty());
    }
}
