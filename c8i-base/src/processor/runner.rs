use std::{
    io, thread,
    time::{Duration, Instant},
};

use flume::{Receiver, Sender, TryRecvError};
use tracing::{debug, error, info, instrument};

use super::{Processor, ProcessorError, StepOutcome};
use crate::{
    framebuffer::Framebuffer,
    input::{Key, KeyState},
};

/// Events sent to a running processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    KeyStateChange { key: Key, new_state: KeyState },
}

/// Events sent by a running processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorEvent {
    /// The screen changed during the last frame.
    ScreenUpdate { new_screen: Framebuffer },
    /// The program started waiting for a key press.
    WaitForKeyPress,
    /// The processor halted, the runner stops after sending this.
    ErrorEncountered { error: ProcessorError },
}

/// Pacing of a processor started with [`Processor::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub instructions_per_second: u32,
    /// Frequency of timer ticks, which is also the frame rate screen updates are sent at.
    pub timer_frequency: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            instructions_per_second: 700,
            timer_frequency: 60,
        }
    }
}

impl RunConfig {
    fn frame_duration(&self) -> Duration {
        Duration::from_secs(1) / self.timer_frequency.max(1)
    }

    /// Steps to run in the next frame.
    ///
    /// `remainder` carries what the division leaves over into later frames,
    /// so each second runs exactly `instructions_per_second` steps.
    fn steps_for_frame(&self, remainder: &mut u32) -> u32 {
        let frequency = self.timer_frequency.max(1);
        let steps = self.instructions_per_second.saturating_add(*remainder);
        *remainder = steps % frequency;
        steps / frequency
    }
}

impl Processor {
    /// Run the processor on its own thread, paced as `config` says.
    ///
    /// Timers are ticked by the runner once per frame, regardless of [`ProcessorBuilder::decoupled_timers`](super::ProcessorBuilder::decoupled_timers).
    /// Dropping the returned [`Sender`] stops the processor,
    /// the thread then hands it back through the [`thread::JoinHandle`].
    pub fn start(
        mut self,
        config: RunConfig,
    ) -> io::Result<(
        Sender<ControlEvent>,
        Receiver<ProcessorEvent>,
        thread::JoinHandle<Result<Processor, ProcessorError>>,
    )> {
        let (control_event_sender, control_event_receiver) = flume::unbounded();
        let (processor_event_sender, processor_event_receiver) = flume::unbounded();

        self.decoupled_timers = true;
        let join_handle = thread::Builder::new()
            .name("processor".to_owned())
            .spawn(move || run(self, config, control_event_receiver, processor_event_sender))?;

        Ok((control_event_sender, processor_event_receiver, join_handle))
    }
}

#[instrument(skip_all, fields(ips = config.instructions_per_second))]
fn run(
    mut processor: Processor,
    config: RunConfig,
    control_events: Receiver<ControlEvent>,
    processor_events: Sender<ProcessorEvent>,
) -> Result<Processor, ProcessorError> {
    let frame_duration = config.frame_duration();
    let mut step_remainder = 0;
    let mut waiting_for_key_press = false;
    let mut next_frame = Instant::now();

    info!("processor started");

    loop {
        loop {
            match control_events.try_recv() {
                Ok(ControlEvent::KeyStateChange { key, new_state }) => {
                    debug!(?key, ?new_state, "key state changed");
                    processor.set_key_state(key, new_state);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("control event sender dropped, stopping");
                    return Ok(processor);
                }
            }
        }

        for _ in 0..config.steps_for_frame(&mut step_remainder) {
            match processor.step() {
                Ok(StepOutcome::Executed(_)) => waiting_for_key_press = false,
                Ok(StepOutcome::WaitingForKey) => {
                    if !waiting_for_key_press {
                        waiting_for_key_press = true;
                        debug!("waiting for key press");
                        if processor_events.send(ProcessorEvent::WaitForKeyPress).is_err() {
                            return Ok(processor);
                        }
                    }
                    break;
                }
                Err(error) => {
                    error!(%error, "error running the CHIP-8 program");
                    let _ = processor_events.send(ProcessorEvent::ErrorEncountered { error });
                    return Err(error);
                }
            }
        }

        processor.tick_timers();

        if processor.take_screen_changed()
            && processor_events
                .send(ProcessorEvent::ScreenUpdate {
                    new_screen: *processor.screen(),
                })
                .is_err()
        {
            info!("processor event receiver dropped, stopping");
            return Ok(processor);
        }

        next_frame += frame_duration;
        let now = Instant::now();
        if next_frame > now {
            spin_sleep::sleep(next_frame - now);
        } else {
            // Running behind, don't try to catch up.
            next_frame = now;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{instruction::Instruction, nibble_ints::U12, processor::DataRegister};

    fn program(instructions: &[Instruction]) -> Vec<u8> {
        instructions
            .iter()
            .flat_map(|instruction| <[u8; 2]>::from(*instruction))
            .collect()
    }

    fn fast() -> RunConfig {
        RunConfig {
            instructions_per_second: 60_000,
            timer_frequency: 1_000,
        }
    }

    fn steps_in_one_second(config: RunConfig) -> Vec<u32> {
        let mut remainder = 0;
        (0..config.timer_frequency)
            .map(|_| config.steps_for_frame(&mut remainder))
            .collect()
    }

    #[test]
    fn steps_per_second_are_exact() {
        let steps = steps_in_one_second(RunConfig::default());
        assert_eq!(steps.iter().sum::<u32>(), 700);
        assert!(steps.iter().all(|&steps| steps == 11 || steps == 12));

        let slow = RunConfig {
            instructions_per_second: 10,
            timer_frequency: 60,
        };
        let steps = steps_in_one_second(slow);
        assert_eq!(steps.iter().sum::<u32>(), 10);
        assert!(steps.iter().all(|&steps| steps <= 1));
    }

    #[test]
    fn reports_error_and_returns_it() {
        // An empty program runs into the unknown instruction 0000 right away.
        let processor = Processor::builder().build();
        let (_control_event_sender, processor_event_receiver, join_handle) =
            processor.start(fast()).unwrap();

        let expected = ProcessorError::UnknownInstruction {
            program_counter: 0x200,
            word: 0x0000,
        };
        assert_eq!(
            processor_event_receiver.recv(),
            Ok(ProcessorEvent::ErrorEncountered { error: expected })
        );
        assert_eq!(join_handle.join().unwrap().unwrap_err(), expected);
    }

    #[test]
    fn key_wait_is_resolved_by_control_events() {
        let program = program(&[
            Instruction::WaitForKeyPress {
                x: DataRegister::V2,
            },
            Instruction::ClearScreen,
            Instruction::Jump {
                address: U12::from_masked(0x204),
            },
        ]);
        let processor = Processor::builder().program(&program).unwrap().build();
        let (control_event_sender, processor_event_receiver, join_handle) =
            processor.start(fast()).unwrap();

        assert_eq!(
            processor_event_receiver.recv(),
            Ok(ProcessorEvent::WaitForKeyPress)
        );
        control_event_sender
            .send(ControlEvent::KeyStateChange {
                key: Key::K7,
                new_state: KeyState::Pressed,
            })
            .unwrap();
        assert!(matches!(
            processor_event_receiver.recv(),
            Ok(ProcessorEvent::ScreenUpdate { .. })
        ));

        drop(control_event_sender);
        let processor = join_handle.join().unwrap().unwrap();

        assert_eq!(processor.state().register(DataRegister::V2), 0x7);
        assert_eq!(processor.state().program_counter(), 0x204);
        assert_eq!(processor.key_state(Key::K7), KeyState::Pressed);
    }
}
