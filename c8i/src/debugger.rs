use std::{
    io::{self, BufRead, Write},
    str::FromStr,
};

use c8i_base::{
    input::{Key, KeyState},
    nibble_ints::U12,
    processor::StepOutcome,
    Processor,
};
use thiserror::Error;
use tracing::debug;

/// Bytes shown by one hex dump.
const DUMP_LEN: usize = 128;
const DUMP_ROW_LEN: usize = 16;

const HELP: &str = "\
s [n]     step n instructions (default 1)
c [n]     continue for up to n steps, until an error, a key wait or a jump to itself
p         print registers, I, PC, timers and the call stack
d         print the screen
x <addr>  hex dump 128 bytes starting at the hex address addr
k <key>   toggle whether the hex key is pressed
h         print this help
q         quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Step(usize),
    Continue(Option<usize>),
    Print,
    Display,
    Examine(U12),
    ToggleKey(Key),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
enum CommandError {
    #[error("unknown command `{0}`, `h` lists the commands")]
    Unknown(String),
    #[error("`{0}` is not a valid count")]
    InvalidCount(String),
    #[error("`{0}` is not a valid address, expected hex in 0..=FFF")]
    InvalidAddress(String),
    #[error("`{0}` is not a valid key, expected one hex digit")]
    InvalidKey(String),
    #[error("missing argument, `h` lists the commands")]
    MissingArgument,
}

fn parse_hex(arg: &str) -> Option<u16> {
    let digits = arg
        .strip_prefix("0x")
        .or_else(|| arg.strip_prefix("0X"))
        .unwrap_or(arg);
    u16::from_str_radix(digits, 16).ok()
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or("s");
        let arg = words.next();

        let count = |arg: Option<&str>| {
            arg.map(|arg| {
                arg.parse::<usize>()
                    .map_err(|_| CommandError::InvalidCount(arg.to_owned()))
            })
            .transpose()
        };

        Ok(match command {
            "s" => Self::Step(count(arg)?.unwrap_or(1)),
            "c" => Self::Continue(count(arg)?),
            "p" => Self::Print,
            "d" => Self::Display,
            "x" => {
                let arg = arg.ok_or(CommandError::MissingArgument)?;
                let address = parse_hex(arg)
                    .and_then(|address| U12::try_from(address).ok())
                    .ok_or_else(|| CommandError::InvalidAddress(arg.to_owned()))?;
                Self::Examine(address)
            }
            "k" => {
                let arg = arg.ok_or(CommandError::MissingArgument)?;
                let key = parse_hex(arg)
                    .and_then(|key| u8::try_from(key).ok())
                    .and_then(|key| Key::try_from(key).ok())
                    .ok_or_else(|| CommandError::InvalidKey(arg.to_owned()))?;
                Self::ToggleKey(key)
            }
            "h" | "?" => Self::Help,
            "q" => Self::Quit,
            other => return Err(CommandError::Unknown(other.to_owned())),
        })
    }
}

/// Why a run of steps ended early.
enum Stop {
    WaitingForKey,
    Error,
    JumpToItself,
}

/// Line oriented debugger driving `processor`, writing to `output`.
///
/// An empty line steps one instruction.
pub struct Debugger<'p, W> {
    processor: &'p mut Processor,
    output: W,
}

impl<'p, W: Write> Debugger<'p, W> {
    pub fn new(processor: &'p mut Processor, output: W) -> Self {
        Self { processor, output }
    }

    pub fn run(&mut self, input: impl BufRead) -> io::Result<()> {
        writeln!(self.output, "c8i debugger, `h` lists the commands")?;
        self.prompt()?;
        for line in input.lines() {
            match line?.parse::<Command>() {
                Ok(Command::Quit) => return Ok(()),
                Ok(command) => {
                    debug!(?command, "debugger command");
                    self.execute(command)?;
                }
                Err(error) => writeln!(self.output, "{}", error)?,
            }
            self.prompt()?;
        }
        Ok(())
    }

    fn prompt(&mut self) -> io::Result<()> {
        write!(
            self.output,
            "[{:#05X}]> ",
            self.processor.state().program_counter()
        )?;
        self.output.flush()
    }

    fn execute(&mut self, command: Command) -> io::Result<()> {
        match command {
            Command::Step(count) => {
                for _ in 0..count {
                    if self.step(true)?.is_some() {
                        break;
                    }
                }
            }
            Command::Continue(limit) => {
                let mut steps = 0;
                let stop = loop {
                    if limit.map_or(false, |limit| steps >= limit) {
                        break None;
                    }
                    steps += 1;
                    if let Some(stop) = self.step(false)? {
                        break Some(stop);
                    }
                };
                let reason = match stop {
                    None => "step limit reached",
                    Some(Stop::WaitingForKey) => "waiting for a key press",
                    Some(Stop::Error) => "halted",
                    Some(Stop::JumpToItself) => "jumped to itself",
                };
                writeln!(
                    self.output,
                    "stopped after {} steps at {:#05X}: {}",
                    steps,
                    self.processor.state().program_counter(),
                    reason
                )?;
            }
            Command::Print => self.print_state()?,
            Command::Display => writeln!(self.output, "{:#?}", self.processor.screen())?,
            Command::Examine(start) => self.hex_dump(start)?,
            Command::ToggleKey(key) => {
                let new_state = match self.processor.key_state(key) {
                    KeyState::Pressed => KeyState::NotPressed,
                    KeyState::NotPressed => KeyState::Pressed,
                };
                self.processor.set_key_state(key, new_state);
                writeln!(self.output, "key {:X}: {:?}", u8::from(key), new_state)?;
            }
            Command::Help => writeln!(self.output, "{}", HELP)?,
            Command::Quit => (),
        }
        Ok(())
    }

    /// Step once, printing the executed instruction if `verbose`,
    /// and errors or key waits always.
    fn step(&mut self, verbose: bool) -> io::Result<Option<Stop>> {
        let program_counter = self.processor.state().program_counter();
        match self.processor.step() {
            Ok(StepOutcome::Executed(instruction)) => {
                if verbose {
                    writeln!(self.output, "{:#05X}: {}", program_counter, instruction)?;
                }
                if self.processor.state().program_counter() == program_counter {
                    return Ok(Some(Stop::JumpToItself));
                }
                Ok(None)
            }
            Ok(StepOutcome::WaitingForKey) => {
                writeln!(
                    self.output,
                    "{:#05X}: waiting for a key press, `k <key>` presses one",
                    program_counter
                )?;
                Ok(Some(Stop::WaitingForKey))
            }
            Err(error) => {
                writeln!(self.output, "error: {}", error)?;
                Ok(Some(Stop::Error))
            }
        }
    }

    fn print_state(&mut self) -> io::Result<()> {
        let state = self.processor.state();
        for (chunk, values) in state.data_registers().chunks(8).enumerate() {
            let line: Vec<String> = values
                .iter()
                .enumerate()
                .map(|(i, value)| format!("V{:X}={:02X}", chunk * 8 + i, value))
                .collect();
            writeln!(self.output, "{}", line.join(" "))?;
        }
        writeln!(
            self.output,
            "I={:#06X} PC={:#05X} DT={} ST={}",
            state.address_register(),
            state.program_counter(),
            state.delay_timer(),
            state.sound_timer()
        )?;
        writeln!(self.output, "stack: {:03X?}", state.call_stack().frames())?;
        let pressed: Vec<String> = self
            .processor
            .input()
            .pressed_keys()
            .map(|key| format!("{:X}", u8::from(key)))
            .collect();
        writeln!(self.output, "keys: [{}]", pressed.join(", "))
    }

    fn hex_dump(&mut self, start: U12) -> io::Result<()> {
        let bytes = self.processor.memory().slice(start, DUMP_LEN);
        for (row, chunk) in bytes.chunks(DUMP_ROW_LEN).enumerate() {
            let hex: Vec<String> = chunk.iter().map(|byte| format!("{:02X}", byte)).collect();
            writeln!(
                self.output,
                "{:03X}: {}",
                start.into_u16() as usize + row * DUMP_ROW_LEN,
                hex.join(" ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use c8i_base::processor::DataRegister;

    fn run(program: &[u8], commands: &str) -> (Processor, String) {
        let mut processor = Processor::builder()
            .seed(0)
            .program(program)
            .unwrap()
            .build();
        let mut output = Vec::new();
        Debugger::new(&mut processor, &mut output)
            .run(commands.as_bytes())
            .unwrap();
        (processor, String::from_utf8(output).unwrap())
    }

    #[test]
    fn parse_commands() {
        assert_eq!("".parse::<Command>(), Ok(Command::Step(1)));
        assert_eq!("s 10".parse::<Command>(), Ok(Command::Step(10)));
        assert_eq!("c".parse::<Command>(), Ok(Command::Continue(None)));
        assert_eq!("c 3".parse::<Command>(), Ok(Command::Continue(Some(3))));
        assert_eq!(
            "x 0x2A0".parse::<Command>(),
            Ok(Command::Examine(U12::try_from(0x2A0u16).unwrap()))
        );
        assert_eq!("k b".parse::<Command>(), Ok(Command::ToggleKey(Key::KB)));
        assert_eq!(
            "x 1000".parse::<Command>(),
            Err(CommandError::InvalidAddress("1000".to_owned()))
        );
        assert_eq!(
            "k 10".parse::<Command>(),
            Err(CommandError::InvalidKey("10".to_owned()))
        );
        assert_eq!("x".parse::<Command>(), Err(CommandError::MissingArgument));
        assert_eq!(
            "jump".parse::<Command>(),
            Err(CommandError::Unknown("jump".to_owned()))
        );
    }

    #[test]
    fn step_and_print() {
        let (processor, output) = run(&[0x60, 0x2A, 0x71, 0x01], "s 2\np\nq\n");

        assert_eq!(processor.state().program_counter(), 0x204);
        assert!(output.contains("0x200: LD V0, 0x2A"));
        assert!(output.contains("0x202: ADD V1, 0x01"));
        assert!(output.contains("V0=2A V1=01 V2=00"));
        assert!(output.contains("PC=0x204"));
    }

    #[test]
    fn continue_stops_at_jump_to_itself() {
        // 0x200: LD V0, 0x01; 0x202: JP 0x202
        let (processor, output) = run(&[0x60, 0x01, 0x12, 0x02], "c\n");

        assert_eq!(processor.state().program_counter(), 0x202);
        assert!(output.contains("stopped after 2 steps at 0x202: jumped to itself"));
    }

    #[test]
    fn continue_stops_at_error_and_key_wait() {
        let (processor, output) = run(&[0xF3, 0x0A], "c\nk 7\ns\nc 5\n");

        assert!(output.contains("0x200: waiting for a key press"));
        assert!(output.contains("key 7: Pressed"));
        assert!(output.contains("0x200: LD V3, K"));
        // Running off the program into the zeroed memory behind it.
        assert!(output.contains("error: unknown instruction `0000` at 0x202"));
        assert!(output.contains("stopped after 1 steps at 0x202: halted"));
        assert_eq!(processor.state().register(DataRegister::V3), 7);
    }

    #[test]
    fn hex_dump() {
        let (_, output) = run(&[0xAB, 0xCD], "x 200\n");

        assert!(output.contains("200: AB CD 00 00"));
        assert!(output.contains("270: 00 00"));
    }
}
