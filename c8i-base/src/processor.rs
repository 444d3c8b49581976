use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;
use tracing::{trace, warn};

use crate::{
    font::GLYPH_HEIGHT,
    framebuffer::{Framebuffer, PartialOffscreenDrawing},
    input::{InputState, Key, KeyState},
    instruction::Instruction,
    memory::{LoadError, Memory},
    nibble_ints::U12,
};

mod call_stack;
mod data_register;
mod runner;

pub use call_stack::CallStack;
pub use data_register::DataRegister;
pub use runner::{ControlEvent, ProcessorEvent, RunConfig};

/// Width of an instruction in bytes.
const INSTRUCTION_LEN: u16 = 2;

/// Errors that halt the processor.
///
/// `program_counter` is always the address of the offending instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProcessorError {
    #[error(
        "the call at {program_counter:#05X} exceeds the maximum call stack depth of {}",
        CallStack::CAPACITY
    )]
    StackOverflow { program_counter: u16 },
    #[error("return was requested at {program_counter:#05X} with an empty call stack")]
    StackUnderflow { program_counter: u16 },
    #[error("unknown instruction `{word:04X}` at {program_counter:#05X}")]
    UnknownInstruction { program_counter: u16, word: u16 },
    #[error("an out of bounds memory access was requested at {program_counter:#05X}")]
    OutOfBoundsAccess { program_counter: u16 },
}

impl ProcessorError {
    pub fn program_counter(&self) -> u16 {
        match *self {
            Self::StackOverflow { program_counter }
            | Self::StackUnderflow { program_counter }
            | Self::UnknownInstruction {
                program_counter, ..
            }
            | Self::OutOfBoundsAccess { program_counter } => program_counter,
        }
    }
}

/// Registers, program counter, call stack and timers of the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineState {
    pub(crate) data_registers: [u8; DataRegister::COUNT],
    /// `I`, stored as is and masked to 12 bits wherever it is used as an address.
    pub(crate) address_register: u16,
    pub(crate) program_counter: u16,
    pub(crate) call_stack: CallStack,
    pub(crate) delay_timer: u8,
    pub(crate) sound_timer: u8,
}

impl Default for MachineState {
    fn default() -> Self {
        Self {
            data_registers: [0; DataRegister::COUNT],
            address_register: 0,
            program_counter: Memory::PROGRAM_START,
            call_stack: CallStack::default(),
            delay_timer: 0,
            sound_timer: 0,
        }
    }
}

impl MachineState {
    /// Get the value of a data register.
    pub const fn register(&self, register: DataRegister) -> u8 {
        self.data_registers[register as u8 as usize]
    }

    /// Set the value of a data register.
    pub fn set_register(&mut self, register: DataRegister, val: u8) {
        self.data_registers[register as u8 as usize] = val;
    }

    pub const fn data_registers(&self) -> &[u8; DataRegister::COUNT] {
        &self.data_registers
    }

    pub const fn address_register(&self) -> u16 {
        self.address_register
    }

    pub const fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub const fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    pub const fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub const fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    /// Decrement both timers, stopping at zero.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// `I + offset` as a memory address.
    fn address_at_i(&self, offset: u16) -> U12 {
        U12::from_masked(self.address_register).wrapping_add(offset)
    }

    fn skip_next_if(&mut self, condition: bool) {
        if condition {
            self.program_counter = self.program_counter.wrapping_add(INSTRUCTION_LEN);
        }
    }
}

/// Which register the bit shift instructions shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftSource {
    /// Shift `Vx` in place, ignoring `Vy`.
    X,
    /// Shift `Vy` and store the result in `Vx`, as the COSMAC VIP interpreter does.
    Y,
}

impl Default for ShiftSource {
    fn default() -> Self {
        Self::X
    }
}

/// Behaviors in which CHIP-8 interpreters historically differ.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    pub partial_offscreen_drawing: PartialOffscreenDrawing,
    pub shift_source: ShiftSource,
    /// Advance `I` past the last register accessed by
    /// [`Instruction::StoreRegisterValues`] and [`Instruction::LoadRegisterValues`].
    pub increment_i_on_load_store: bool,
}

/// Side effects of an executed instruction the caller may care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    ScreenChanged,
    /// No key was down for [`Instruction::WaitForKeyPress`].
    /// The program counter was rewound so the instruction runs again on the next step.
    WaitingForKey,
}

/// Return decimal digits of a u8 value.
/// The hundreds digit is the first element in the array,
/// followed by the tens and single digits.
fn decimal_digits_of_u8(num: u8) -> [u8; 3] {
    [num / 100, num / 10 % 10, num % 10]
}

/// Execute a decoded instruction.
///
/// The program counter in `state` must already point past `instruction`.
pub fn execute<R: Rng>(
    instruction: Instruction,
    state: &mut MachineState,
    memory: &mut Memory,
    screen: &mut Framebuffer,
    input: &InputState,
    rng: &mut R,
    quirks: Quirks,
) -> Result<Effect, ProcessorError> {
    use DataRegister::{V0, VF};

    let program_counter = state.program_counter.wrapping_sub(INSTRUCTION_LEN);
    let mut effect = Effect::None;

    match instruction {
        Instruction::ClearScreen => {
            screen.clear();
            effect = Effect::ScreenChanged;
        }
        Instruction::Return => {
            state.program_counter = state
                .call_stack
                .pop()
                .ok_or(ProcessorError::StackUnderflow { program_counter })?;
        }
        Instruction::Jump { address } => state.program_counter = address.into(),
        Instruction::Call { address } => {
            if !state.call_stack.push(state.program_counter) {
                return Err(ProcessorError::StackOverflow { program_counter });
            }
            state.program_counter = address.into();
        }
        Instruction::SkipEqConst { x, value } => state.skip_next_if(state.register(x) == value),
        Instruction::SkipNeqConst { x, value } => state.skip_next_if(state.register(x) != value),
        Instruction::SkipEq { x, y } => state.skip_next_if(state.register(x) == state.register(y)),
        Instruction::AssignConst { x, value } => state.set_register(x, value),
        Instruction::AddAssignConst { x, value } => {
            state.set_register(x, state.register(x).wrapping_add(value))
        }
        Instruction::Assign { x, y } => state.set_register(x, state.register(y)),
        Instruction::OrAssign { x, y } => {
            state.set_register(x, state.register(x) | state.register(y))
        }
        Instruction::AndAssign { x, y } => {
            state.set_register(x, state.register(x) & state.register(y))
        }
        Instruction::XorAssign { x, y } => {
            state.set_register(x, state.register(x) ^ state.register(y))
        }
        // The flag is written last, so with `x` being VF the flag wins.
        Instruction::AddAssign { x, y } => {
            let (res, carry) = state.register(x).overflowing_add(state.register(y));
            state.set_register(x, res);
            state.set_register(VF, carry as u8);
        }
        Instruction::SubAssign { x, y } => {
            let (res, borrow) = state.register(x).overflowing_sub(state.register(y));
            state.set_register(x, res);
            state.set_register(VF, !borrow as u8);
        }
        Instruction::ShrAssign { x, y } => {
            let source = match quirks.shift_source {
                ShiftSource::X => state.register(x),
                ShiftSource::Y => state.register(y),
            };
            state.set_register(x, source >> 1);
            state.set_register(VF, source & 0b1);
        }
        Instruction::RevSubAssign { x, y } => {
            let (res, borrow) = state.register(y).overflowing_sub(state.register(x));
            state.set_register(x, res);
            state.set_register(VF, !borrow as u8);
        }
        Instruction::ShlAssign { x, y } => {
            let source = match quirks.shift_source {
                ShiftSource::X => state.register(x),
                ShiftSource::Y => state.register(y),
            };
            state.set_register(x, source << 1);
            state.set_register(VF, source >> 7);
        }
        Instruction::SkipNeq { x, y } => state.skip_next_if(state.register(x) != state.register(y)),
        Instruction::AssignAddrToI { address } => state.address_register = address.into(),
        Instruction::JumpOffset { address } => {
            let target = u16::from(address) + state.register(V0) as u16;
            state.program_counter = U12::try_from(target)
                .map_err(|_| ProcessorError::OutOfBoundsAccess { program_counter })?
                .into();
        }
        Instruction::AssignRandomMasked { x, mask } => state.set_register(x, rng.gen::<u8>() & mask),
        Instruction::DrawSprite { x, y, rows } => {
            let mut sprite = [0; 0xF];
            let sprite = &mut sprite[..rows.into_u8() as usize];
            for (i, sprite_byte) in sprite.iter_mut().enumerate() {
                *sprite_byte = memory.read(state.address_at_i(i as u16));
            }

            let set_pixel_unset = screen.draw_sprite(
                state.register(x),
                state.register(y),
                sprite,
                quirks.partial_offscreen_drawing,
            );
            state.set_register(VF, set_pixel_unset as u8);
            effect = Effect::ScreenChanged;
        }
        Instruction::SkipIfKeyPressed { x } => {
            state.skip_next_if(key_state(input, state.register(x)) == KeyState::Pressed)
        }
        Instruction::SkipIfKeyNotPressed { x } => {
            state.skip_next_if(key_state(input, state.register(x)) == KeyState::NotPressed)
        }
        Instruction::AssignDelayTimerVal { x } => state.set_register(x, state.delay_timer),
        Instruction::WaitForKeyPress { x } => match input.first_down() {
            Some(key) => state.set_register(x, key as u8),
            None => {
                state.program_counter = program_counter;
                effect = Effect::WaitingForKey;
            }
        },
        Instruction::SetDelayTimer { x } => state.delay_timer = state.register(x),
        Instruction::SetSoundTimer { x } => state.sound_timer = state.register(x),
        Instruction::AddAssignI { x } => {
            state.address_register = state
                .address_register
                .wrapping_add(state.register(x) as u16)
        }
        Instruction::AssignGlyphAddrToI { x } => {
            // Glyphs start at 0x0 in memory.
            state.address_register = state.register(x) as u16 * GLYPH_HEIGHT as u16;
        }
        Instruction::StoreBcd { x } => {
            let digits = decimal_digits_of_u8(state.register(x));
            for (offset, digit) in digits.iter().copied().enumerate() {
                memory.write(state.address_at_i(offset as u16), digit);
            }
        }
        Instruction::StoreRegisterValues { last } => {
            for register in DataRegister::up_to(last) {
                memory.write(
                    state.address_at_i(register as u16),
                    state.register(register),
                );
            }
            if quirks.increment_i_on_load_store {
                state.address_register = state.address_register.wrapping_add(last as u16 + 1);
            }
        }
        Instruction::LoadRegisterValues { last } => {
            for register in DataRegister::up_to(last) {
                let val = memory.read(state.address_at_i(register as u16));
                state.set_register(register, val);
            }
            if quirks.increment_i_on_load_store {
                state.address_register = state.address_register.wrapping_add(last as u16 + 1);
            }
        }
    }

    Ok(effect)
}

/// State of the key with id `key_id`, keys beyond `0xF` never being pressed.
fn key_state(input: &InputState, key_id: u8) -> KeyState {
    Key::try_from(key_id)
        .map(|key| input.key_state(key))
        .unwrap_or(KeyState::NotPressed)
}

/// Result of a successful [`Processor::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Executed(Instruction),
    /// A key wait is pending, the same instruction is tried again on the next step.
    WaitingForKey,
}

/// A CHIP-8 processor together with its memory, screen and keypad.
#[derive(Debug)]
pub struct Processor {
    state: MachineState,
    memory: Memory,
    screen: Framebuffer,
    input: InputState,
    rng: StdRng,
    quirks: Quirks,
    decoupled_timers: bool,
    screen_changed: bool,
    fault: Option<ProcessorError>,
}

impl Default for Processor {
    fn default() -> Self {
        ProcessorBuilder::new().build()
    }
}

impl Processor {
    /// Screen width in pixels.
    pub const SCREEN_WIDTH: u8 = Framebuffer::WIDTH;
    /// Screen height in pixels.
    pub const SCREEN_HEIGHT: u8 = Framebuffer::HEIGHT;

    pub fn builder() -> ProcessorBuilder {
        ProcessorBuilder::new()
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn screen(&self) -> &Framebuffer {
        &self.screen
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn quirks(&self) -> Quirks {
        self.quirks
    }

    /// The error the processor halted on, if any.
    pub fn fault(&self) -> Option<ProcessorError> {
        self.fault
    }

    /// Get the state of a key.
    pub fn key_state(&self, key: Key) -> KeyState {
        self.input.key_state(key)
    }

    /// Set the state of a key.
    pub fn set_key_state(&mut self, key: Key, state: KeyState) {
        self.input.set_key_state(key, state);
    }

    /// Decrement the delay and sound timers, meant to be called at 60Hz.
    ///
    /// Only needed with [`ProcessorBuilder::decoupled_timers`],
    /// otherwise every step ticks the timers.
    pub fn tick_timers(&mut self) {
        self.state.tick_timers();
    }

    /// Whether the screen changed since the last call.
    pub fn take_screen_changed(&mut self) -> bool {
        std::mem::take(&mut self.screen_changed)
    }

    /// Fetch, tick the timers and execute one instruction.
    ///
    /// Once an error occurred the processor is halted,
    /// the program counter is left at the offending instruction
    /// and every further step returns the same error.
    pub fn step(&mut self) -> Result<StepOutcome, ProcessorError> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }

        let result = self.fetch_and_execute();
        if let Err(error) = result {
            warn!(%error, "processor halted");
            self.state.program_counter = error.program_counter();
            self.fault = Some(error);
        }
        result
    }

    fn fetch_and_execute(&mut self) -> Result<StepOutcome, ProcessorError> {
        let program_counter = self.state.program_counter;
        let word = self
            .memory
            .read_u16(program_counter)
            .map_err(|_| ProcessorError::OutOfBoundsAccess { program_counter })?;
        self.state.program_counter = program_counter.wrapping_add(INSTRUCTION_LEN);

        if !self.decoupled_timers {
            self.state.tick_timers();
        }

        let instruction = Instruction::decode(word)
            .map_err(|_| ProcessorError::UnknownInstruction {
                program_counter,
                word,
            })?;
        trace!(program_counter, %instruction, "execute");

        let effect = execute(
            instruction,
            &mut self.state,
            &mut self.memory,
            &mut self.screen,
            &self.input,
            &mut self.rng,
            self.quirks,
        )?;

        Ok(match effect {
            Effect::None => StepOutcome::Executed(instruction),
            Effect::ScreenChanged => {
                self.screen_changed = true;
                StepOutcome::Executed(instruction)
            }
            Effect::WaitingForKey => StepOutcome::WaitingForKey,
        })
    }
}

pub struct ProcessorBuilder {
    /// The partially initialized processor
    processor: Processor,
}

impl ProcessorBuilder {
    pub fn new() -> Self {
        Self {
            processor: Processor {
                state: MachineState::default(),
                memory: Memory::new(),
                screen: Framebuffer::default(),
                input: InputState::default(),
                rng: StdRng::from_entropy(),
                quirks: Quirks::default(),
                decoupled_timers: false,
                screen_changed: false,
                fault: None,
            },
        }
    }

    /// Copies the program into the processor's memory, starting at address `0x200`.
    pub fn program(mut self, program: &[u8]) -> Result<Self, LoadError> {
        self.processor.memory.load_program(program)?;
        Ok(self)
    }

    /// Seed the random number generator, making [`Instruction::AssignRandomMasked`] reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.processor.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Set the partial offscreen drawing behavior for sprites.
    /// See also [`PartialOffscreenDrawing`].
    pub fn partial_offscreen_drawing(
        mut self,
        partial_offscreen_drawing: PartialOffscreenDrawing,
    ) -> Self {
        self.processor.quirks.partial_offscreen_drawing = partial_offscreen_drawing;
        self
    }

    /// Set which register the bit shift instructions shift.
    /// See also [`ShiftSource`].
    pub fn shift_source(mut self, shift_source: ShiftSource) -> Self {
        self.processor.quirks.shift_source = shift_source;
        self
    }

    /// Make register stores and loads advance `I`.
    pub fn increment_i_on_load_store(mut self) -> Self {
        self.processor.quirks.increment_i_on_load_store = true;
        self
    }

    /// Stop [`Processor::step`] from ticking the timers,
    /// the caller then calls [`Processor::tick_timers`] at 60Hz.
    pub fn decoupled_timers(mut self) -> Self {
        self.processor.decoupled_timers = true;
        self
    }

    pub fn build(self) -> Processor {
        self.processor
    }
}

impl Default for ProcessorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
