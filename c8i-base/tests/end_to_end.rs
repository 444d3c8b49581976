use c8i_base::{
    instruction::Instruction,
    nibble_ints::U12,
    processor::{DataRegister, StepOutcome},
    Processor,
};

#[rustfmt::skip]
const PROGRAM: [u8; 0x16] = [
    0x60, 0x05, // 0x200: LD V0, 0x05
    0x61, 0x03, // 0x202: LD V1, 0x03
    0x80, 0x14, // 0x204: ADD V0, V1
    0x22, 0x10, // 0x206: CALL 0x210
    0xA3, 0x00, // 0x208: LD I, 0x300
    0xF2, 0x33, // 0x20A: LD B, V2
    0xF2, 0x65, // 0x20C: LD V2, [I]
    0x12, 0x0E, // 0x20E: JP 0x20E
    0x82, 0x00, // 0x210: LD V2, V0
    0x72, 0x70, // 0x212: ADD V2, 0x70
    0x00, 0xEE, // 0x214: RET
];

#[test]
fn subroutine_and_bcd() {
    let mut processor = Processor::builder().program(&PROGRAM).unwrap().build();

    for _ in 0..12 {
        processor.step().unwrap();
    }

    let state = processor.state();
    // V2 = 5 + 3 + 0x70 = 120, its digits loaded back into V0..V2
    assert_eq!(state.register(DataRegister::V0), 1);
    assert_eq!(state.register(DataRegister::V1), 2);
    assert_eq!(state.register(DataRegister::V2), 0);
    assert_eq!(state.register(DataRegister::VF), 0);
    assert_eq!(state.address_register(), 0x300);
    assert_eq!(state.program_counter(), 0x20E);
    assert!(state.call_stack().is_empty());
    assert_eq!(
        processor.memory().slice(U12::try_from(0x300u16).unwrap(), 3),
        &[1, 2, 0]
    );
}

#[test]
fn draws_font_glyph() {
    let program: Vec<u8> = [
        Instruction::AssignConst {
            x: DataRegister::V0,
            value: 0x7,
        },
        Instruction::AssignGlyphAddrToI { x: DataRegister::V0 },
        Instruction::AssignConst {
            x: DataRegister::V1,
            value: 10,
        },
        Instruction::DrawSprite {
            x: DataRegister::V1,
            y: DataRegister::V1,
            rows: 5u8.try_into().unwrap(),
        },
    ]
    .into_iter()
    .flat_map(<[u8; 2]>::from)
    .collect();
    let mut processor = Processor::builder().program(&program).unwrap().build();

    for _ in 0..4 {
        assert!(matches!(processor.step(), Ok(StepOutcome::Executed(_))));
    }
    assert!(processor.take_screen_changed());

    let rows: Vec<String> = (10..15)
        .map(|y| {
            processor
                .screen()
                .row(y)
                .skip(10)
                .take(4)
                .map(|on| if on { '#' } else { '.' })
                .collect()
        })
        .collect();
    assert_eq!(rows, ["####", "...#", "..#.", ".#..", ".#.."]);
}
