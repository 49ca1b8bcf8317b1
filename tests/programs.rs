//! End-to-end tests: whole programs assembled and run through the in-memory port.

use lmc::asm::assemble;
use lmc::cpu::{Access, Extension};
use lmc::io::BufferPort;
use lmc::{AssemblerError, Binary, Config, CpuError, Decimal, LmcError, Machine, Word};
use proptest::prelude::*;

const ADD_ONE: &str = include_str!("../programs/add_one.lmc");
const MAX_OF_TWO: &str = include_str!("../programs/max_of_two.lmc");
const MIN_OF_TWO: &str = include_str!("../programs/min_of_two.lmc");
const HELLO: &str = include_str!("../programs/hello.lmc");
const COUNTDOWN: &str = include_str!("../programs/countdown.lmc");
const SORT5: &str = include_str!("../programs/sort5.lmc");

/// Assemble and run `source` with `inputs`, returning the output.
fn run(source: &str, config: Config, inputs: &[Word]) -> String {
    let port = BufferPort::new(inputs.iter().copied());
    let mut machine = Machine::from_source(source, config, port).unwrap();
    machine.run().unwrap();
    assert!(machine.is_halted());
    machine.into_port().take_output()
}

#[test]
fn test_add_one() {
    assert_eq!(run(ADD_ONE, Config::default(), &[4]), "5\n");
}

#[test]
fn test_add_one_inline_source() {
    let source = "INP\nADD one\nOUT\nHLT\none DAT 1";
    assert_eq!(run(source, Config::default(), &[4]), "5\n");
}

#[test]
fn test_max_of_two() {
    assert_eq!(run(MAX_OF_TWO, Config::default(), &[7, 3]), "7\n");

    let unwrapped = Config { wrap_values: false, ..Config::default() };
    assert_eq!(run(MAX_OF_TWO, unwrapped, &[3, 7]), "7\n");
}

#[test]
fn test_min_of_two() {
    assert_eq!(run(MIN_OF_TWO, Config::default(), &[7, 3]), "3\n");

    let unwrapped = Config { wrap_values: false, ..Config::default() };
    assert_eq!(run(MIN_OF_TWO, unwrapped, &[3, 7]), "3\n");
}

#[test]
fn test_otc_disabled_fails_before_running() {
    let config = Config { extensions: false, ..Config::default() };
    let port = BufferPort::new([1, 2, 3]);
    let result = Machine::from_source("INP\nOTC\nHLT", config, port);
    assert!(matches!(
        result,
        Err(LmcError::Assembler(AssemblerError::ExtensionDisabled {
            line: 2,
            extension: Extension::OutputChar,
        }))
    ));
}

#[test]
fn test_otc_disabled_at_run_time() {
    // An image bypasses the assembler, so the machine has to catch it
    let config = Config { extensions: false, ..Config::default() };
    let mut machine = Machine::new(&[922, 0], config, BufferPort::default()).unwrap();
    assert_eq!(machine.run(), Err(CpuError::ExtensionDisabled(Extension::OutputChar)));
}

#[test]
fn test_hello_line_mode() {
    assert_eq!(run(HELLO, Config::default(), &[]), "Hi 42\n");
}

#[test]
fn test_countdown() {
    assert_eq!(run(COUNTDOWN, Config::default(), &[3]), "3\n2\n1\n");
}

#[test]
fn test_duplicate_and_unknown_labels() {
    let err = assemble::<Decimal>("x DAT 1\nx DAT 2", &Config::default()).unwrap_err();
    assert!(matches!(err, AssemblerError::DuplicateLabel { .. }));

    let err = assemble::<Decimal>("BRA missing", &Config::default()).unwrap_err();
    assert!(matches!(err, AssemblerError::UnknownLabel { ref label, .. } if label == "missing"));
}

#[test]
fn test_running_off_the_end() {
    let port = BufferPort::default();
    let mut machine = Machine::from_source(&"OUT\n".repeat(100), Config::default(), port).unwrap();
    let err = machine.run().unwrap_err();
    assert_eq!(
        err,
        CpuError::OutOfBounds { access: Access::InstructionPointer, addr: 100, size: 100 }
    );
    assert_eq!(machine.cycles(), 100);
}

#[test]
fn test_reset_and_rerun() {
    let port = BufferPort::new([1, 2]);
    let mut machine = Machine::from_source(ADD_ONE, Config::default(), port).unwrap();
    machine.run().unwrap();
    machine.reset();
    machine.run().unwrap();
    assert_eq!(machine.port().output(), "2\n3\n");
}

#[test]
fn test_binary_machine() {
    let source = "INP\nADD big\nOUT\nHLT\nbig DAT 1000000";
    let port = BufferPort::new([234_567]);
    let mut machine = Machine::<_, Binary>::load_source(source, Config::default(), port).unwrap();
    machine.run().unwrap();
    assert_eq!(machine.port().output(), "1234567\n");
    assert_eq!(machine.memory().len(), 65_536);
}

#[test]
fn test_binary_value_range() {
    let source = "LDA big\nADD big\nOUT\nHLT\nbig DAT 2147483647";
    let port = BufferPort::default();
    let mut machine = Machine::<_, Binary>::load_source(source, Config::default(), port).unwrap();
    machine.run().unwrap();
    // 2 * i32::MAX wraps like a 32-bit two's-complement register
    assert_eq!(machine.port().output(), "-2\n");
}

/// Run the sort program and read back the five sorted cells.
fn sort(inputs: &[Word]) -> (Vec<Word>, String) {
    let program = assemble::<Decimal>(SORT5, &Config::default()).unwrap();
    let port = BufferPort::new(inputs.iter().copied());
    let mut machine = Machine::new(&program.image, Config::default(), port).unwrap();
    machine.run().unwrap();

    let cells = ["v0", "v1", "v2", "v3", "v4"]
        .iter()
        .map(|label| machine.memory().read(program.labels[*label]))
        .collect();
    (cells, machine.into_port().take_output())
}

#[test]
fn test_sort_fixed() {
    let (cells, output) = sort(&[5, -2, 9, 0, 3]);
    assert_eq!(cells, vec![-2, 0, 3, 5, 9]);
    assert_eq!(output, "-2\n0\n3\n5\n9\n");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_sort_permutations(values in Just(vec![-420i64, -7, 0, 13, 499]).prop_shuffle()) {
        let (cells, _) = sort(&values);
        prop_assert_eq!(cells, vec![-420, -7, 0, 13, 499]);
    }

    #[test]
    fn prop_sort_random(values in prop::collection::vec(-499i64..=499, 5)) {
        let (cells, output) = sort(&values);
        let mut expected = values.clone();
        expected.sort_unstable();
        let printed: String = expected.iter().map(|value| format!("{}\n", value)).collect();
        prop_assert_eq!(cells, expected);
        prop_assert_eq!(output, printed);
    }

    #[test]
    fn prop_add_one(value in -999i64..=998) {
        prop_assert_eq!(run(ADD_ONE, Config::default(), &[value]), format!("{}\n", value + 1));
    }
}
