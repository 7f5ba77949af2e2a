//! Line classifier for `objdump -d` output.
//!
//! Every line of the listing is turned into at most one [`Event`]:
//!
//! ```text
//! Disassembly of section .text:            -> SectionBoundary
//! 9d000000 <main>:                         -> FunctionLabel
//! 9d000000:  27bdffe8   addiu  sp,sp,-24   -> Instruction(StackGrowth(24))
//! 9d000004:  0f400010   jal    9d000040    -> Instruction(Call)
//!         ...                              -> Elision
//! ```
//!
//! The classifier keeps no state between lines.

use crate::error::AnalyzeError;
use crate::Target;

const SECTION_MARKER: &str = "Disassembly of section ";
const LABEL_END: &str = ">:";
// objdump collapses runs of zero words into a single `...` line
const ELISION: &str = "...";

// labels like `<.L12>` or `<.Lfunc_end0>` are compiler internal, not functions
const INTERNAL_LABEL_PREFIX: char = '.';


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event<'a>
{
    SectionBoundary { name: &'a str },
    FunctionLabel   { address: u64, name: &'a str },
    Instruction     { address: u64, effect: Effect },
    Elision,
}

/// What an addressed line does, as far as stack depth is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect
{
    Plain,
    /// `addiu sp,sp,-N`
    StackGrowth(u64),
    /// Branch or jump with a literal target
    Transfer { target: u64 },
    /// Linking call (`jal`, `bal`, `balc`, ...) with a literal target
    Call { target: u64 },
    /// Call through a register; the callee is unknown
    IndirectCall,
    /// `jr ra`, `jraddiusp`
    Return,
    /// Jump through a register other than `ra`, most likely a jump table
    Dispatch,
}


/// Name of the section announced by `line`, if it is a section header.
pub fn section_name(line: &str) -> Option<&str>
{
    line.find(SECTION_MARKER).map(|pos|
    {
        let name = line[pos + SECTION_MARKER.len()..].trim();
        name.strip_suffix(':').unwrap_or(name)
    })
}

///
/// Classify a single listing line. `line_no` is 1-based and only used for
/// error reporting.
///
/// Returns `Ok(None)` for lines that carry nothing (blank lines, the file
/// header).
///
pub fn classify(line: &str, line_no: usize, target: Target)
    -> Result<Option<Event<'_>>, AnalyzeError>
{
    let text = line.trim_end_matches(['\r', '\n']);

    if let Some(name) = section_name(text)
    {
        return Ok(Some(Event::SectionBoundary { name }));
    }

    if text.contains(LABEL_END)
    {
        return parse_label(text, line_no).map(Some);
    }

    if text.trim() == ELISION
    {
        return Ok(Some(Event::Elision));
    }

    let (address, rest) = match split_address(text)
    {
        Some(parts) => parts,
        None        => return Ok(None),
    };

    Ok(Some(Event::Instruction { address, effect: instruction_effect(rest, target) }))
}


fn parse_label(text: &str, line_no: usize) -> Result<Event<'_>, AnalyzeError>
{
    let malformed = || AnalyzeError::MalformedLabel
    {
        line: line_no,
        text: text.trim().to_string(),
    };

    let open  = text.find('<').ok_or_else(malformed)?;
    let close = text.rfind(LABEL_END).ok_or_else(malformed)?;
    if close <= open
    {
        return Err(malformed());
    }

    let name = &text[open + 1..close];
    if name.trim().is_empty()
    {
        return Err(malformed());
    }

    let address = parse_hex(text[..open].trim()).ok_or_else(malformed)?;

    if name.starts_with(INTERNAL_LABEL_PREFIX)
    {
        // still an address inside whichever function is open
        return Ok(Event::Instruction { address, effect: Effect::Plain });
    }

    Ok(Event::FunctionLabel { address, name })
}

// `9d000004:\t0f400010 \tjal\t9d000040 <helper>` -> (0x9d000004, "\t0f400010 \tjal...")
fn split_address(text: &str) -> Option<(u64, &str)>
{
    let (head, rest) = text.trim_start().split_once(':')?;
    let address = parse_hex(head)?;
    Some((address, rest))
}

fn instruction_effect(rest: &str, target: Target) -> Effect
{
    // the raw encoding comes first and is separated from the mnemonic by a tab
    let body = match rest.trim_start().split_once('\t')
    {
        Some((_encoding, body)) => body.trim(),
        None                    => return Effect::Plain,
    };

    let (mnemonic, operands) = match body.split_once(char::is_whitespace)
    {
        Some((m, ops)) => (m, ops.trim()),
        None           => (body, ""),
    };
    let mnemonic = mnemonic.to_ascii_lowercase();

    if target.stack_adjust_mnemonics().contains(&mnemonic.as_str())
    {
        return stack_growth(operands).map(Effect::StackGrowth).unwrap_or(Effect::Plain);
    }

    let first_operand = operands.split(',').next().map(register);

    match mnemonic.as_str()
    {
        "jr" | "jr.hb" | "jrc" | "jic" =>
        {
            if first_operand.map(is_return_address).unwrap_or(false)
            {
                Effect::Return
            }
            else
            {
                Effect::Dispatch
            }
        }
        m if m.starts_with("jalr") || m == "jialc" => Effect::IndirectCall,
        // microMIPS: return and pop the frame in one
        "jraddiusp" => Effect::Return,
        // `b`/`j` prefixed, but not control transfers
        "break" | "bitswap" | "dbitswap" | "balign" => Effect::Plain,
        m if m.starts_with('b') || m.starts_with('j') =>
        {
            match branch_target(operands)
            {
                Some(target) if links(m) => Effect::Call { target },
                Some(target) => Effect::Transfer { target },
                // no literal target; nothing to record
                None         => Effect::Plain,
            }
        }
        _ => Effect::Plain,
    }
}

// `sp,sp,-24` -> Some(24), `sp,sp,24` -> None
fn stack_growth(operands: &str) -> Option<u64>
{
    let ops: Vec<&str> = operands.split(',').map(register).collect();
    match ops.as_slice()
    {
        [dst, src, imm] if is_stack_pointer(dst) && is_stack_pointer(src) =>
        {
            let movement = parse_signed(imm)?;
            if movement < 0
            {
                Some(movement.unsigned_abs())
            }
            else
            {
                None
            }
        }
        _ => None,
    }
}

// the target is the last operand, without the trailing `<symbol+0x..>` annotation
fn branch_target(operands: &str) -> Option<u64>
{
    let operands = match operands.find('<')
    {
        Some(pos) => &operands[..pos],
        None      => operands,
    };
    let last = operands.rsplit(',').next()?.trim();
    let literal = last.split_whitespace().next()?;
    parse_hex(literal)
}

// `jal`, `jals`, `jalx`, `bal`, `balc`, `bgezal`, `bltzall`, `beqzalc`, ...
fn links(mnemonic: &str) -> bool
{
    mnemonic.starts_with("jal")
        || (mnemonic.starts_with('b')
            && (mnemonic.ends_with("al") || mnemonic.ends_with("alc") || mnemonic.ends_with("all")))
}

fn register(operand: &str) -> &str
{
    operand.trim().trim_start_matches('$')
}

fn is_stack_pointer(reg: &str) -> bool
{
    reg == "sp" || reg == "29"
}

fn is_return_address(reg: &str) -> bool
{
    reg == "ra" || reg == "31"
}

fn parse_hex(s: &str) -> Option<u64>
{
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty()
    {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

fn parse_signed(s: &str) -> Option<i64>
{
    let (negative, magnitude) = match s.strip_prefix('-')
    {
        Some(rest) => (true, rest),
        None       => (false, s),
    };

    let value = match magnitude.strip_prefix("0x")
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None      => magnitude.parse::<i64>().ok()?,
    };

    Some(if negative { -value } else { value })
}


#[cfg(test)]
mod tests
{
    use super::*;

    fn effect(line: &str) -> Effect
    {
        match classify(line, 1, Target::Mips32).unwrap()
        {
            Some(Event::Instruction { effect, .. }) => effect,
            other => panic!("expected an instruction, got {:?}", other),
        }
    }

    #[test]
    fn section_header()
    {
        let ev = classify("Disassembly of section .text:\n", 1, Target::Mips32).unwrap();
        assert_eq!(ev, Some(Event::SectionBoundary { name: ".text" }));

        let ev = classify("Disassembly of section .rodata:", 1, Target::Mips32).unwrap();
        assert_eq!(ev, Some(Event::SectionBoundary { name: ".rodata" }));
    }

    #[test]
    fn function_label()
    {
        let ev = classify("9d000000 <main>:\n", 3, Target::Mips32).unwrap();
        assert_eq!(ev, Some(Event::FunctionLabel { address: 0x9d000000, name: "main" }));
    }

    #[test]
    fn templated_label_keeps_inner_brackets()
    {
        let ev = classify("00400100 <Queue<int>::push>:", 3, Target::Mips32).unwrap();
        assert_eq!(ev, Some(Event::FunctionLabel { address: 0x400100, name: "Queue<int>::push" }));
    }

    #[test]
    fn internal_label_is_not_a_function()
    {
        let ev = classify("9d000010 <.L3>:", 3, Target::Mips32).unwrap();
        assert_eq!(ev, Some(Event::Instruction { address: 0x9d000010, effect: Effect::Plain }));
    }

    #[test]
    fn malformed_label_is_fatal()
    {
        let err = classify("9d000000 main>:", 42, Target::Mips32).unwrap_err();
        match err
        {
            AnalyzeError::MalformedLabel { line, .. } => assert_eq!(line, 42),
            other => panic!("unexpected error {:?}", other),
        }

        assert!(classify("9d000000 <>:", 1, Target::Mips32).is_err());
        assert!(classify("zz <main>:", 1, Target::Mips32).is_err());
    }

    #[test]
    fn lines_without_address_are_skipped()
    {
        assert_eq!(classify("", 1, Target::Mips32).unwrap(), None);
        assert_eq!(classify("firmware.elf:     file format elf32-tradlittlemips", 1, Target::Mips32).unwrap(), None);
    }

    #[test]
    fn zero_run_is_an_elision()
    {
        assert_eq!(classify("\t...", 1, Target::Mips32).unwrap(), Some(Event::Elision));
        assert_eq!(classify("\t...\n", 1, Target::Mips32).unwrap(), Some(Event::Elision));
    }

    #[test]
    fn jraddiusp_returns()
    {
        assert_eq!(effect("9d000020:\t4708 \tjraddiusp\t16"), Effect::Return);
    }

    #[test]
    fn stack_decrement_is_growth()
    {
        assert_eq!(effect("9d000000:\t27bdffe8 \taddiu\tsp,sp,-24"), Effect::StackGrowth(24));
        assert_eq!(effect("9d000000:\t27bdffe8 \taddiu\t$sp,$sp,-0x20"), Effect::StackGrowth(32));
    }

    #[test]
    fn stack_increment_is_ignored()
    {
        assert_eq!(effect("9d00002c:\t27bd0018 \taddiu\tsp,sp,24"), Effect::Plain);
        assert_eq!(effect("9d00002c:\t24420018 \taddiu\tv0,v0,-24"), Effect::Plain);
    }

    #[test]
    fn daddiu_only_counts_on_mips64()
    {
        let line = "120000000:\t67bdffd0 \tdaddiu\tsp,sp,-48";
        assert_eq!(effect(line), Effect::Plain);

        let ev = classify(line, 1, Target::Mips64).unwrap();
        assert_eq!(ev, Some(Event::Instruction { address: 0x120000000, effect: Effect::StackGrowth(48) }));
    }

    #[test]
    fn control_transfers()
    {
        assert_eq!(effect("9d000030:\t03e00008 \tjr\tra"), Effect::Return);
        assert_eq!(effect("9d000030:\t03e00008 \tjr\t$ra"), Effect::Return);
        assert_eq!(effect("9d000010:\t0320f809 \tjalr\tt9"), Effect::IndirectCall);
        assert_eq!(effect("9d000010:\t00400008 \tjr\tv0"), Effect::Dispatch);
        assert_eq!(
            effect("9d000004:\t0f400010 \tjal\t9d000040 <helper>"),
            Effect::Call { target: 0x9d000040 }
        );
        assert_eq!(
            effect("9d000004:\t04110010 \tbal\t9d000048 <helper+0x8>"),
            Effect::Call { target: 0x9d000048 }
        );
        assert_eq!(
            effect("9d000004:\t04110010 \tbgezal\ta0,9d000040 <helper>"),
            Effect::Call { target: 0x9d000040 }
        );
        assert_eq!(
            effect("9d000008:\t0b400010 \tj\t9d000040 <helper>"),
            Effect::Transfer { target: 0x9d000040 }
        );
        assert_eq!(
            effect("9d000014:\t1040000a \tbeqz\tv0,9d000040 <main+0x40>"),
            Effect::Transfer { target: 0x9d000040 }
        );
        assert_eq!(
            effect("9d000018:\t10a4fff9 \tbeq\ta1,a0,9d000000 <main>"),
            Effect::Transfer { target: 0x9d000000 }
        );
    }

    #[test]
    fn annotation_with_commas_does_not_hide_target()
    {
        assert_eq!(
            effect("9d000004:\t0f400010 \tjal\t9d000040 <add(int, int)>"),
            Effect::Call { target: 0x9d000040 }
        );
    }

    #[test]
    fn transfer_without_literal_target_is_dropped()
    {
        assert_eq!(effect("9d000004:\t0000000d \tbreak"), Effect::Plain);
        assert_eq!(effect("9d000004:\t0000000d \tbreak\t0x7"), Effect::Plain);
        assert_eq!(effect("9d000004:\t0f400010 \tj\tsomewhere"), Effect::Plain);
    }

    #[test]
    fn data_words_are_plain()
    {
        assert_eq!(effect("9d000100:\t00000000"), Effect::Plain);
        assert_eq!(effect("9d000104:\t00000000 \tnop"), Effect::Plain);
    }
}
