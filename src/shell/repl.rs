use rustyline::error::ReadlineError;
use rustyline::{Config, Editor};
use crate::asm::Assembler;
use crate::vm::chunk::IndexWidth;
use crate::vm::disassembler::{decode_instruction, disassemble_chunk};
use crate::log_warn;

const PROMPT: &str = "lai> ";

/// What the REPL should do with one line of input.
#[derive(Debug, PartialEq)]
enum Command<'a> {
    Exit,
    Dump,
    Reset,
    Assemble(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    match line.trim() {
        "exit" | ":q" => Command::Exit,
        ":dump" => Command::Dump,
        ":reset" => Command::Reset,
        _ => Command::Assemble(line),
    }
}

/// Interactive assembler: every entered instruction is appended to one running chunk and
/// echoed back decoded. The REPL's own input counter is the source line.
pub fn repl(name: &str, index_width: IndexWidth) -> Result<(), ReadlineError> {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<(), _> = Editor::with_config(config)?;
    let mut asm = Assembler::new(index_width);
    let mut line_no: u32 = 0;

    loop {
        let input = match rl.readline(PROMPT) {
            Ok(input) => input,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err),
        };
        line_no += 1;

        match parse_command(&input) {
            Command::Exit => break,
            Command::Reset => {
                asm = Assembler::new(index_width);
                line_no = 0;
            }
            Command::Dump => match disassemble_chunk(asm.chunk(), name) {
                Ok(lines) => lines.iter().for_each(|line| println!("{}", line)),
                Err(e) => eprintln!("Error: {}", e),
            },
            Command::Assemble(text) => match asm.assemble_line(text, line_no) {
                Ok(Some(offset)) => match decode_instruction(asm.chunk(), offset) {
                    Ok((text, _)) => println!("{:04} {}", offset, text),
                    Err(e) => eprintln!("Error: {}", e),
                },
                Ok(None) => {}
                Err(e) => {
                    log_warn!("Assembly rejected", line = e.line, error = e.to_string().as_str());
                    eprintln!("Error: {}", e);
                }
            },
        }
    }
    Ok(())
}
