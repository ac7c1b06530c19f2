//! jpp: reflow JSON from files or stdin through the pull codec.
//!
//! The codec owns separator placement; this tool owns all whitespace
//! policy and demonstrates the three styles the writer supports through
//! raw whitespace passthrough: single-space (default), indented
//! (`-i N`), and fully compact (`-i 0`).

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::process::ExitCode;

use pulljson::{
    Error, IoReader, IoWriter, JsonReader, JsonWriter, Reader, ValueRead, ValueType, ValueWrite,
    Writer,
};

const USAGE: &str = "usage: jpp [-i INDENT] [-b BUFSIZE] <file>...\n";

/// Whitespace policy, owned by this tool rather than the codec.
#[derive(Clone, Copy, PartialEq)]
enum Indent {
    /// One space between members and after colons.
    Default,
    /// Newlines plus `n` spaces per nesting level; 0 means fully compact.
    Size(usize),
}

struct Style {
    indent: Indent,
    bufsize: usize,
    nesting: usize,
}

impl Style {
    fn member_break(&self) -> String {
        match self.indent {
            Indent::Default => " ".to_string(),
            Indent::Size(0) => String::new(),
            Indent::Size(n) => {
                let mut ws = String::from("\n");
                ws.push_str(&" ".repeat(self.nesting * n));
                ws
            }
        }
    }

    fn after_colon(&self) -> &'static str {
        match self.indent {
            Indent::Size(0) => "",
            _ => " ",
        }
    }
}

fn reflow_object<I, O>(input: &mut I, output: &mut O, style: &mut Style) -> Result<(), Error>
where
    I: ValueRead,
    O: ValueWrite,
{
    let mut src = input.open_object()?;
    let mut dst = output.open_object()?;
    style.nesting += 1;

    let mut key = vec![0u8; style.bufsize];
    let mut count = 0usize;
    while let Some((name, _)) = src.next_key(&mut key)? {
        let name = name.to_string();
        dst.member_separator()?;
        if count != 0 || style.indent != Indent::Default {
            dst.whitespace(&style.member_break())?;
        }
        dst.write_key(&name)?;
        dst.key_separator()?;
        dst.whitespace(style.after_colon())?;
        reflow_value(&mut src, &mut dst, style)?;
        count += 1;
    }

    style.nesting -= 1;
    if count != 0 && style.indent != Indent::Default {
        dst.whitespace(&style.member_break())?;
    }
    dst.close()
}

fn reflow_array<I, O>(input: &mut I, output: &mut O, style: &mut Style) -> Result<(), Error>
where
    I: ValueRead,
    O: ValueWrite,
{
    let mut src = input.open_array()?;
    let mut dst = output.open_array()?;
    style.nesting += 1;

    let mut count = 0usize;
    while src.next_element()?.is_some() {
        dst.element_separator()?;
        if count != 0 || style.indent != Indent::Default {
            dst.whitespace(&style.member_break())?;
        }
        reflow_value(&mut src, &mut dst, style)?;
        count += 1;
    }

    style.nesting -= 1;
    if count != 0 && style.indent != Indent::Default {
        dst.whitespace(&style.member_break())?;
    }
    dst.close()
}

fn reflow_value<I, O>(input: &mut I, output: &mut O, style: &mut Style) -> Result<(), Error>
where
    I: ValueRead,
    O: ValueWrite,
{
    match input.peek()? {
        ValueType::Object => reflow_object(input, output, style),
        ValueType::Array => reflow_array(input, output, style),
        ValueType::Number => output.write_f64(input.read_f64()?),
        ValueType::String => {
            let mut text = Vec::new();
            let mut buf = vec![0u8; style.bufsize];
            let mut chunk = input.read_string(&mut buf)?;
            loop {
                text.extend_from_slice(&buf[..chunk.len()]);
                if chunk.is_complete() {
                    break;
                }
                chunk = input.resume_string(&mut buf)?;
            }
            output.write_string(core::str::from_utf8(&text)?)
        }
        ValueType::True | ValueType::False => output.write_bool(input.read_bool()?),
        ValueType::Null => {
            input.read_null()?;
            output.write_null()
        }
    }
}

fn reflow_stream<R, W>(input: R, output: W, style: &mut Style) -> Result<(), Error>
where
    R: Reader,
    W: Writer,
{
    let mut json_in = JsonReader::new(input);
    let mut json_out = JsonWriter::new(output);
    reflow_value(&mut json_in, &mut json_out, style)?;
    json_out.finish()?;
    Ok(())
}

struct Args {
    indent: Indent,
    bufsize: usize,
    files: Vec<String>,
}

fn parse_args(argv: &[String]) -> Result<Option<Args>, String> {
    if argv.is_empty() {
        print!("{USAGE}");
        return Ok(None);
    }

    let mut args = Args {
        indent: Indent::Default,
        bufsize: 1000,
        files: Vec::new(),
    };

    let mut it = argv.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "-help" | "--help" => {
                print!("{USAGE}");
                return Ok(None);
            }
            "-i" | "--indent-size" => {
                let value = it.next().ok_or_else(|| USAGE.to_string())?;
                let n: usize = value
                    .parse()
                    .map_err(|_| format!("! invalid indent size: {value}\n{USAGE}"))?;
                args.indent = Indent::Size(n);
            }
            "-b" | "--buffer-size" | "--bufsize" => {
                let value = it.next().ok_or_else(|| USAGE.to_string())?;
                let n: usize = value
                    .parse()
                    .map_err(|_| format!("! invalid bufsize: {value}\n{USAGE}"))?;
                args.bufsize = n.max(1);
            }
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(format!("unknown option: {other}\n{USAGE}"));
            }
            other => args.files.push(other.to_string()),
        }
    }

    Ok(Some(args))
}

fn main() -> ExitCode {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(message) => {
            eprint!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let stdout = io::stdout();
    for filename in &args.files {
        let mut style = Style {
            indent: args.indent,
            bufsize: args.bufsize,
            nesting: 0,
        };
        let output = IoWriter::new(BufWriter::new(stdout.lock()));

        let result = if filename == "-" {
            let stdin = io::stdin();
            reflow_stream(
                IoReader::new(BufReader::new(stdin.lock())),
                output,
                &mut style,
            )
        } else {
            match File::open(filename) {
                Ok(file) => {
                    reflow_stream(IoReader::new(BufReader::new(file)), output, &mut style)
                }
                Err(e) => {
                    eprintln!("{filename}: {e}");
                    return ExitCode::FAILURE;
                }
            }
        };

        if let Err(e) = result {
            eprintln!("{filename}: json error: {e}");
            return ExitCode::FAILURE;
        }
        println!();
    }
    ExitCode::SUCCESS
}
