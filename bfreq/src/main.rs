// This file is part of bfreq. Copyright © 2026 bfreq contributors.
// bfreq is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, IsTerminal, Write};
use std::path::Path;
use std::process::ExitCode;

use bstr::ByteSlice;
use clap::Parser;
use hashbrown::HashMap;

use freq_cardinality::{
    BoundedCounter, CountLines, CountLinesFromReadFile, Error, ErrorCause, Result,
};

use crate::cli_args::{CliArgs, Mode};

mod cli_args;

/// This can happen if someone pipes our stdout into `head` or some such
static STDOUT_ERROR_MESSAGE: &str = "failed to write to stdout";

/// Table slots used by bounded mode when `--size` is not given.
const DEFAULT_BUCKETS: usize = 1 << 20;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match (args.trim, args.lowercase) {
        (false, false) => run_with_const_parameters::<false, false>(args),
        (false, true) => run_with_const_parameters::<false, true>(args),
        (true, false) => run_with_const_parameters::<true, false>(args),
        (true, true) => run_with_const_parameters::<true, true>(args),
    }
}

fn run_with_const_parameters<const TRIM: bool, const LOWERCASE: bool>(args: CliArgs) -> ExitCode {
    let result = match args.mode {
        Mode::Bounded => bounded::<TRIM, LOWERCASE>(args),
        Mode::Exact => exact::<TRIM, LOWERCASE>(args),
    };
    if let Err(e) = result {
        match e.get_cause() {
            ErrorCause::Io(cause) => match cause.kind() {
                ErrorKind::BrokenPipe => (),
                _ => eprintln!("{e}: {cause:?}"),
            },
            _ => eprintln!("{e}"),
        }
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn bounded<const TRIM: bool, const LOWERCASE: bool>(args: CliArgs) -> Result {
    let mut counter = match &args.load {
        Some(path) => read_state(path)?,
        None => BoundedCounter::new(args.size.unwrap_or(DEFAULT_BUCKETS))?,
    };
    {
        let mut processor =
            MappedLines::new(&mut counter, preprocess_line::<TRIM, LOWERCASE>);
        process_input(&args, &mut processor)?;
    }

    if args.report {
        let mut entries: Vec<(&[u8], i64)> = counter
            .iter()
            .filter(|(_, count)| *count >= args.min_count)
            .collect();
        if args.sort {
            entries.sort_unstable_by(|(line_a, count_a), (line_b, count_b)| {
                count_b
                    .cmp(count_a)
                    .then_with(|| line_a.as_bstr().cmp(line_b.as_bstr()))
            });
        }
        let stdout = io::stdout().lock();
        let mut writer = BufWriter::new(stdout);
        for (line, count) in &entries {
            write_line(&mut writer, line, count)?;
        }
        writer.flush().map_err(|e| Error::io_static(STDOUT_ERROR_MESSAGE, e))?;
    } else {
        println!("{}", counter.cardinality());
    }

    if args.histogram {
        print_histogram(&counter)?;
    }
    if let Some(path) = &args.save {
        write_state(&counter, path)?;
    }
    Ok(())
}

fn exact<const TRIM: bool, const LOWERCASE: bool>(args: CliArgs) -> Result {
    if args.load.is_some() || args.save.is_some() {
        return Err(Error::message(format!(
            "{} mode cannot save or load counter state",
            args.mode
        )));
    }
    if args.histogram {
        return Err(Error::message(format!(
            "{} mode cannot print a count histogram",
            args.mode
        )));
    }

    let mut exact_counter = ExactLineCounter::with_capacity(args.size.unwrap_or(0));
    {
        let mut processor =
            MappedLines::new(&mut exact_counter, preprocess_line::<TRIM, LOWERCASE>);
        process_input(&args, &mut processor)?;
    }

    if args.report {
        let mut entries: Vec<(&[u8], u64)> = exact_counter
            .map
            .iter()
            .map(|(line, count)| (line.as_slice(), *count))
            .filter(|(_, count)| *count >= args.min_count.max(0) as u64)
            .collect();
        if args.sort {
            entries.sort_unstable_by(|(line_a, count_a), (line_b, count_b)| {
                count_b
                    .cmp(count_a)
                    .then_with(|| line_a.as_bstr().cmp(line_b.as_bstr()))
            });
        }
        let stdout = io::stdout().lock();
        let mut writer = BufWriter::new(stdout);
        for (line, count) in &entries {
            write_line(&mut writer, line, count)?;
        }
        writer.flush().map_err(|e| Error::io_static(STDOUT_ERROR_MESSAGE, e))?;
    } else {
        println!("{}", exact_counter.map.len());
    }

    // leak the hash map and prevent Drop (and its destructor) from being run.
    // This is useful because cleaning up the hash map takes a significant amount of time,
    // and the OS is going to do it for us regardless.
    std::mem::forget(exact_counter);
    Ok(())
}

/// Applies a line mapper before feeding lines into the wrapped counter.
struct MappedLines<'a, C, M> {
    inner: &'a mut C,
    mapper: M,
    buffer: Vec<u8>,
}

impl<'a, C, M> MappedLines<'a, C, M>
where
    C: CountLines,
    M: for<'b> FnMut(&'b [u8], &'b mut Vec<u8>) -> &'b [u8],
{
    fn new(inner: &'a mut C, mapper: M) -> Self {
        Self {
            inner,
            mapper,
            buffer: Vec::new(),
        }
    }
}

impl<'a, C, M> CountLines for MappedLines<'a, C, M>
where
    C: CountLines,
    M: for<'b> FnMut(&'b [u8], &'b mut Vec<u8>) -> &'b [u8],
{
    #[inline(always)]
    fn count_line(&mut self, line: &[u8]) -> Result {
        let line = (self.mapper)(line, &mut self.buffer);
        self.inner.count_line(line)
    }
}

/// Unbounded exact counter backed by a growable hash table.
struct ExactLineCounter {
    map: HashMap<Vec<u8>, u64, ahash::RandomState>,
}

impl ExactLineCounter {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity_and_hasher(capacity, ahash::RandomState::new()),
        }
    }
}

impl CountLines for ExactLineCounter {
    #[inline(always)]
    fn count_line(&mut self, line: &[u8]) -> Result {
        match self.map.get_mut(line) {
            Some(count) => *count += 1,
            None => {
                self.map.insert(line.to_vec(), 1);
            }
        }
        Ok(())
    }
}

#[inline(always)]
fn write_line<T: Write, C: Display>(writer: &mut T, line: &[u8], count: &C) -> Result {
    write!(writer, "{count:7} ").map_err(|e| Error::io_static(STDOUT_ERROR_MESSAGE, e))?;
    writer
        .write_all(line)
        .map_err(|e| Error::io_static(STDOUT_ERROR_MESSAGE, e))?;
    writeln!(writer).map_err(|e| Error::io_static(STDOUT_ERROR_MESSAGE, e))
}

fn print_histogram(counter: &BoundedCounter) -> Result {
    let stdout = io::stdout().lock();
    let mut writer = BufWriter::new(stdout);
    for bin in counter.count_bins() {
        if bin.first_count == bin.last_count {
            writeln!(writer, "count {:>12}: {} lines", bin.first_count, bin.cells)
        } else {
            writeln!(
                writer,
                "count {:>12}..{}: {} lines",
                bin.first_count, bin.last_count, bin.cells
            )
        }
        .map_err(|e| Error::io_static(STDOUT_ERROR_MESSAGE, e))?;
    }
    writer.flush().map_err(|e| Error::io_static(STDOUT_ERROR_MESSAGE, e))
}

fn read_state(path: &Path) -> Result<BoundedCounter> {
    let file = File::open(path)
        .map_err(|e| Error::io(format!("error opening state file \"{}\"", path.display()), e))?;
    let mut reader = BufReader::new(file);
    BoundedCounter::read_from(&mut reader)
}

fn write_state(counter: &BoundedCounter, path: &Path) -> Result {
    let file = File::create(path)
        .map_err(|e| Error::io(format!("error creating state file \"{}\"", path.display()), e))?;
    let mut writer = BufWriter::new(file);
    counter.write_to(&mut writer)?;
    writer
        .flush()
        .map_err(|e| Error::io_static("failed to write state file", e))
}

fn process_input<T>(args: &CliArgs, processor: &mut T) -> Result
where
    T: CountLinesFromReadFile,
{
    // pre-open all files so that we can display any errors and abort *before* doing work
    let mut files: Vec<File> = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let file = File::open(path)
            .map_err(|e| Error::io(format!("error opening file \"{}\"", path.display()), e))?;
        files.push(file);
    }

    process_stdin(args, processor)?;

    use cfg_if::cfg_if;
    cfg_if! {
        if #[cfg(feature = "memmap")] {
            if args.no_memmap {
                // process without memmap
                processor.count_lines_in_files(&files)?;
            } else if args.memmap {
                // use memmap forced by user
                use freq_cardinality::CountLinesFromMemmapFile;
                processor.count_lines_in_memmap_files(&files)?;
            } else {
                cfg_if! {
                    if #[cfg(unix)] {
                        // by default, process with memmap on unix platforms
                        use freq_cardinality::CountLinesFromMemmapFile;
                        processor.count_lines_in_memmap_files(&files)?;
                    } else {
                        // by default, process without memmap on non-unix platforms
                        processor.count_lines_in_files(&files)?;
                    }
                }
            }
        } else {
            if args.memmap {
                Err(Error::message_static("This bfreq binary was compiled without memmap support"))?;
            } else {
                // process without memmap
                processor.count_lines_in_files(&files)?;
            }
        }
    }
    Ok(())
}

#[inline(always)]
fn process_stdin<T>(args: &CliArgs, processor: &mut T) -> Result
where
    T: CountLines,
{
    if !args.no_stdin {
        let stdin_handle = io::stdin().lock();
        if !stdin_handle.is_terminal() {
            processor.count_lines_in_read(stdin_handle)?;
        }
    }
    Ok(())
}

#[inline(always)]
fn preprocess_line<'a, const TRIM: bool, const LOWERCASE: bool>(
    line: &'a [u8],
    buffer: &'a mut Vec<u8>,
) -> &'a [u8] {
    let trimmed = if TRIM { line.trim() } else { line };
    if LOWERCASE {
        buffer.clear();
        trimmed.to_lowercase_into(buffer);
        buffer
    } else {
        trimmed
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_preprocess_passthrough() {
        let mut buffer = Vec::new();
        assert_eq!(preprocess_line::<false, false>(b"  Mixed ", &mut buffer), b"  Mixed ");
    }

    #[test]
    fn test_preprocess_trim() {
        let mut buffer = Vec::new();
        assert_eq!(preprocess_line::<true, false>(b"  Mixed ", &mut buffer), b"Mixed");
    }

    #[test]
    fn test_preprocess_lowercase() {
        let mut buffer = Vec::new();
        assert_eq!(preprocess_line::<false, true>(b"MiXeD", &mut buffer), b"mixed");
    }

    #[test]
    fn test_preprocess_trim_and_lowercase() {
        let mut buffer = Vec::new();
        assert_eq!(preprocess_line::<true, true>(b" MiXeD\t", &mut buffer), b"mixed");
    }
}
