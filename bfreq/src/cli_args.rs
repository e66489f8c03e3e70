// This file is part of bfreq. Copyright © 2026 bfreq contributors.
// bfreq is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Counts line frequencies from newline (\n) delimited input within a fixed memory budget.
/// Input can be provided via stdin and/or file arguments.
#[derive(Parser)]
#[command(version, about, long_about, author)]
pub struct CliArgs {
    /// Files to process.
    pub files: Vec<PathBuf>,

    /// Instead of printing the distinct line estimate, print a report showing the occurrence
    /// count of each tracked line.
    #[arg(short = 'c', long)]
    pub report: bool,

    /// Sort report output by occurrence count, largest first. Has no effect unless used with
    /// `--report`.
    #[arg(short = 's', long)]
    pub sort: bool,

    /// Remove leading and trailing whitespace from input
    #[arg(short, long)]
    pub trim: bool,

    /// Convert input to lowercase
    #[arg(short, long = "lower")]
    pub lowercase: bool,

    /// Sets the algorithm used to count line frequencies.
    #[arg(value_enum, short = 'm', long, default_value_t)]
    pub mode: Mode,

    /// Set the size used by the selected counting mode. See the `--mode` documentation for how
    /// this affects each counting mode.
    #[arg(short = 'n', long)]
    pub size: Option<usize>,

    /// Only report lines seen at least this many times. Has no effect unless used with
    /// `--report`.
    #[arg(long, default_value_t = 1)]
    pub min_count: i64,

    /// Print the distribution of tracked counts after processing. Only supported in "bounded"
    /// mode.
    #[arg(long)]
    pub histogram: bool,

    /// Resume counting from a state file written by `--save`. Only supported in "bounded" mode.
    #[arg(long)]
    pub load: Option<PathBuf>,

    /// Write the counter state to a file after processing. Only supported in "bounded" mode.
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Disable checking stdin for input. May yield a small performance improvement when only
    /// reading input from files.
    #[arg(long)]
    pub no_stdin: bool,

    /// Force reading files via memmap. This may yield improved performance for large files. If
    /// the binary was built without memmap support, using this flag will result in an error.
    #[arg(long)]
    pub memmap: bool,

    /// Disable reading files via memmap, instead falling back to normal reads. By default, bfreq
    /// will try to use memmap if it thinks it will be faster. Disabling memmap may yield improved
    /// performance for small files.
    #[arg(long)]
    pub no_memmap: bool,
}

/// Mode used to count line frequencies
#[derive(ValueEnum, Clone, Default)]
pub enum Mode {
    /// Counts within a fixed number of table slots, set with `--size` (rounded down to a power
    /// of two, default 2^20). When the table fills past three quarters, rarely-seen lines are
    /// evicted: reported counts become lower bounds and the distinct estimate is served by a
    /// HyperLogLog sketch. Memory use never grows with the input.
    #[default]
    Bounded,
    /// Uses an ordinary hash table that grows with the cardinality of the input. Counts are
    /// exact. You may use `--size` to set the initial capacity of the internal hash table,
    /// which may help reduce expensive reallocations for very large inputs. This mode does not
    /// support `--save`, `--load` or `--histogram`.
    Exact,
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            Mode::Bounded => "bounded",
            Mode::Exact => "exact",
        };
        f.write_str(str)
    }
}
