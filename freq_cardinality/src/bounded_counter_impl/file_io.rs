// This file is part of freq_cardinality. Copyright © 2026 freq_cardinality contributors.
// freq_cardinality is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

use std::fs::File;
use std::io::BufReader;

use crate::{CountLines, Result};

/// Provides capability to count data from newline-delimited files
pub trait CountLinesFromReadFile: CountLines {
    /// Count lines in some newline-delimited files.
    fn count_lines_in_files(&mut self, files: &[File]) -> Result;

    /// Count lines in a newline-delimited file.
    fn count_lines_in_file(&mut self, file: &File) -> Result;
}

impl<T> CountLinesFromReadFile for T
where
    T: CountLines,
{
    fn count_lines_in_files(&mut self, files: &[File]) -> Result {
        for file in files {
            self.count_lines_in_file(file)?;
        }
        Ok(())
    }

    fn count_lines_in_file(&mut self, file: &File) -> Result {
        let reader = BufReader::new(file);
        self.count_lines_in_read(reader)
    }
}

/// Provides capability to count data from newline-delimited memory-mapped files
#[cfg(feature = "memmap")]
pub trait CountLinesFromMemmapFile: CountLines {
    /// Count lines in some newline-delimited files.
    fn count_lines_in_memmap_files(&mut self, files: &[File]) -> Result;

    /// Count lines in a newline-delimited file.
    fn count_lines_in_memmap_file(&mut self, file: &File) -> Result;
}

#[cfg(feature = "memmap")]
impl<T> CountLinesFromMemmapFile for T
where
    T: CountLines,
{
    fn count_lines_in_memmap_files(&mut self, files: &[File]) -> Result {
        for file in files {
            self.count_lines_in_memmap_file(file)?;
        }
        Ok(())
    }

    fn count_lines_in_memmap_file(&mut self, file: &File) -> Result {
        let mem_map = unsafe { memmap2::Mmap::map(file) }
            .map_err(|e| crate::Error::io_static("failed to memmap file", e))?;

        #[cfg(unix)]
        {
            use memmap2::Advice;
            mem_map
                .advise(Advice::WillNeed)
                .map_err(|e| crate::Error::io_static("failed to set memmap file to WillNeed mode", e))?;
            mem_map
                .advise(Advice::Sequential)
                .map_err(|e| crate::Error::io_static("failed to set memmap file to Sequential mode", e))?;
        }

        self.count_lines_in_bytes(&mem_map)
    }
}
