// This file is part of freq_cardinality. Copyright © 2026 freq_cardinality contributors.
// freq_cardinality is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

//! Snapshot and restore of complete counter state.
//!
//! Format (all integers little endian):
//!
//! +-------+---------------+------+-----------+--------+------+-----------+-----------+
//! | total | str_allocated | size | max_prune | cells  | keys | histogram | registers |
//! +-------+---------------+------+-----------+--------+------+-----------+-----------+
//! total: i64, str_allocated: u64, size: u32, max_prune: i64.
//! The four sections each start with their byte length as u64:
//!   cells:     9 bytes per slot (count as i64, then an occupancy flag byte)
//!   keys:      the NUL-terminated key bytes of every occupied slot, in slot order
//!   histogram: 256 bins as u32
//!   registers: the HyperLogLog register array, one byte each
//!
//! The bucket count is recovered from the cell section's length. Key pointers never
//! hit the wire; restore re-owns each key from the keys section.

use std::io::{ErrorKind, Read, Write};

use crate::bounded_counter_impl::counter::{BoundedCounter, Cell};
use crate::bounded_counter_impl::histogram::{CountHistogram, BIN_COUNT};
use crate::bounded_counter_impl::hyperloglog::{HyperLogLog, REGISTER_COUNT};
use crate::bounded_counter_impl::result::{Error, Result};

const CELL_RECORD_BYTES: u64 = 9;

impl BoundedCounter {
    /// Writes the complete counter state to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result {
        write_all(writer, &self.total.to_le_bytes())?;
        write_all(writer, &self.str_allocated.to_le_bytes())?;
        write_all(writer, &(self.size as u32).to_le_bytes())?;
        write_all(writer, &self.max_prune.to_le_bytes())?;

        write_all(writer, &(self.cells.len() as u64 * CELL_RECORD_BYTES).to_le_bytes())?;
        for cell in &self.cells {
            write_all(writer, &cell.count.to_le_bytes())?;
            write_all(writer, &[cell.key.is_some() as u8])?;
        }

        write_all(writer, &self.str_allocated.to_le_bytes())?;
        for cell in &self.cells {
            if let Some(key) = cell.key.as_deref() {
                write_all(writer, key)?;
                write_all(writer, &[0])?;
            }
        }

        write_all(writer, &(BIN_COUNT as u64 * 4).to_le_bytes())?;
        for bin in self.histogram.bins() {
            write_all(writer, &bin.to_le_bytes())?;
        }

        write_all(writer, &(REGISTER_COUNT as u64).to_le_bytes())?;
        write_all(writer, self.sketch.registers())
    }

    /// Serializes the complete counter state into a byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Restores a counter from `reader`.
    ///
    /// Structural problems (truncation, section lengths that disagree with the header,
    /// a keys section that runs out before every occupied slot has a key) surface as
    /// corrupt-snapshot errors. Bytes past the snapshot are left unread.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let total = i64::from_le_bytes(read_array(reader)?);
        let str_allocated = u64::from_le_bytes(read_array(reader)?);
        let size = u32::from_le_bytes(read_array(reader)?) as usize;
        let max_prune = i64::from_le_bytes(read_array(reader)?);

        let cell_section = u64::from_le_bytes(read_array(reader)?);
        if cell_section % CELL_RECORD_BYTES != 0 {
            return Err(Error::corrupt_static(
                "cell section length is not a whole number of cells",
            ));
        }
        let bucket_count = cell_section / CELL_RECORD_BYTES;
        if bucket_count < 4 || bucket_count > 1u64 << 32 || !bucket_count.is_power_of_two() {
            return Err(Error::corrupt_static("cell section does not describe a valid table"));
        }
        let buckets = usize::try_from(bucket_count)
            .map_err(|_| Error::corrupt_static("cell section too large for this platform"))?;

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(buckets)
            .map_err(|_| Error::out_of_memory_static("failed to allocate cell table"))?;
        let mut occupied_flags = Vec::new();
        occupied_flags
            .try_reserve_exact(buckets)
            .map_err(|_| Error::out_of_memory_static("failed to allocate cell table"))?;
        let mut occupied = 0usize;
        for _ in 0..buckets {
            let record: [u8; 9] = read_array(reader)?;
            let mut count_bytes = [0u8; 8];
            count_bytes.copy_from_slice(&record[..8]);
            let count = i64::from_le_bytes(count_bytes);
            match record[8] {
                0 => {
                    cells.push(Cell::default());
                    occupied_flags.push(false);
                }
                1 => {
                    if count < 0 {
                        return Err(Error::corrupt_static("negative count in cell section"));
                    }
                    cells.push(Cell { key: None, count });
                    occupied_flags.push(true);
                    occupied += 1;
                }
                _ => return Err(Error::corrupt_static("bad occupancy flag in cell section")),
            }
        }
        if occupied != size {
            return Err(Error::corrupt_static("cell section disagrees with recorded size"));
        }

        let key_section = u64::from_le_bytes(read_array(reader)?);
        if key_section != str_allocated {
            return Err(Error::corrupt_static(
                "key section length disagrees with recorded key storage",
            ));
        }
        let key_section = usize::try_from(key_section)
            .map_err(|_| Error::corrupt_static("key section too large for this platform"))?;
        let mut key_bytes = Vec::new();
        key_bytes
            .try_reserve_exact(key_section)
            .map_err(|_| Error::out_of_memory_static("failed to allocate key storage"))?;
        key_bytes.resize(key_section, 0);
        read_exact(reader, &mut key_bytes)?;

        let mut cursor = 0usize;
        for (cell, &has_key) in cells.iter_mut().zip(&occupied_flags) {
            if !has_key {
                continue;
            }
            let remaining = &key_bytes[cursor..];
            let Some(terminator) = remaining.iter().position(|&byte| byte == 0) else {
                return Err(Error::corrupt_static(
                    "key section exhausted before every occupied slot was filled",
                ));
            };
            let mut owned = Vec::new();
            owned
                .try_reserve_exact(terminator)
                .map_err(|_| Error::out_of_memory_static("failed to allocate key storage"))?;
            owned.extend_from_slice(&remaining[..terminator]);
            cell.key = Some(owned.into_boxed_slice());
            cursor += terminator + 1;
        }
        if cursor != key_bytes.len() {
            return Err(Error::corrupt_static("key section has trailing bytes"));
        }

        let histogram_section = u64::from_le_bytes(read_array(reader)?);
        if histogram_section != BIN_COUNT as u64 * 4 {
            return Err(Error::corrupt_static("histogram section has the wrong length"));
        }
        let bin_bytes: [u8; BIN_COUNT * 4] = read_array(reader)?;
        let histogram = CountHistogram::from_bytes(&bin_bytes);

        let register_section = u64::from_le_bytes(read_array(reader)?);
        if register_section != REGISTER_COUNT as u64 {
            return Err(Error::corrupt_static("register section has the wrong length"));
        }
        let mut registers = Vec::new();
        registers
            .try_reserve_exact(REGISTER_COUNT)
            .map_err(|_| Error::out_of_memory_static("failed to allocate sketch registers"))?;
        registers.resize(REGISTER_COUNT, 0);
        read_exact(reader, &mut registers)?;
        let sketch = HyperLogLog::from_registers(registers)
            .ok_or_else(|| Error::corrupt_static("register section has the wrong length"))?;

        Ok(BoundedCounter {
            cells,
            mask: buckets - 1,
            size,
            total,
            str_allocated,
            max_prune,
            histogram,
            sketch,
        })
    }

    /// Restores a counter from a byte slice produced by
    /// [`to_bytes`](BoundedCounter::to_bytes). Trailing bytes are an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = bytes;
        let counter = Self::read_from(&mut reader)?;
        if !reader.is_empty() {
            return Err(Error::corrupt_static("snapshot has trailing bytes"));
        }
        Ok(counter)
    }
}

fn write_all<W: Write>(writer: &mut W, bytes: &[u8]) -> Result {
    writer
        .write_all(bytes)
        .map_err(|e| Error::io_static("failed to write snapshot", e))
}

fn read_exact<R: Read>(reader: &mut R, buffer: &mut [u8]) -> Result {
    reader.read_exact(buffer).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => Error::corrupt_static("snapshot truncated"),
        _ => Error::io_static("failed to read snapshot", e),
    })
}

fn read_array<const N: usize, R: Read>(reader: &mut R) -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    read_exact(reader, &mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::{BoundedCounter, ErrorCause};

    /// Compare every public observer of two counters.
    fn assert_indistinguishable(left: &BoundedCounter, right: &BoundedCounter, keys: &[Vec<u8>]) {
        assert_eq!(left.buckets(), right.buckets());
        assert_eq!(left.total(), right.total());
        assert_eq!(left.occupied(), right.occupied());
        assert_eq!(left.live(), right.live());
        assert_eq!(left.mem(), right.mem());
        assert_eq!(left.cardinality(), right.cardinality());
        assert_eq!(left.quality(), right.quality());
        assert_eq!(left.count_bins(), right.count_bins());
        for key in keys {
            assert_eq!(left.get(key), right.get(key), "key {key:?}");
        }
        let left_items: Vec<(Vec<u8>, i64)> =
            left.iter().map(|(key, count)| (key.to_vec(), count)).collect();
        let right_items: Vec<(Vec<u8>, i64)> =
            right.iter().map(|(key, count)| (key.to_vec(), count)).collect();
        assert_eq!(left_items, right_items);
    }

    fn varied_keys(count: usize) -> Vec<Vec<u8>> {
        let mut rng = StdRng::seed_from_u64(7);
        (0..count)
            .map(|index| {
                let salt: u32 = rng.gen();
                format!("key-{index}-{salt:08x}").into_bytes()
            })
            .collect()
    }

    #[test]
    fn test_round_trip_empty() {
        let counter = BoundedCounter::new(64).unwrap();
        let restored = BoundedCounter::from_bytes(&counter.to_bytes().unwrap()).unwrap();
        assert_indistinguishable(&counter, &restored, &[b"anything".to_vec()]);
    }

    #[test]
    fn test_round_trip_exact() {
        let keys = varied_keys(1_000);
        let mut rng = StdRng::seed_from_u64(8);
        let mut counter = BoundedCounter::new(4096).unwrap();
        for key in &keys {
            counter.increment_by(key, rng.gen_range(1..100i64)).unwrap();
        }
        // 1000 keys in 4096 slots never crossed the prune threshold
        assert_eq!(counter.cardinality(), 1_000);

        let restored = BoundedCounter::from_bytes(&counter.to_bytes().unwrap()).unwrap();
        assert_indistinguishable(&counter, &restored, &keys);
    }

    #[test]
    fn test_round_trip_pruned() {
        let keys = varied_keys(2_000);
        let mut counter = BoundedCounter::new(256).unwrap();
        for (index, key) in keys.iter().enumerate() {
            counter.increment_by(key, (index % 50 + 1) as i64).unwrap();
        }
        counter.delete(keys[0].as_slice());

        let mut restored = BoundedCounter::from_bytes(&counter.to_bytes().unwrap()).unwrap();
        assert_indistinguishable(&counter, &restored, &keys);

        // identical operations must keep the two counters identical
        for key in keys.iter().step_by(3) {
            counter.increment_by(key, 2).unwrap();
            restored.increment_by(key, 2).unwrap();
        }
        assert_indistinguishable(&counter, &restored, &keys);
    }

    #[test]
    fn test_write_read_round_trip() {
        let mut counter = BoundedCounter::new(64).unwrap();
        counter.increment_by(b"ab", 3).unwrap();
        let mut buffer = Vec::new();
        counter.write_to(&mut buffer).unwrap();
        let mut reader = buffer.as_slice();
        let restored = BoundedCounter::read_from(&mut reader).unwrap();
        assert!(reader.is_empty());
        assert_eq!(restored.get(b"ab"), 3);
    }

    #[test]
    fn test_truncated_snapshots_are_rejected() {
        let mut counter = BoundedCounter::new(8).unwrap();
        counter.increment(b"ab").unwrap();
        let bytes = counter.to_bytes().unwrap();
        for cut in [0, 10, 27, 40, 100, bytes.len() - 1] {
            let error = BoundedCounter::from_bytes(&bytes[..cut]).unwrap_err();
            assert!(
                matches!(error.get_cause(), ErrorCause::CorruptSnapshot),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let counter = BoundedCounter::new(8).unwrap();
        let mut bytes = counter.to_bytes().unwrap();
        bytes.push(0);
        let error = BoundedCounter::from_bytes(&bytes).unwrap_err();
        assert!(matches!(error.get_cause(), ErrorCause::CorruptSnapshot));
    }

    #[test]
    fn test_bad_cell_section_length_is_rejected() {
        let mut counter = BoundedCounter::new(8).unwrap();
        counter.increment(b"ab").unwrap();
        let mut bytes = counter.to_bytes().unwrap();
        // the cell section length prefix sits right after the fixed header
        bytes[28..36].copy_from_slice(&9u64.to_le_bytes());
        let error = BoundedCounter::from_bytes(&bytes).unwrap_err();
        assert!(matches!(error.get_cause(), ErrorCause::CorruptSnapshot));
    }

    #[test]
    fn test_missing_key_terminator_is_rejected() {
        let mut counter = BoundedCounter::new(8).unwrap();
        counter.increment(b"ab").unwrap();
        let mut bytes = counter.to_bytes().unwrap();
        let position = bytes
            .windows(3)
            .position(|window| window == b"ab\x00".as_slice())
            .unwrap();
        bytes[position + 2] = b'x';
        let error = BoundedCounter::from_bytes(&bytes).unwrap_err();
        assert!(matches!(error.get_cause(), ErrorCause::CorruptSnapshot));
    }
}
