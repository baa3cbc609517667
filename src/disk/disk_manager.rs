use std::{
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    path::Path,
    sync::{Mutex, MutexGuard},
};

use log::debug;

use crate::{
    error::{MinnowError, MinnowResult},
    types::{PageId, PAGE_SIZE},
};

/// Synchronous page-granular access to a single database file.
///
/// All methods are thread-safe; the file handle is shared behind a mutex.
pub struct DiskManager {
    file: Mutex<File>,
}

impl DiskManager {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self, MinnowError> {
        let f = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .open(file_path)?;

        Ok(Self {
            file: Mutex::new(f),
        })
    }

    fn get_file(&self) -> MutexGuard<'_, File> {
        self.file.lock().unwrap()
    }

    /// Read one page into `buf`. A page beyond the end of the file (written
    /// never or partially) reads as zeros past the valid prefix.
    pub fn read_page(&self, page_id: PageId, buf: &mut [u8; PAGE_SIZE]) -> MinnowResult {
        if page_id < 0 {
            return Err(MinnowError::InvalidPageId(page_id));
        }

        let offset = page_id as u64 * PAGE_SIZE as u64;
        let mut file = self.get_file();
        let file_len = file.metadata()?.len();

        buf.fill(0);
        if offset >= file_len {
            debug!("read of unwritten page {}, returning zeros", page_id);
            return Ok(());
        }

        file.seek(SeekFrom::Start(offset))?;
        let readable = std::cmp::min(PAGE_SIZE as u64, file_len - offset) as usize;
        file.read_exact(&mut buf[..readable])?;
        Ok(())
    }

    pub fn write_page(&self, page_id: PageId, buf: &[u8; PAGE_SIZE]) -> MinnowResult {
        if page_id < 0 {
            return Err(MinnowError::InvalidPageId(page_id));
        }

        let offset = page_id as u64 * PAGE_SIZE as u64;
        let mut file = self.get_file();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(buf)?;
        file.flush()?;
        Ok(())
    }

    /// Page ids are handed out by the buffer pool's sharded counter and
    /// are not recycled; deallocation only logs.
    pub fn deallocate_page(&self, page_id: PageId) {
        debug!("deallocate page {}", page_id);
    }
}
