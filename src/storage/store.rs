//! # Page Store
//!
//! A persistent random-access array of fixed-size pages backed by a single
//! file. Page `i` occupies bytes `[i * PAGE_SIZE, (i + 1) * PAGE_SIZE)`.
//!
//! The store pre-allocates the file to [`MAX_PAGES`] zero pages at open, so
//! every page id below that bound is readable from the start. Page contents
//! are opaque here; interpretation belongs to the caller.
//!
//! ## Boot Modes
//!
//! `open(path, truncate)` with `truncate = true` starts from an empty file;
//! with `truncate = false` it preserves existing content, which is how a
//! tree built in an earlier process becomes visible again.
//!
//! ## Durability
//!
//! `flush` writes through to the OS (a `File` write is unbuffered in user
//! space), so flushed pages survive process exit. `sync` forces the pages
//! to stable storage and is called by the buffer pool at teardown. Nothing
//! here survives a crash mid-operation; there is no log.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use parking_lot::Mutex;

use super::PageId;
use crate::config::{MAX_PAGES, PAGE_SIZE};

#[derive(Debug)]
pub struct PageStore {
    file: File,
    path: PathBuf,
    page_count: usize,
    /// Serializes the extend path. The engine is single-threaded, so this
    /// lock is defensive structure only.
    extend_lock: Mutex<()>,
}

impl PageStore {
    /// Opens the backing file, creating it if absent. Truncates first when
    /// `truncate` is set. The file is zero-extended until it holds at least
    /// [`MAX_PAGES`] pages.
    pub fn open<P: AsRef<Path>>(path: P, truncate: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(truncate)
            .open(&path)
            .wrap_err_with(|| format!("failed to open page file '{}'", path.display()))?;

        let len = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat page file '{}'", path.display()))?
            .len() as usize;

        let mut store = Self {
            file,
            path,
            page_count: len / PAGE_SIZE,
            extend_lock: Mutex::new(()),
        };

        if store.page_count < MAX_PAGES {
            store.extend_to((MAX_PAGES - 1) as PageId)?;
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Reads page `page_id` into a freshly allocated buffer.
    pub fn load(&mut self, page_id: PageId) -> Result<Box<[u8; PAGE_SIZE]>> {
        self.file
            .seek(SeekFrom::Start(page_id as u64 * PAGE_SIZE as u64))
            .wrap_err_with(|| format!("failed to seek to page {page_id}"))?;

        let mut page = Box::new([0u8; PAGE_SIZE]);
        self.file.read_exact(&mut page[..]).wrap_err_with(|| {
            format!(
                "short read on page {page_id} of '{}' (page_count={})",
                self.path.display(),
                self.page_count
            )
        })?;

        Ok(page)
    }

    /// Writes `page` at the byte offset of `page_id`. The write reaches the
    /// OS before this returns; see the module docs for the durability story.
    pub fn flush(&mut self, page_id: PageId, page: &[u8; PAGE_SIZE]) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(page_id as u64 * PAGE_SIZE as u64))
            .wrap_err_with(|| format!("failed to seek to page {page_id}"))?;

        self.file.write_all(page).wrap_err_with(|| {
            format!("failed to write page {page_id} to '{}'", self.path.display())
        })?;

        Ok(())
    }

    /// Appends one zero page.
    pub fn extend(&mut self) -> Result<()> {
        self.file
            .seek(SeekFrom::End(0))
            .wrap_err("failed to seek to end of page file")?;

        let zero = [0u8; PAGE_SIZE];
        self.file.write_all(&zero).wrap_err_with(|| {
            format!("failed to extend '{}' by one page", self.path.display())
        })?;

        self.page_count += 1;
        Ok(())
    }

    /// Ensures at least `page_id + 1` pages exist; no-op when already
    /// satisfied.
    pub fn extend_to(&mut self, page_id: PageId) -> Result<()> {
        let _extend_guard = self.extend_lock.lock();

        let wanted = page_id as usize + 1;
        if wanted <= self.page_count {
            return Ok(());
        }

        self.file
            .seek(SeekFrom::End(0))
            .wrap_err("failed to seek to end of page file")?;

        let zero = [0u8; PAGE_SIZE];
        for _ in self.page_count..wanted {
            self.file.write_all(&zero).wrap_err_with(|| {
                format!(
                    "failed to extend '{}' to page {page_id}",
                    self.path.display()
                )
            })?;
        }

        self.page_count = wanted;
        Ok(())
    }

    /// Forces all written pages to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.file
            .sync_all()
            .wrap_err_with(|| format!("failed to sync '{}'", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_FILE_NAME;
    use tempfile::tempdir;

    #[test]
    fn open_preallocates_full_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE_NAME);

        let store = PageStore::open(&path, true).unwrap();

        assert_eq!(store.page_count(), MAX_PAGES);
        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len as usize, MAX_PAGES * PAGE_SIZE);
    }

    #[test]
    fn load_returns_zero_page_after_open() {
        let dir = tempdir().unwrap();
        let mut store = PageStore::open(dir.path().join("pages.dat"), true).unwrap();

        let page = store.load(999).unwrap();
        assert!(page.iter().all(|&b| b == 0));
    }

    #[test]
    fn flush_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let mut store = PageStore::open(dir.path().join("pages.dat"), true).unwrap();

        let mut page = Box::new([0u8; PAGE_SIZE]);
        page[0] = 0xAB;
        page[PAGE_SIZE - 1] = 0xCD;
        store.flush(7, &page).unwrap();

        let loaded = store.load(7).unwrap();
        assert_eq!(loaded[0], 0xAB);
        assert_eq!(loaded[PAGE_SIZE - 1], 0xCD);

        let neighbor = store.load(8).unwrap();
        assert!(neighbor.iter().all(|&b| b == 0));
    }

    #[test]
    fn reopen_without_truncate_preserves_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pages.dat");

        {
            let mut store = PageStore::open(&path, true).unwrap();
            let mut page = Box::new([0u8; PAGE_SIZE]);
            page[100] = 42;
            store.flush(3, &page).unwrap();
            store.sync().unwrap();
        }

        let mut store = PageStore::open(&path, false).unwrap();
        assert_eq!(store.page_count(), MAX_PAGES);
        assert_eq!(store.load(3).unwrap()[100], 42);
    }

    #[test]
    fn reopen_with_truncate_clears_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pages.dat");

        {
            let mut store = PageStore::open(&path, true).unwrap();
            let mut page = Box::new([0u8; PAGE_SIZE]);
            page[0] = 1;
            store.flush(0, &page).unwrap();
            store.sync().unwrap();
        }

        let mut store = PageStore::open(&path, true).unwrap();
        assert_eq!(store.load(0).unwrap()[0], 0);
    }

    #[test]
    fn extend_to_is_noop_within_extent() {
        let dir = tempdir().unwrap();
        let mut store = PageStore::open(dir.path().join("pages.dat"), true).unwrap();

        store.extend_to(5).unwrap();
        assert_eq!(store.page_count(), MAX_PAGES);
    }

    #[test]
    fn extend_to_grows_past_preallocation() {
        let dir = tempdir().unwrap();
        let mut store = PageStore::open(dir.path().join("pages.dat"), true).unwrap();

        store.extend_to(1200).unwrap();
        assert_eq!(store.page_count(), 1201);
        assert!(store.load(1200).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn extend_appends_one_page() {
        let dir = tempdir().unwrap();
        let mut store = PageStore::open(dir.path().join("pages.dat"), true).unwrap();

        store.extend().unwrap();
        assert_eq!(store.page_count(), MAX_PAGES + 1);
    }

    #[test]
    fn load_past_extent_is_an_error() {
        let dir = tempdir().unwrap();
        let mut store = PageStore::open(dir.path().join("pages.dat"), true).unwrap();

        let result = store.load(2000);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("short read"));
    }
}
