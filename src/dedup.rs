// src/dedup.rs
//! URL dedup index: the one piece of state shared by concurrent fetch tasks.
//! Check-then-insert is a single locked operation, so two tasks racing on the
//! same URL cannot both claim it.

use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct UrlIndex {
    inner: Mutex<HashSet<String>>,
}

impl UrlIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warm-start from URLs the sink already holds.
    pub fn preload<I: IntoIterator<Item = String>>(urls: I) -> Self {
        Self {
            inner: Mutex::new(urls.into_iter().collect()),
        }
    }

    /// Mark a batch of URLs as seen.
    pub fn extend<I: IntoIterator<Item = String>>(&self, urls: I) {
        let mut set = self.inner.lock().expect("url index mutex poisoned");
        set.extend(urls);
    }

    /// Atomically claim a URL. Returns `true` if it was not seen before;
    /// `false` means someone else already owns it and the caller must skip.
    pub fn claim(&self, url: &str) -> bool {
        let mut set = self.inner.lock().expect("url index mutex poisoned");
        set.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        let set = self.inner.lock().expect("url index mutex poisoned");
        set.contains(url)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("url index mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
