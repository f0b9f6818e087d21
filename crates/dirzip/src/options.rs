use std::io::{self, Write};
use std::sync::Arc;

use sha2::Digest;

/// Which directory entries the traversal mask is matched against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MaskScope {
    /// Mask filters every entry, directories included. A directory whose
    /// name does not match is never descended.
    #[default]
    EveryLevel,
    /// Mask filters regular files only; every directory is descended.
    FilesOnly,
}

#[derive(Clone, Debug)]
pub struct CollectOptions {
    pub mask:         String,
    pub recursive:    bool,
    pub prefix:       String,
    pub mask_scope:   MaskScope,
    pub match_hidden: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            mask:         "*".to_owned(),
            recursive:    true,
            prefix:       String::new(),
            mask_scope:   MaskScope::default(),
            match_hidden: false,
        }
    }
}

impl CollectOptions {
    pub fn mask(mut self, mask: impl Into<String>) -> Self {
        self.mask = mask.into();
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Archive path every collected entry is placed under.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn mask_scope(mut self, scope: MaskScope) -> Self {
        self.mask_scope = scope;
        self
    }

    /// Let wildcards match names starting with `.`.
    pub fn match_hidden(mut self, match_hidden: bool) -> Self {
        self.match_hidden = match_hidden;
        self
    }
}

/// What `add_files` does when one entry fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    FailFast,
    /// Keep going and report every failure at the end.
    CollectAll,
}

#[derive(Clone, Copy, Debug)]
pub struct CreateOptions {
    pub overwrite:      bool,
    pub failure_policy: FailurePolicy,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            overwrite:      true,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl CreateOptions {
    /// Replace an archive that already exists at the path.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

#[derive(Clone, Debug)]
pub struct Progress {
    pub bytes_processed: u64,
    pub total_bytes:     Option<u64>,
    pub current_entry:   Option<String>,
}

impl Progress {
    pub fn percentage(&self) -> Option<f32> {
        self.total_bytes.map(|total| {
            if total == 0 {
                0.0
            } else {
                (self.bytes_processed as f32 / total as f32) * 100.0
            }
        })
    }
}

#[derive(Clone)]
pub struct ExtractOptions {
    pub overwrite:     bool,
    pub hash_strategy: HashStrategy,
    pub on_progress:   Option<Arc<dyn Fn(Progress) + Send + Sync>>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            overwrite:     true,
            hash_strategy: HashStrategy::default(),
            on_progress:   None,
        }
    }
}

impl ExtractOptions {
    /// Replace files that already exist in the target directory.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn hash_strategy(mut self, strategy: HashStrategy) -> Self {
        self.hash_strategy = strategy;
        self
    }

    pub fn on_progress(mut self, callback: Arc<dyn Fn(Progress) + Send + Sync>) -> Self {
        self.on_progress = Some(callback);
        self
    }
}

/// Hash computed over each extracted file's contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HashStrategy {
    #[default]
    None,
    Sha256,
}

impl HashStrategy {
    pub(crate) fn writer<W: Write>(self, inner: W) -> HashingWriter<W> {
        let hasher = match self {
            Self::None => None,
            Self::Sha256 => Some(sha2::Sha256::new()),
        };
        HashingWriter { inner, hasher }
    }
}

/// Writer that hashes everything passing through it.
pub(crate) struct HashingWriter<W> {
    inner:  W,
    hasher: Option<sha2::Sha256>,
}

impl<W: Write> HashingWriter<W> {
    pub(crate) fn finish(mut self) -> io::Result<Option<String>> {
        self.inner.flush()?;
        Ok(self.hasher.map(|h| hex::encode(h.finalize())))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        if let Some(hasher) = self.hasher.as_mut() {
            hasher.update(&buf[..n]);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> { self.inner.flush() }
}

impl std::fmt::Debug for ExtractOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractOptions")
            .field("overwrite", &self.overwrite)
            .field("hash_strategy", &self.hash_strategy)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn collect_options_default() {
        let options = CollectOptions::default();
        assert_eq!(options.mask, "*");
        assert!(options.recursive);
        assert!(options.prefix.is_empty());
        assert_eq!(options.mask_scope, MaskScope::EveryLevel);
        assert!(!options.match_hidden);
    }

    #[test]
    fn collect_options_builder_pattern() {
        let options = CollectOptions::default()
            .mask("*.txt")
            .recursive(false)
            .prefix("docs")
            .mask_scope(MaskScope::FilesOnly)
            .match_hidden(true);

        assert_eq!(options.mask, "*.txt");
        assert!(!options.recursive);
        assert_eq!(options.prefix, "docs");
        assert_eq!(options.mask_scope, MaskScope::FilesOnly);
        assert!(options.match_hidden);
    }

    #[test]
    fn create_options_default_overwrites_and_fails_fast() {
        let options = CreateOptions::default();
        assert!(options.overwrite);
        assert_eq!(options.failure_policy, FailurePolicy::FailFast);

        let options = options.overwrite(false).failure_policy(FailurePolicy::CollectAll);
        assert!(!options.overwrite);
        assert_eq!(options.failure_policy, FailurePolicy::CollectAll);
    }

    #[test]
    fn extract_options_default() {
        let options = ExtractOptions::default();
        assert!(options.overwrite);
        assert_eq!(options.hash_strategy, HashStrategy::None);
        assert!(options.on_progress.is_none());
    }

    #[test]
    fn extract_options_on_progress_callback() {
        let counter = Arc::new(AtomicU64::new(0));
        let counter_clone = counter.clone();

        let options = ExtractOptions::default().on_progress(Arc::new(move |p: Progress| {
            counter_clone.fetch_add(p.bytes_processed, Ordering::SeqCst);
        }));

        (options.on_progress.as_ref().unwrap())(Progress {
            bytes_processed: 7,
            total_bytes:     Some(10),
            current_entry:   Some("a.txt".to_owned()),
        });
        assert_eq!(counter.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn progress_percentage() {
        let progress = Progress {
            bytes_processed: 50,
            total_bytes:     Some(100),
            current_entry:   None,
        };
        assert_eq!(progress.percentage(), Some(50.0));

        let progress = Progress {
            bytes_processed: 0,
            total_bytes:     Some(0),
            current_entry:   None,
        };
        assert_eq!(progress.percentage(), Some(0.0));

        let progress = Progress {
            bytes_processed: 5,
            total_bytes:     None,
            current_entry:   None,
        };
        assert_eq!(progress.percentage(), None);
    }

    #[test]
    fn no_hash_strategy_passes_bytes_through() {
        let mut out = Vec::new();
        let mut writer = HashStrategy::None.writer(&mut out);
        writer.write_all(b"hello world").unwrap();
        assert!(writer.finish().unwrap().is_none());
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn hashing_writer_matches_direct_digest() {
        let mut out = Vec::new();
        let mut writer = HashStrategy::Sha256.writer(&mut out);
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();
        let digest = writer.finish().unwrap();

        assert_eq!(out, b"hello world");
        assert_eq!(
            digest.as_deref(),
            Some("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
        );
    }
}
