use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download from {url} returned an empty body")]
    EmptyBody { url: String },
    #[error("model {name} not found locally and no download URL is configured")]
    NotFound { name: String },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Download progress, called with `(bytes_so_far, content_length)`.
/// `content_length` is 0 when the server does not announce one.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Finds the model file `name`, downloading it only as a last resort.
///
/// Looks in the per-user model cache, then in `bundled_dir`. When neither
/// has it and `url` is set, the file is fetched into the cache.
pub fn resolve(
    name: &str,
    url: Option<&str>,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, name, url, bundled_dir, progress)
}

/// [`resolve`] against an explicit cache directory.
pub fn resolve_in(
    cache_dir: &Path,
    name: &str,
    url: Option<&str>,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let target = cache_dir.join(name);
    let local = std::iter::once(target.clone())
        .chain(bundled_dir.map(|dir| dir.join(name)))
        .find(|candidate| candidate.is_file());
    if let Some(found) = local {
        log::debug!("Using model {}", found.display());
        return Ok(found);
    }

    let Some(url) = url else {
        return Err(ModelResolveError::NotFound {
            name: name.to_string(),
        });
    };
    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {name} from {url}");
    download(url, &target, progress)?;
    Ok(target)
}

/// Where downloaded models are kept:
///
/// - macOS: `~/Library/Application Support/PhotoFrame/models/`
/// - Linux: `$XDG_CACHE_HOME/PhotoFrame/models/` or `~/.cache/PhotoFrame/models/`
/// - Windows: `%LOCALAPPDATA%/PhotoFrame/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join("PhotoFrame").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join("PhotoFrame").join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

/// Fetches `url` into `dest`. The body lands in a sibling `.part` file that
/// only becomes `dest` once the whole body has been written.
fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|source| ModelResolveError::Download {
            url: url.to_string(),
            source,
        })?;
    let total = response.content_length().unwrap_or(0);

    let part = PartFile::create(dest)?;
    let mut sink = ProgressWriter {
        inner: io::BufWriter::new(&part.file),
        written: 0,
        total,
        progress,
    };
    let mut body = response;
    io::copy(&mut body, &mut sink).map_err(|e| part.error(e))?;
    sink.flush().map_err(|e| part.error(e))?;

    if sink.written == 0 {
        return Err(ModelResolveError::EmptyBody {
            url: url.to_string(),
        });
    }
    let written = sink.written;
    drop(sink);

    part.commit()?;
    log::info!("Saved {} ({written} bytes)", dest.display());
    Ok(())
}

/// A `.part` file next to its final destination. Removed on drop unless
/// [`PartFile::commit`] moved it into place.
struct PartFile {
    file: fs::File,
    path: PathBuf,
    dest: PathBuf,
    committed: bool,
}

impl PartFile {
    fn create(dest: &Path) -> Result<Self, ModelResolveError> {
        let path = dest.with_extension("part");
        let file = fs::File::create(&path).map_err(|source| ModelResolveError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            file,
            path,
            dest: dest.to_path_buf(),
            committed: false,
        })
    }

    fn error(&self, source: io::Error) -> ModelResolveError {
        ModelResolveError::Write {
            path: self.path.clone(),
            source,
        }
    }

    fn commit(mut self) -> Result<(), ModelResolveError> {
        self.file.sync_all().map_err(|e| self.error(e))?;
        fs::rename(&self.path, &self.dest).map_err(|source| ModelResolveError::Write {
            path: self.dest.clone(),
            source,
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Counts bytes on their way to `inner` and reports them to `progress`.
struct ProgressWriter<W: Write> {
    inner: W,
    written: u64,
    total: u64,
    progress: Option<ProgressFn>,
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        if let Some(cb) = &self.progress {
            cb(self.written, self.total);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_prefers_cached_file() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&cache).unwrap();
        fs::create_dir_all(&bundled).unwrap();
        fs::write(cache.join("m.onnx"), b"cached").unwrap();
        fs::write(bundled.join("m.onnx"), b"bundled").unwrap();

        let path = resolve_in(&cache, "m.onnx", None, Some(&bundled), None).unwrap();
        assert_eq!(path, cache.join("m.onnx"));
    }

    #[test]
    fn test_resolve_falls_back_to_bundled_file() {
        let tmp = TempDir::new().unwrap();
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("m.onnx"), b"bundled").unwrap();

        let path = resolve_in(&tmp.path().join("cache"), "m.onnx", None, Some(&bundled), None)
            .unwrap();
        assert_eq!(fs::read(path).unwrap(), b"bundled");
    }

    #[test]
    fn test_resolve_without_url_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = resolve_in(tmp.path(), "missing.onnx", None, None, None).unwrap_err();
        assert!(matches!(err, ModelResolveError::NotFound { .. }));
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains("PhotoFrame"));
        assert!(path.to_string_lossy().contains("models"));
    }

    #[test]
    fn test_download_atomic_no_partial_on_failure() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let result = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }

    #[test]
    fn test_uncommitted_part_file_is_removed() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        {
            let part = PartFile::create(&dest).unwrap();
            (&part.file).write_all(b"half a model").unwrap();
            assert!(dest.with_extension("part").exists());
        }
        assert!(!dest.with_extension("part").exists());
        assert!(!dest.exists());
    }

    #[test]
    fn test_committed_part_file_becomes_destination() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.onnx");
        let part = PartFile::create(&dest).unwrap();
        (&part.file).write_all(b"weights").unwrap();
        part.commit().unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"weights");
        assert!(!dest.with_extension("part").exists());
    }

    #[test]
    fn test_progress_writer_reports_running_total() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = std::sync::Arc::clone(&seen);
        let mut writer = ProgressWriter {
            inner: Vec::new(),
            written: 0,
            total: 10,
            progress: Some(Box::new(move |done, total| {
                sink.lock().unwrap().push((done, total))
            })),
        };

        io::copy(&mut &b"abcd"[..], &mut writer).unwrap();
        io::copy(&mut &b"efghij"[..], &mut writer).unwrap();

        assert_eq!(writer.inner, b"abcdefghij");
        assert_eq!(writer.written, 10);
        assert_eq!(seen.lock().unwrap().last(), Some(&(10, 10)));
    }
}
