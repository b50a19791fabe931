use std::io::Write;
use std::path::{Path, PathBuf};

use futures::{Stream, StreamExt};

use crate::error::SourceError;

/// Consumes a lazy line sequence, writes it as newline-delimited JSON into a
/// temporary file, packs that single file into a deflate-compressed zip,
/// and returns the path to a persistent temporary archive. The returned
/// file outlives this call; the caller owns cleanup.
pub async fn create_ndjson_zip<S>(
    mut lines: S,
    archive_name: &str,
    ndjson_filename: &str,
) -> Result<PathBuf, SourceError>
where
    S: Stream<Item = Result<String, SourceError>> + Unpin,
{
    let workdir = tempfile::tempdir()?;
    let ndjson_path = workdir.path().join(ndjson_filename);

    {
        let mut file = std::fs::File::create(&ndjson_path)?;
        while let Some(line) = lines.next().await {
            let line = line?;
            writeln!(file, "{line}")?;
        }
    }

    let zip_path = workdir.path().join(archive_name);
    write_zip(&ndjson_path, ndjson_filename, &zip_path)?;

    let persistent = tempfile::Builder::new().suffix(".zip").tempfile()?;
    let (_, persistent_path) = persistent.keep().map_err(|e| SourceError::ObjectStore(e.to_string()))?;
    std::fs::copy(&zip_path, &persistent_path)?;

    Ok(persistent_path)
}

fn write_zip(source_path: &Path, arcname: &str, zip_path: &Path) -> Result<(), SourceError> {
    let zip_file = std::fs::File::create(zip_path)?;
    let mut writer = zip::ZipWriter::new(zip_file);
    let options = zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    writer.start_file(arcname, options)?;
    let contents = std::fs::read(source_path)?;
    writer.write_all(&contents)?;
    writer.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn packages_lines_into_a_deflated_zip() {
        let lines = stream::iter(vec![Ok("{\"a\":1}".to_string()), Ok("{\"b\":2}".to_string())]);
        let zip_path = create_ndjson_zip(lines, "out.zip", "events.ndjson").await.unwrap();
        assert!(zip_path.exists());

        let file = std::fs::File::open(&zip_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        let mut contents = String::new();
        std::io::Read::read_to_string(&mut entry, &mut contents).unwrap();
        assert_eq!(contents, "{\"a\":1}\n{\"b\":2}\n");

        std::fs::remove_file(zip_path).ok();
    }

    #[tokio::test]
    async fn propagates_the_first_line_error() {
        let lines = stream::iter(vec![
            Ok("{\"a\":1}".to_string()),
            Err(SourceError::ObjectStore("boom".into())),
        ]);
        let result = create_ndjson_zip(lines, "out.zip", "events.ndjson").await;
        assert!(result.is_err());
    }
}
