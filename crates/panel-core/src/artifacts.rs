use crate::contracts::ArtifactDescriptor;
use crate::contracts::RunFile;

/// First 8 hex digits of a digest, lowercased. An `algo:` or `algo-`
/// prefix such as `sha256:` is dropped first.
pub fn short_sha(sha: &str) -> Option<String> {
    let digest = sha.trim();
    let digest = match digest.split_once([':', '-']) {
        Some((algo, rest)) if !algo.is_empty() && algo.chars().all(|c| c.is_ascii_alphanumeric()) => rest,
        _ => digest,
    };
    if digest.is_empty() || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(digest.chars().take(8).map(|c| c.to_ascii_lowercase()).collect())
}

pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Resolves storage paths to openable URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactLinker {
    base_url: Option<String>,
}

impl ArtifactLinker {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        Self { base_url }
    }

    pub fn href(&self, path: &str) -> Option<String> {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        if path.starts_with("http://") || path.starts_with("https://") {
            return Some(path.to_string());
        }
        let base = self.base_url.as_ref()?;
        Some(format!("{base}/{}", path.trim_start_matches('/')))
    }
}

/// Display row shared by plan/apply artifacts and run file listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRow {
    pub name: String,
    pub path: String,
    pub purpose: Option<String>,
    pub short_sha: Option<String>,
    pub size: Option<String>,
    pub href: Option<String>,
}

impl ArtifactRow {
    pub fn from_descriptor(artifact: &ArtifactDescriptor, linker: &ArtifactLinker) -> Self {
        Self::build(
            &artifact.name,
            &artifact.path,
            artifact.purpose.as_deref(),
            artifact.sha256.as_deref(),
            artifact.size_bytes,
            linker,
        )
    }

    pub fn from_run_file(file: &RunFile, linker: &ArtifactLinker) -> Self {
        Self::build(
            &file.name,
            &file.path,
            file.purpose.as_deref(),
            file.sha256.as_deref(),
            file.size_bytes,
            linker,
        )
    }

    fn build(
        name: &str,
        path: &str,
        purpose: Option<&str>,
        sha256: Option<&str>,
        size_bytes: Option<u64>,
        linker: &ArtifactLinker,
    ) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            purpose: purpose.map(str::to_string),
            short_sha: sha256.and_then(short_sha),
            size: size_bytes.map(human_size),
            href: linker.href(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn short_sha_takes_eight_hex_digits() {
        assert_eq!(
            short_sha("ABCDEF0123456789").as_deref(),
            Some("abcdef01")
        );
        assert_eq!(short_sha("sha256:12ab").as_deref(), Some("12ab"));
        assert_eq!(short_sha("sha256:12AB34cd56ef").as_deref(), Some("12ab34cd"));
        assert_eq!(short_sha("sha1-deadbeefcafe0011").as_deref(), Some("deadbeef"));
        assert_eq!(short_sha("sha256:").as_deref(), None);
        assert_eq!(short_sha("sha256:not-hex").as_deref(), None);
        assert_eq!(short_sha("zz").as_deref(), None);
    }

    #[test]
    fn human_size_uses_binary_units() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(1023), "1023 B");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(human_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn linker_joins_base_and_passes_absolute_urls() {
        let linker = ArtifactLinker::new(Some("http://localhost:7007/artifacts/".to_string()));
        assert_eq!(
            linker.href("/runs/1/out.json").as_deref(),
            Some("http://localhost:7007/artifacts/runs/1/out.json")
        );
        assert_eq!(
            linker.href("https://cdn.local/x").as_deref(),
            Some("https://cdn.local/x")
        );
        assert_eq!(linker.href("  "), None);
        assert_eq!(ArtifactLinker::new(None).href("runs/1/out.json"), None);
        assert_eq!(ArtifactLinker::new(Some(" ".to_string())).href("a"), None);
    }

    #[test]
    fn artifact_row_derives_display_fields() {
        let linker = ArtifactLinker::new(Some("http://host".to_string()));
        let row = ArtifactRow::from_descriptor(
            &ArtifactDescriptor {
                path: "runs/3/brand.json".to_string(),
                name: "brand.json".to_string(),
                purpose: Some("tokens".to_string()),
                sha256: Some("0123456789abcdef".to_string()),
                size_bytes: Some(2048),
            },
            &linker,
        );
        assert_eq!(row.short_sha.as_deref(), Some("01234567"));
        assert_eq!(row.size.as_deref(), Some("2.0 KB"));
        assert_eq!(row.href.as_deref(), Some("http://host/runs/3/brand.json"));
    }
}
