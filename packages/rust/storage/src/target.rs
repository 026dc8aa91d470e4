//! Storage-target path derivation.
//!
//! Snapshot paths are a pure function of the source URL's network location,
//! so repeated runs against one source always overwrite the same pair of
//! files.

use url::Url;

use evidencer_shared::{EvidencerError, Result};

/// Root of the evidence tree, relative to the project root.
const EVIDENCE_DIR: &str = "evidence/parsed";

/// File name of the markdown snapshot.
pub const CONTENT_FILE: &str = "content.md";

/// File name of the metadata envelope.
pub const METADATA_FILE: &str = "metadata.json";

/// The pair of repo-relative paths one acquisition run writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageTarget {
    /// Network location of the source (host plus explicit port).
    pub domain: String,
    /// Snapshot directory, e.g. `evidence/parsed/www.denverbroncos.com`.
    pub dir: String,
    /// Path of `content.md`.
    pub content_path: String,
    /// Path of `metadata.json`.
    pub metadata_path: String,
}

impl StorageTarget {
    /// Derive the target paths for a source URL.
    ///
    /// Deterministic: only the network-location component participates, so
    /// `https://host/page` and `https://host` map to the same directory.
    pub fn for_source(source: &Url) -> Result<Self> {
        let host = source
            .host_str()
            .ok_or_else(|| EvidencerError::Persist(format!("{source}: URL has no host")))?;

        let domain = match source.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let dir = format!("{EVIDENCE_DIR}/{domain}");
        Ok(Self {
            content_path: format!("{dir}/{CONTENT_FILE}"),
            metadata_path: format!("{dir}/{METADATA_FILE}"),
            domain,
            dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(url: &str) -> StorageTarget {
        StorageTarget::for_source(&Url::parse(url).unwrap()).unwrap()
    }

    #[test]
    fn derives_domain_scoped_paths() {
        let t = target("https://www.denverbroncos.com");
        assert_eq!(t.domain, "www.denverbroncos.com");
        assert_eq!(t.dir, "evidence/parsed/www.denverbroncos.com");
        assert_eq!(
            t.content_path,
            "evidence/parsed/www.denverbroncos.com/content.md"
        );
        assert_eq!(
            t.metadata_path,
            "evidence/parsed/www.denverbroncos.com/metadata.json"
        );
    }

    #[test]
    fn path_component_does_not_matter() {
        assert_eq!(
            target("https://www.denverbroncos.com/page"),
            target("https://www.denverbroncos.com")
        );
        assert_eq!(
            target("https://www.denverbroncos.com/a/b?q=1#frag"),
            target("https://www.denverbroncos.com")
        );
    }

    #[test]
    fn explicit_port_is_part_of_the_domain() {
        let t = target("http://127.0.0.1:8080/page");
        assert_eq!(t.domain, "127.0.0.1:8080");
        assert_eq!(t.dir, "evidence/parsed/127.0.0.1:8080");
    }

    #[test]
    fn default_port_is_omitted() {
        let t = target("https://example.com:443/x");
        assert_eq!(t.domain, "example.com");
    }

    #[test]
    fn hostless_url_is_rejected() {
        let url = Url::parse("unix:/run/socket").unwrap();
        assert!(StorageTarget::for_source(&url).is_err());
    }
}
