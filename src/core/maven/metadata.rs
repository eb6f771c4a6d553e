use quick_xml::de::from_str;
use serde::Deserialize;

use crate::core::error::{BundlerError, BundlerResult};

/// `maven-metadata.xml`, reduced to the version listing.
#[derive(Debug, Deserialize)]
pub struct MavenMetadata {
    versioning: MavenVersioning,
}

#[derive(Debug, Deserialize)]
struct MavenVersioning {
    versions: MavenVersions,
}

#[derive(Debug, Deserialize)]
struct MavenVersions {
    #[serde(rename = "version", default)]
    version: Vec<String>,
}

impl MavenMetadata {
    pub fn parse(xml: &str) -> BundlerResult<Self> {
        from_str(xml).map_err(|e| {
            BundlerError::ProviderUnavailable(format!("Unable to parse maven metadata: {e}"))
        })
    }

    pub fn versions(&self) -> &[String] {
        &self.versioning.versions.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_version_listing() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>net.minecraftforge</groupId>
  <artifactId>forge</artifactId>
  <versioning>
    <latest>1.20.1-47.2.0</latest>
    <versions>
      <version>1.20.1-47.2.0</version>
      <version>1.12.2-14.23.5.2859</version>
      <version>1.7.10-10.13.4.1614-1.7.10</version>
    </versions>
  </versioning>
</metadata>"#;
        let metadata = MavenMetadata::parse(xml).unwrap();
        assert_eq!(metadata.versions().len(), 3);
        assert_eq!(metadata.versions()[1], "1.12.2-14.23.5.2859");
    }

    #[test]
    fn garbage_is_provider_unavailable() {
        assert!(matches!(
            MavenMetadata::parse("<metadata><versioning>"),
            Err(BundlerError::ProviderUnavailable(_))
        ));
    }
}
