use super::display_name;
use crate::error::Result;
use crate::extractor::Extractor;
use async_trait::async_trait;
use std::path::Path;

/// Drawings are not parsed; their file name is the only searchable text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CadExtractor;

#[async_trait]
impl Extractor for CadExtractor {
    async fn extract(&self, path: &Path) -> Result<Option<String>> {
        Ok(Some(display_name(path)))
    }

    fn name(&self) -> &str {
        "cad-filename"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_name_is_the_text() -> Result<()> {
        // the file does not need to exist
        let text = CadExtractor
            .extract(Path::new("/archive/site/Grundriss_EG.dwg"))
            .await?;
        assert_eq!(text.as_deref(), Some("Grundriss_EG.dwg"));
        Ok(())
    }
}
