use super::{AudioAsset, Caption, CaptionSource, Record};
use crate::services::caption_decision::caption_with_scientific_name;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The atomic unit written to the persisted dataset, one per [`AudioAsset`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    #[serde(rename = "dataset")]
    pub dataset_name: String,
    #[serde(rename = "path")]
    pub asset_path: PathBuf,
    pub caption: String,
    #[serde(rename = "species")]
    pub label: String,
    pub description: Option<String>,
    pub url: String,
    pub needs_recaptioning: bool,
    pub caption_source: CaptionSource,
    /// Caption with the common name swapped for the scientific name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scientific_caption: Option<String>,
}

impl OutputRow {
    /// Rows for every asset of `record`, in chunk order
    pub fn for_assets(
        dataset_name: &str,
        record: &Record,
        assets: &[AudioAsset],
        caption: &Caption,
        needs_recaptioning: bool,
    ) -> Vec<OutputRow> {
        let scientific_caption = record.scientific_name.as_deref().map(|name| {
            caption_with_scientific_name(&caption.text, &record.label, Some(name))
        });

        assets
            .iter()
            .map(|asset| OutputRow {
                dataset_name: dataset_name.to_string(),
                asset_path: asset.path.clone(),
                caption: caption.text.clone(),
                label: record.label.clone(),
                description: record.description.clone(),
                url: record.url.clone(),
                needs_recaptioning,
                caption_source: caption.source,
                scientific_caption: scientific_caption.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_row_per_asset_in_order() {
        let record = Record {
            id: 5,
            label: "Gray Seal".to_string(),
            description: Some("barking".to_string()),
            url: "https://x/5.m4a".to_string(),
            current_caption: None,
            species_count: 0,
            scientific_name: Some("Halichoerus grypus".to_string()),
        };
        let assets: Vec<AudioAsset> = (0..3)
            .map(|i| AudioAsset::from_frames(PathBuf::from(format!("5_{}.wav", i)), 480_000, 48_000, 5))
            .collect();
        let caption = Caption::new("A Gray Seal barking", CaptionSource::Regenerated);

        let rows = OutputRow::for_assets("inaturalist", &record, &assets, &caption, true);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].asset_path, PathBuf::from("5_2.wav"));
        assert!(rows.iter().all(|r| r.needs_recaptioning));
        assert_eq!(
            rows[0].scientific_caption.as_deref(),
            Some("A Halichoerus grypus barking")
        );
    }
}
