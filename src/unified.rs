//! Unified view over every retained file.

use crate::models::{FileEntry, MeasurementRecord};

/// Concatenate the entries' records in store order, then row order, assigning
/// each copy its 0-based position as `index`. The entries are not modified.
pub fn build_unified_view(entries: &[FileEntry]) -> Vec<MeasurementRecord> {
    entries
        .iter()
        .flat_map(|entry| entry.data.iter())
        .enumerate()
        .map(|(index, record)| record.with_index(index))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, values: &[f64]) -> FileEntry {
        FileEntry {
            id: id.to_string(),
            name: id.to_string(),
            size: 0,
            data: values
                .iter()
                .map(|v| MeasurementRecord::new(format!("{}:{}", id, v), *v, 10.0, 0.0))
                .collect(),
        }
    }

    #[test]
    fn test_indices_are_dense_in_concatenation_order() {
        let entries = vec![entry("a", &[1.0, 2.0, 3.0]), entry("b", &[4.0, 5.0, 6.0])];
        let view = build_unified_view(&entries);

        let indices: Vec<_> = view.iter().map(|r| r.index()).collect();
        let values: Vec<_> = view.iter().map(|r| r.value()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_source_entries_keep_placeholder_index() {
        let entries = vec![entry("a", &[1.0]), entry("b", &[2.0])];
        let view = build_unified_view(&entries);

        assert_eq!(view[1].index(), 1);
        assert_eq!(entries[1].data[0].index(), 0);
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let entries = vec![entry("a", &[1.0, 11.0]), entry("b", &[2.0])];
        assert_eq!(build_unified_view(&entries), build_unified_view(&entries));
    }

    #[test]
    fn test_removal_redensifies() {
        let mut entries = vec![
            entry("a", &[1.0, 2.0]),
            entry("b", &[3.0]),
            entry("c", &[4.0, 5.0]),
        ];
        entries.retain(|e| e.id != "b");
        let view = build_unified_view(&entries);

        assert_eq!(view.iter().map(|r| r.index()).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert!(view.iter().all(|r| !r.serial_number().starts_with("b:")));
    }

    #[test]
    fn test_empty_entries() {
        assert!(build_unified_view(&[]).is_empty());
    }
}
