use crate::aggregate::aggregate;
use crate::error::DatasetError;
use crate::model::{FileHandle, PivotViews, RawRow};

/// The accumulating collection of loaded source files and their rows.
///
/// Invariant: every row's `source_file` names exactly one loaded file.
/// Both mutations (add, remove) trigger a full synchronous recompute of
/// the pivot views — variant detection is a whole-dataset property, so
/// there is no incremental path to diverge from.
#[derive(Debug, Default)]
pub struct Dataset {
    files: Vec<FileHandle>,
    rows: Vec<RawRow>,
    views: PivotViews,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one parsed file. A file name that is already loaded is
    /// rejected before any rows are taken.
    pub fn add_file(&mut self, name: &str, mut rows: Vec<RawRow>) -> Result<(), DatasetError> {
        if self.files.iter().any(|f| f.name == name) {
            return Err(DatasetError::DuplicateFile(name.to_string()));
        }
        for row in &mut rows {
            row.source_file = name.to_string();
        }
        self.files.push(FileHandle { name: name.to_string(), row_count: rows.len() });
        self.rows.extend(rows);
        self.recompute();
        Ok(())
    }

    /// Remove a loaded file and every row it contributed.
    pub fn remove_file(&mut self, name: &str) -> Result<(), DatasetError> {
        let before = self.files.len();
        self.files.retain(|f| f.name != name);
        if self.files.len() == before {
            return Err(DatasetError::UnknownFile(name.to_string()));
        }
        self.rows.retain(|r| r.source_file != name);
        self.recompute();
        Ok(())
    }

    pub fn files(&self) -> &[FileHandle] {
        &self.files
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn views(&self) -> &PivotViews {
        &self.views
    }

    fn recompute(&mut self) {
        self.views = aggregate(&self.rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smeta_core::ItemType;

    fn row(name: &str, price: f64, volume: f64) -> RawRow {
        RawRow {
            code: "мат-1".into(),
            item_type: ItemType::Material,
            name: name.into(),
            unit: "м".into(),
            volume,
            price_materials: price,
            price_works: 0.0,
            source_file: String::new(),
        }
    }

    #[test]
    fn duplicate_file_rejected() {
        let mut ds = Dataset::new();
        ds.add_file("a.xlsx", vec![row("Кабель", 1.0, 1.0)]).unwrap();
        let err = ds.add_file("a.xlsx", vec![row("Бетон", 1.0, 1.0)]);
        assert_eq!(err, Err(DatasetError::DuplicateFile("a.xlsx".into())));
        assert_eq!(ds.files().len(), 1);
        assert_eq!(ds.rows().len(), 1);
    }

    #[test]
    fn rows_are_stamped_with_file_name() {
        let mut ds = Dataset::new();
        ds.add_file("a.xlsx", vec![row("Кабель", 1.0, 1.0)]).unwrap();
        assert_eq!(ds.rows()[0].source_file, "a.xlsx");
        assert_eq!(ds.files()[0].row_count, 1);
    }

    #[test]
    fn removal_leaves_no_residue() {
        let a = vec![row("Кабель", 100.0, 5.0), row("Бетон", 4500.0, 1.0)];
        let b = vec![row("Кабель", 120.0, 2.0), row("Щебень", 900.0, 3.0)];

        let mut ds = Dataset::new();
        ds.add_file("a.xlsx", a).unwrap();
        ds.add_file("b.xlsx", b.clone()).unwrap();
        assert_eq!(ds.views().stats.different_price_count, 1);

        ds.remove_file("a.xlsx").unwrap();

        let mut only_b = Dataset::new();
        only_b.add_file("b.xlsx", b).unwrap();

        let got = serde_json::to_string(ds.views()).unwrap();
        let want = serde_json::to_string(only_b.views()).unwrap();
        assert_eq!(got, want);
    }

    #[test]
    fn remove_unknown_file_fails() {
        let mut ds = Dataset::new();
        assert_eq!(
            ds.remove_file("ghost.xlsx"),
            Err(DatasetError::UnknownFile("ghost.xlsx".into()))
        );
    }
}
