//! Sheet registry - the name → sheet lookup used by cross-sheet references

use crate::error::{Error, Result};
use crate::MAX_SHEET_NAME_LEN;

/// Name of the sheet every engine starts with
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Stable index of a sheet within a [`SheetRegistry`]
pub type SheetId = usize;

/// Ordered collection of sheet names.
///
/// Sheets are only ever appended, so a [`SheetId`] stays valid for the
/// lifetime of the registry. Name lookup is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct SheetRegistry {
    names: Vec<String>,
}

impl SheetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding a single sheet
    pub fn with_sheet(name: &str) -> Result<Self> {
        let mut registry = Self::new();
        registry.add(name)?;
        Ok(registry)
    }

    /// Create a registry holding the single [`DEFAULT_SHEET_NAME`] sheet
    pub fn with_default_sheet() -> Self {
        Self {
            names: vec![DEFAULT_SHEET_NAME.to_string()],
        }
    }

    /// Add a sheet, returning its id
    pub fn add(&mut self, name: &str) -> Result<SheetId> {
        self.validate_sheet_name(name)?;
        self.names.push(name.to_string());
        Ok(self.names.len() - 1)
    }

    /// Look up a sheet by name (case-insensitive)
    pub fn index_of(&self, name: &str) -> Option<SheetId> {
        self.names
            .iter()
            .position(|existing| existing.eq_ignore_ascii_case(name))
    }

    /// Look up a sheet by name, failing with [`Error::SheetNotFound`]
    pub fn require(&self, name: &str) -> Result<SheetId> {
        self.index_of(name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    /// Name of a sheet
    pub fn name(&self, id: SheetId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Number of sheets
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if no sheets are registered
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over `(id, name)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (SheetId, &str)> {
        self.names.iter().enumerate().map(|(i, n)| (i, n.as_str()))
    }

    fn validate_sheet_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }

        if self.index_of(name).is_some() {
            return Err(Error::DuplicateSheetName(name.into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut sheets = SheetRegistry::with_sheet("Sheet1").unwrap();
        let data = sheets.add("Data").unwrap();

        assert_eq!(data, 1);
        assert_eq!(sheets.index_of("data"), Some(1));
        assert_eq!(sheets.index_of("SHEET1"), Some(0));
        assert_eq!(sheets.name(1), Some("Data"));
        assert!(sheets.require("Missing").is_err());
    }

    #[test]
    fn test_default_sheet() {
        let sheets = SheetRegistry::with_default_sheet();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets.index_of(DEFAULT_SHEET_NAME), Some(0));
    }

    #[test]
    fn test_duplicate_name() {
        let mut sheets = SheetRegistry::with_sheet("Sheet1").unwrap();
        assert_eq!(
            sheets.add("sheet1"),
            Err(Error::DuplicateSheetName("sheet1".into()))
        );
    }

    #[test]
    fn test_invalid_sheet_name() {
        let mut sheets = SheetRegistry::new();

        assert!(sheets.add("").is_err());
        assert!(sheets.add("Sheet/1").is_err());
        assert!(sheets.add("Sheet:1").is_err());
        assert!(sheets.add("Sheet[1]").is_err());
        assert!(sheets.add(&"A".repeat(MAX_SHEET_NAME_LEN + 1)).is_err());
        assert!(sheets.add("My Sheet").is_ok());
    }
}
