use crate::compiler::backend::IrValue;

/// Dimension sizes of a declared array, outermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayInformation {
    pub dimensions: Vec<u32>,
}

/// One declared name: its type, the IR handle of its stack allocation and
/// optional array dimensions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTableRow {
    pub type_name: String,
    pub name: String,
    pub ir_handle: Option<IrValue>,
    pub array_information: Option<ArrayInformation>,
}

/// Indexed store of declared names. Row indices are assigned monotonically
/// and stay valid for the lifetime of the parser: removing a row tombstones
/// it in place instead of shifting its neighbours, so indices held elsewhere
/// never dangle. Uniqueness of names is the caller's duty via scope lookup.
#[derive(Debug, Default)]
pub struct SymbolTable {
    table: Vec<SymbolTableRow>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { table: vec![] }
    }

    /// Append a row and return its index.
    pub fn create_row(
        &mut self,
        type_name: &str,
        name: &str,
        ir_handle: Option<IrValue>,
        dimensions: &[u32],
    ) -> usize {
        let array_information = if dimensions.is_empty() {
            None
        } else {
            Some(ArrayInformation {
                dimensions: dimensions.to_vec(),
            })
        };
        self.table.push(SymbolTableRow {
            type_name: String::from(type_name),
            name: String::from(name),
            ir_handle,
            array_information,
        });

        self.table.len() - 1
    }

    /// Tombstone a row: its fields are cleared but the index stays valid.
    /// @return: false if the index is out of range.
    pub fn remove_row(&mut self, row_index: usize) -> bool {
        match self.table.get_mut(row_index) {
            Some(row) => {
                row.type_name.clear();
                row.name.clear();
                row.ir_handle = None;
                row.array_information = None;
                true
            }
            None => false,
        }
    }

    /// Copy of the row at the given index.
    pub fn get(&self, row_index: usize) -> Option<SymbolTableRow> {
        self.table.get(row_index).cloned()
    }

    pub fn row_count(&self) -> usize {
        self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_indexed_in_creation_order() {
        let mut table = SymbolTable::new();
        assert_eq!(table.create_row("integer", "x", None, &[]), 0);
        assert_eq!(table.create_row("float", "y", None, &[]), 1);
        assert_eq!(table.get(0).unwrap().name, "x");
        assert_eq!(table.get(1).unwrap().type_name, "float");
    }

    #[test]
    fn array_rows_keep_dimensions() {
        let mut table = SymbolTable::new();
        let index = table.create_row("integer", "grid", None, &[4, 8]);
        let row = table.get(index).unwrap();
        assert_eq!(row.array_information.unwrap().dimensions, vec![4, 8]);
    }

    #[test]
    fn remove_tombstones_without_shifting() {
        let mut table = SymbolTable::new();
        let first = table.create_row("integer", "x", None, &[]);
        let second = table.create_row("float", "y", None, &[]);

        assert!(table.remove_row(first));

        let tombstone = table.get(first).unwrap();
        assert!(tombstone.name.is_empty());
        assert!(tombstone.type_name.is_empty());
        assert!(tombstone.array_information.is_none());

        // The neighbouring index is untouched.
        assert_eq!(table.get(second).unwrap().name, "y");
        // New rows continue after the tombstone.
        assert_eq!(table.create_row("boolean", "z", None, &[]), 2);
    }

    #[test]
    fn remove_out_of_range_is_rejected() {
        let mut table = SymbolTable::new();
        assert!(!table.remove_row(0));
    }
}
