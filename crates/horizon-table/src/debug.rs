//! Text dumps of a controller's sections and rows.
//!
//! ```
//! use horizon_table::{DataController, HeadlessTable, Row, Section, TableConfig};
//! use horizon_table::debug::{TableTreeDebug, TreeFormatOptions};
//!
//! let controller = DataController::new(HeadlessTable::shared(), TableConfig::default());
//! controller.add_section(Section::new(1).with_header_title("Account").into_shared());
//! controller.add_row(Row::standard().with_tag(7).into_shared());
//!
//! let dump = TableTreeDebug::with_options(&controller, TreeFormatOptions::minimal()).format();
//! assert!(dump.contains("Section 1 \"Account\""));
//! assert!(dump.contains("Row 7"));
//! ```

use std::fmt::{self, Write};

use crate::controller::DataController;
use crate::row::{ObjectMode, Row};
use crate::section::Section;

/// Style of the tree branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters.
    Ascii,
    /// Box-drawing characters.
    #[default]
    Unicode,
    /// Dashes only.
    Compact,
}

/// What the dump includes.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// Branch characters.
    pub style: TreeStyle,
    /// Show row ids.
    pub show_ids: bool,
    /// Show cell class names.
    pub show_types: bool,
    /// Show object mode, visibility and binding counts.
    pub show_properties: bool,
    /// List the backing objects of dynamic sections.
    pub show_objects: bool,
    /// Stop below this depth. Sections are depth 1, rows 2, objects 3.
    pub max_depth: Option<usize>,
    /// Spaces per nesting level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_types: true,
            show_properties: false,
            show_objects: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Everything.
    pub fn detailed() -> Self {
        Self {
            show_properties: true,
            show_objects: true,
            ..Default::default()
        }
    }

    /// Tags and titles only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_types: false,
            show_properties: false,
            show_objects: false,
            ..Default::default()
        }
    }
}

/// Renders the sections and rows of a [`DataController`] as a tree.
#[derive(Debug, Clone)]
pub struct TableTreeDebug<'a> {
    controller: &'a DataController,
    options: TreeFormatOptions,
}

impl<'a> TableTreeDebug<'a> {
    /// Dump `controller` with default options.
    pub fn new(controller: &'a DataController) -> Self {
        Self::with_options(controller, TreeFormatOptions::default())
    }

    /// Dump `controller` with custom options.
    pub fn with_options(controller: &'a DataController, options: TreeFormatOptions) -> Self {
        Self { controller, options }
    }

    /// Render the tree.
    pub fn format(&self) -> String {
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_tree(&mut output);
        output
    }

    fn write_tree(&self, out: &mut impl Write) -> fmt::Result {
        let sections = self.controller.sections();
        let mode = if self.controller.is_editing() { ", editing" } else { "" };
        writeln!(out, "Table ({} sections{mode}):", sections.len())?;
        if sections.is_empty() {
            return writeln!(out, "  (empty)");
        }
        let count = sections.len();
        for (i, section) in sections.iter().enumerate() {
            self.write_section(out, section, i + 1 == count)?;
        }
        Ok(())
    }

    fn write_section(&self, out: &mut impl Write, section: &Section, is_last: bool) -> fmt::Result {
        if self.too_deep(1) {
            return Ok(());
        }
        write!(out, "{}Section {}", self.build_prefix(1, is_last), section.tag())?;
        if let Some(title) = section.header_title() {
            write!(out, " \"{title}\"")?;
        }
        if self.options.show_properties && section.is_dynamic() {
            write!(out, " dynamic, {} objects", section.dynamic_objects().map_or(0, |o| o.len()))?;
        }
        writeln!(out)?;

        let rows = section.all_rows();
        let count = rows.len();
        for (i, row) in rows.iter().enumerate() {
            self.write_row(out, section, row, i + 1 == count)?;
        }
        Ok(())
    }

    fn write_row(&self, out: &mut impl Write, section: &Section, row: &Row, is_last: bool) -> fmt::Result {
        if self.too_deep(2) {
            return Ok(());
        }
        write!(out, "{}Row {}", self.build_prefix(2, is_last), row.tag())?;
        if self.options.show_ids {
            write!(out, " [{}]", row.id().as_u64())?;
        }
        if self.options.show_types {
            write!(out, " ({})", row.cell_class().name())?;
        }
        if self.options.show_properties {
            write!(
                out,
                " {:?}, {}, {} bindings",
                row.object_mode(),
                if row.is_visible() { "visible" } else { "hidden" },
                row.bindings().len()
            )?;
        }
        writeln!(out)?;

        if self.options.show_objects && row.object_mode() == ObjectMode::Collection && !self.too_deep(3) {
            let objects = section.dynamic_objects().map(|o| o.snapshot()).unwrap_or_default();
            let count = objects.len();
            for (i, object) in objects.iter().enumerate() {
                writeln!(out, "{}{i}: {}", self.build_prefix(3, i + 1 == count), object.type_label())?;
            }
        }
        Ok(())
    }

    fn too_deep(&self, depth: usize) -> bool {
        self.options.max_depth.is_some_and(|max| depth > max)
    }

    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+-- ", "`-- "),
            TreeStyle::Unicode => ("\u{2502}", "\u{251c}\u{2500}\u{2500} ", "\u{2514}\u{2500}\u{2500} "),
            TreeStyle::Compact => ("", "- ", "- "),
        };

        let mut prefix = String::new();
        for _ in 1..depth {
            prefix.push_str(branch);
            prefix.push_str(&" ".repeat(self.options.indent_size));
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix
    }
}

impl fmt::Display for TableTreeDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::widget::HeadlessTable;
    use horizon_table_core::{ObjectRef, ObservableList, Record};

    fn controller() -> DataController {
        let controller = DataController::new(HeadlessTable::shared(), TableConfig::default());
        let list = ObservableList::shared(vec![Record::shared() as ObjectRef]);
        controller.add_section(
            Section::new(1)
                .with_header_title("People")
                .with_row(Row::standard().with_tag(10).into_shared())
                .with_dynamic_rows(Row::standard().with_tag(11).into_shared(), list)
                .into_shared(),
        );
        controller
    }

    #[test]
    fn test_format_empty() {
        let controller = DataController::new(HeadlessTable::shared(), TableConfig::default());
        let dump = TableTreeDebug::new(&controller).format();
        assert!(dump.starts_with("Table (0 sections):"));
        assert!(dump.contains("(empty)"));
    }

    #[test]
    fn test_format_minimal() {
        let controller = controller();
        let dump = TableTreeDebug::with_options(&controller, TreeFormatOptions::minimal()).format();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[1], "\u{2514}\u{2500}\u{2500} Section 1 \"People\"");
        assert_eq!(lines[2], "\u{2502}  \u{251c}\u{2500}\u{2500} Row 10");
        assert_eq!(lines[3], "\u{2502}  \u{2514}\u{2500}\u{2500} Row 11");
    }

    #[test]
    fn test_format_detailed() {
        let controller = controller();
        let options = TreeFormatOptions {
            style: TreeStyle::Ascii,
            ..TreeFormatOptions::detailed()
        };
        let dump = TableTreeDebug::with_options(&controller, options).to_string();
        assert!(dump.contains("dynamic, 1 objects"));
        assert!(dump.contains("(Cell) Collection, visible, 0 bindings"));
        assert!(dump.contains("`-- 0: Record"));
    }

    #[test]
    fn test_max_depth() {
        let controller = controller();
        let options = TreeFormatOptions {
            max_depth: Some(1),
            ..TreeFormatOptions::minimal()
        };
        let dump = TableTreeDebug::with_options(&controller, options).format();
        assert!(dump.contains("Section 1"));
        assert!(!dump.contains("Row"));
    }
}
